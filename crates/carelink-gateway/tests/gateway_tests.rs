//! Dual-writer consistency tests over mock stores: the ledger write is
//! authoritative, the mirror is attempted for every reading regardless.

use carelink_core::*;
use carelink_gateway::{DualWriter, LedgerOutcome};
use carelink_ledger::{
    DeviceIdentity, FixedSessionProvider, LedgerClient, LedgerError, LedgerResult,
    RotatingSessionProvider, SessionIdentity,
};
use carelink_mirror::{MirrorClient, MirrorError, MirrorResult, PatientProfile, VitalsRecord};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ===========================================================================
// Mocks
// ===========================================================================

#[derive(Default)]
struct MockLedger {
    fail_anchors: AtomicBool,
    anchors: Mutex<Vec<(String, String, bool)>>, // (patient, anchor, is_critical)
    handshakes: Mutex<Vec<String>>,              // funded/authorized session addresses
}

impl MockLedger {
    fn failing_anchors() -> Self {
        let ledger = Self::default();
        ledger.fail_anchors.store(true, Ordering::SeqCst);
        ledger
    }

    fn receipt() -> TxReceipt {
        TxReceipt {
            tx_hash: "0xbeef".into(),
            block: 42,
        }
    }
}

#[async_trait::async_trait]
impl LedgerClient for MockLedger {
    async fn submit_anchor(
        &self,
        _signer: &DeviceIdentity,
        patient: &SessionIdentity,
        anchor: &Anchor,
        is_critical: bool,
    ) -> LedgerResult<TxReceipt> {
        if self.fail_anchors.load(Ordering::SeqCst) {
            return Err(LedgerError::NodeUnavailable("ledger down".into()));
        }
        self.anchors.lock().unwrap().push((
            patient.address.clone(),
            anchor.as_str().to_string(),
            is_critical,
        ));
        Ok(Self::receipt())
    }

    async fn submit_authorization(
        &self,
        signer: &SessionIdentity,
        _grantee: &str,
    ) -> LedgerResult<TxReceipt> {
        self.handshakes.lock().unwrap().push(signer.address.clone());
        Ok(Self::receipt())
    }

    async fn fund_identity(
        &self,
        _signer: &DeviceIdentity,
        _recipient: &str,
        _amount: u64,
    ) -> LedgerResult<TxReceipt> {
        Ok(Self::receipt())
    }

    async fn query_anchors(
        &self,
        _patient: &str,
        _caller: &str,
    ) -> LedgerResult<Vec<AnchorRecord>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockMirror {
    fail_bpm: Mutex<Option<u32>>, // reject rows with this heart rate
    rows: Mutex<Vec<VitalsRecord>>,
}

#[async_trait::async_trait]
impl MirrorClient for MockMirror {
    async fn upsert_patient(&self, _profile: &PatientProfile) -> MirrorResult<i64> {
        Ok(7)
    }

    async fn find_patient_by_identity(&self, _address: &str) -> MirrorResult<Option<i64>> {
        Ok(None)
    }

    async fn append_vitals(&self, _patient_id: i64, record: &VitalsRecord) -> MirrorResult<i64> {
        if *self.fail_bpm.lock().unwrap() == Some(record.bpm) {
            return Err(MirrorError::Rejected("row rejected".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.push(record.clone());
        Ok(rows.len() as i64)
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn reading(heart_rate: u32) -> Reading {
    Reading::new(heart_rate, 97, Utc::now())
}

fn batch(rates: &[u32], reason: TriggerReason) -> Batch {
    Batch {
        readings: rates.iter().map(|&r| reading(r)).collect(),
        reason,
    }
}

fn writer(ledger: Arc<MockLedger>, mirror: Arc<MockMirror>) -> DualWriter {
    let session = SessionIdentity::new("0xsession", "session-key");
    DualWriter::new(
        ledger,
        mirror,
        Arc::new(FixedSessionProvider::new(session)),
        DeviceIdentity::new("0xdevice", "device-key"),
        PatientProfile {
            name: "Test Patient".into(),
            age: 30,
            wallet_address: "0xsession".into(),
        },
        140,
        1_000_000,
    )
}

// ===========================================================================
// Commit protocol
// ===========================================================================

#[tokio::test]
async fn commit_anchors_target_reading_and_mirrors_all() {
    let ledger = Arc::new(MockLedger::default());
    let mirror = Arc::new(MockMirror::default());
    let mut writer = writer(ledger.clone(), mirror.clone());
    writer.authorize_startup().await.unwrap();

    let batch = batch(&[70, 80, 90], TriggerReason::Size);
    let expected_anchor = anchor_for(batch.target());
    let outcome = writer.commit(batch).await;

    assert!(outcome.ledger.is_confirmed());
    assert_eq!(outcome.anchor, expected_anchor);
    assert_eq!(outcome.mirrored, 3);
    assert_eq!(outcome.mirror_failed, 0);

    let anchors = ledger.anchors.lock().unwrap();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].0, "0xsession");
    assert_eq!(anchors[0].1, expected_anchor.as_str());
    assert!(!anchors[0].2, "SIZE batch is not critical");

    // Every mirrored row carries the batch anchor.
    let rows = mirror.rows.lock().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.anchor == expected_anchor));
}

#[tokio::test]
async fn ledger_failure_still_mirrors_every_reading() {
    // Scenario C: authoritative write lost, mirror still written in full,
    // and the outcome says so.
    let ledger = Arc::new(MockLedger::failing_anchors());
    let mirror = Arc::new(MockMirror::default());
    let mut writer = writer(ledger.clone(), mirror.clone());
    writer.authorize_startup().await.unwrap();

    let outcome = writer.commit(batch(&[70, 80, 90, 100], TriggerReason::Time)).await;

    assert!(!outcome.ledger.is_confirmed());
    assert!(matches!(outcome.ledger, LedgerOutcome::Failed(_)));
    assert_eq!(outcome.mirrored, 4);
    assert_eq!(outcome.mirror_failed, 0);
    assert_eq!(mirror.rows.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn critical_flags_are_per_reading_in_mirror_and_batch_level_on_ledger() {
    let ledger = Arc::new(MockLedger::default());
    let mirror = Arc::new(MockMirror::default());
    let mut writer = writer(ledger.clone(), mirror.clone());
    writer.authorize_startup().await.unwrap();

    let outcome = writer.commit(batch(&[70, 155], TriggerReason::Critical)).await;
    assert!(outcome.ledger.is_confirmed());

    // Ledger record carries the batch-level flag.
    assert!(ledger.anchors.lock().unwrap()[0].2);

    // Mirror rows derive criticality from their own heart rate.
    let rows = mirror.rows.lock().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].is_critical);
    assert!(rows[1].is_critical);
}

#[tokio::test]
async fn single_mirror_failure_does_not_block_the_rest() {
    let ledger = Arc::new(MockLedger::default());
    let mirror = Arc::new(MockMirror::default());
    *mirror.fail_bpm.lock().unwrap() = Some(80);
    let mut writer = writer(ledger, mirror.clone());
    writer.authorize_startup().await.unwrap();

    let outcome = writer.commit(batch(&[70, 80, 90], TriggerReason::Size)).await;

    assert!(outcome.ledger.is_confirmed(), "mirror trouble never fails the ledger path");
    assert_eq!(outcome.mirrored, 2);
    assert_eq!(outcome.mirror_failed, 1);
    let mirrored: Vec<u32> = mirror.rows.lock().unwrap().iter().map(|r| r.bpm).collect();
    assert_eq!(mirrored, vec![70, 90]);
}

// ===========================================================================
// Session identity policies
// ===========================================================================

#[tokio::test]
async fn fixed_policy_reuses_one_identity_across_commits() {
    let ledger = Arc::new(MockLedger::default());
    let mirror = Arc::new(MockMirror::default());
    let mut writer = writer(ledger.clone(), mirror);
    writer.authorize_startup().await.unwrap();

    writer.commit(batch(&[70], TriggerReason::Time)).await;
    writer.commit(batch(&[71], TriggerReason::Time)).await;

    let anchors = ledger.anchors.lock().unwrap();
    assert_eq!(anchors[0].0, anchors[1].0);
    // One handshake at startup, none per commit.
    assert_eq!(ledger.handshakes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn per_batch_policy_rotates_and_reauthorizes_each_identity() {
    let ledger = Arc::new(MockLedger::default());
    let mirror = Arc::new(MockMirror::default());
    let sessions = Arc::new(RotatingSessionProvider::new());
    let mut writer = DualWriter::new(
        ledger.clone(),
        mirror,
        sessions,
        DeviceIdentity::new("0xdevice", "device-key"),
        PatientProfile {
            name: "Test Patient".into(),
            age: 30,
            wallet_address: "rotating".into(),
        },
        140,
        500,
    );
    writer.authorize_startup().await.unwrap();

    writer.commit(batch(&[70], TriggerReason::Time)).await;
    writer.commit(batch(&[71], TriggerReason::Time)).await;

    let anchors = ledger.anchors.lock().unwrap();
    assert_ne!(anchors[0].0, anchors[1].0, "records must not share an identity");

    // Startup identity plus one fresh identity per commit.
    let handshakes = ledger.handshakes.lock().unwrap();
    assert_eq!(handshakes.len(), 3);
    assert!(handshakes.contains(&anchors[0].0));
    assert!(handshakes.contains(&anchors[1].0));
}
