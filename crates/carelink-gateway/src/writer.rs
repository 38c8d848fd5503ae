//! Dual writer - the anchoring protocol over the two stores.
//!
//! Commit order is fixed: compute the anchor, submit it to the ledger and
//! wait for inclusion, then mirror every reading individually. The ledger
//! write is authoritative; the mirror is a best-effort projection that is
//! written regardless of the ledger outcome and never rolled back. A failed
//! ledger submission is surfaced in the outcome and the batch is gone from
//! the authoritative path - there is no retry queue.

use carelink_core::{anchor_for, Anchor, Batch, TriggerReason, TxReceipt};
use carelink_ledger::{
    DeviceHandshake, DeviceIdentity, LedgerClient, SessionIdentity, SessionIdentityProvider,
};
use carelink_mirror::{ensure_patient, MirrorClient, PatientProfile, VitalsRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How the authoritative write ended.
#[derive(Clone, Debug)]
pub enum LedgerOutcome {
    Confirmed(TxReceipt),
    Failed(String),
}

impl LedgerOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, LedgerOutcome::Confirmed(_))
    }
}

/// Typed result of one commit, detailed enough to reconstruct what happened
/// without replaying the stream.
#[derive(Clone, Debug)]
pub struct CommitOutcome {
    pub reason: TriggerReason,
    pub batch_len: usize,
    pub anchor: Anchor,
    pub ledger: LedgerOutcome,
    pub mirrored: usize,
    pub mirror_failed: usize,
}

pub struct DualWriter {
    ledger: Arc<dyn LedgerClient>,
    mirror: Arc<dyn MirrorClient>,
    sessions: Arc<dyn SessionIdentityProvider>,
    device: DeviceIdentity,
    patient_profile: PatientProfile,
    critical_threshold: u32,
    funding_amount: u64,
    /// Session addresses the handshake has already authorized.
    authorized: HashSet<String>,
    /// Mirror-store id, resolved lazily and re-resolved on failure.
    patient_id: Option<i64>,
}

impl DualWriter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        mirror: Arc<dyn MirrorClient>,
        sessions: Arc<dyn SessionIdentityProvider>,
        device: DeviceIdentity,
        patient_profile: PatientProfile,
        critical_threshold: u32,
        funding_amount: u64,
    ) -> Self {
        Self {
            ledger,
            mirror,
            sessions,
            device,
            patient_profile,
            critical_threshold,
            funding_amount,
            authorized: HashSet::new(),
            patient_id: None,
        }
    }

    /// Run the startup handshake for the provider's current identity. Must
    /// succeed before ingestion begins; a failure here is fatal to the
    /// process (the caller exits).
    pub async fn authorize_startup(&mut self) -> carelink_core::Result<()> {
        let session = self.sessions.current_identity();
        let mut handshake = DeviceHandshake::new(self.funding_amount);
        handshake
            .run(self.ledger.as_ref(), &self.device, &session)
            .await
            .map_err(|e| carelink_core::Error::handshake(handshake.state().to_string(), e.to_string()))?;
        self.authorized.insert(session.address);
        Ok(())
    }

    /// Commit one flushed batch: anchor, ledger write, then per-reading
    /// mirror writes. Always returns an outcome; never panics on store
    /// failure.
    pub async fn commit(&mut self, batch: Batch) -> CommitOutcome {
        let anchor = anchor_for(batch.target());
        info!(
            reason = %batch.reason,
            batch_len = batch.len(),
            anchor = anchor.prefix(),
            "flush triggered, committing batch"
        );

        let session = self.sessions.rotate();
        let ledger = self.submit_anchor(&session, &anchor, batch.is_critical()).await;

        let (mirrored, mirror_failed) = self.mirror_batch(&batch, &anchor).await;

        let outcome = CommitOutcome {
            reason: batch.reason,
            batch_len: batch.len(),
            anchor,
            ledger,
            mirrored,
            mirror_failed,
        };
        match &outcome.ledger {
            LedgerOutcome::Confirmed(receipt) => info!(
                reason = %outcome.reason,
                anchor = outcome.anchor.prefix(),
                tx_hash = %receipt.tx_hash,
                mirrored = outcome.mirrored,
                mirror_failed = outcome.mirror_failed,
                "batch committed"
            ),
            LedgerOutcome::Failed(message) => error!(
                reason = %outcome.reason,
                anchor = outcome.anchor.prefix(),
                batch_len = outcome.batch_len,
                mirrored = outcome.mirrored,
                %message,
                "authoritative write lost for this batch"
            ),
        }
        outcome
    }

    async fn submit_anchor(
        &mut self,
        session: &SessionIdentity,
        anchor: &Anchor,
        is_critical: bool,
    ) -> LedgerOutcome {
        // A freshly rotated identity has never been through the handshake;
        // fund and authorize it before it can receive records.
        if !self.authorized.contains(&session.address) {
            let mut handshake = DeviceHandshake::new(self.funding_amount);
            if let Err(e) = handshake
                .run(self.ledger.as_ref(), &self.device, session)
                .await
            {
                return LedgerOutcome::Failed(format!("session handshake: {e}"));
            }
            self.authorized.insert(session.address.clone());
        }

        match self
            .ledger
            .submit_anchor(&self.device, session, anchor, is_critical)
            .await
        {
            Ok(receipt) => LedgerOutcome::Confirmed(receipt),
            Err(e) => LedgerOutcome::Failed(e.to_string()),
        }
    }

    /// Mirror every reading of the batch. Each write is independent and
    /// best-effort; one failure is logged and does not block the rest.
    async fn mirror_batch(&mut self, batch: &Batch, anchor: &Anchor) -> (usize, usize) {
        let patient_id = match self.resolve_patient().await {
            Some(id) => id,
            None => {
                warn!(
                    batch_len = batch.len(),
                    "mirror store unreachable, skipping mirror writes for this batch"
                );
                return (0, batch.len());
            }
        };

        let mut mirrored = 0;
        let mut failed = 0;
        for reading in &batch.readings {
            let record = VitalsRecord {
                bpm: reading.heart_rate,
                spo2: reading.oxygen_saturation,
                is_critical: reading.heart_rate > self.critical_threshold,
                anchor: anchor.clone(),
                captured_at: reading.captured_at,
            };
            match self.mirror.append_vitals(patient_id, &record).await {
                Ok(_) => mirrored += 1,
                Err(e) => {
                    failed += 1;
                    warn!(bpm = reading.heart_rate, error = %e, "mirror write failed, skipping reading");
                }
            }
        }
        (mirrored, failed)
    }

    async fn resolve_patient(&mut self) -> Option<i64> {
        if self.patient_id.is_none() {
            match ensure_patient(self.mirror.as_ref(), &self.patient_profile).await {
                Ok(id) => self.patient_id = Some(id),
                Err(e) => warn!(error = %e, "patient sync failed"),
            }
        }
        self.patient_id
    }
}
