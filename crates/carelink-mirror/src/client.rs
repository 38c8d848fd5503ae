//! Mirror store client trait and record types

use carelink_core::Anchor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub type MirrorResult<T> = Result<T, MirrorError>;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Patient profile as registered with the mirror store. Carries the
/// session address so dashboard rows can be joined back to ledger records
/// by anchor value; there is no foreign key beyond that.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub wallet_address: String,
}

/// One mirrored reading. `is_critical` is derived from this reading's own
/// heart rate, not from the batch-level trigger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VitalsRecord {
    pub bpm: u32,
    pub spo2: u32,
    pub is_critical: bool,
    pub anchor: Anchor,
    pub captured_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait MirrorClient: Send + Sync {
    /// Register a patient, returning the store's persistent identifier.
    async fn upsert_patient(&self, profile: &PatientProfile) -> MirrorResult<i64>;

    /// Resolve a session address to a patient id, if registered.
    async fn find_patient_by_identity(&self, address: &str) -> MirrorResult<Option<i64>>;

    /// Append one vitals row for the patient, returning the new record id.
    async fn append_vitals(&self, patient_id: i64, record: &VitalsRecord) -> MirrorResult<i64>;
}

/// Find-or-register the patient behind `profile.wallet_address`. A failure
/// here is not fatal to ingestion; callers retry lazily at the next commit.
pub async fn ensure_patient(
    mirror: &dyn MirrorClient,
    profile: &PatientProfile,
) -> MirrorResult<i64> {
    if let Some(id) = mirror.find_patient_by_identity(&profile.wallet_address).await? {
        info!(patient_id = id, "patient found in mirror store");
        return Ok(id);
    }
    warn!(address = %profile.wallet_address, "patient not found, registering");
    let id = mirror.upsert_patient(profile).await?;
    info!(patient_id = id, "patient registered in mirror store");
    Ok(id)
}
