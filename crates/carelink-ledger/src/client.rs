//! Ledger client trait

use crate::identity::{DeviceIdentity, SessionIdentity};
use carelink_core::{Anchor, AnchorRecord, TxReceipt};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error types
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Thin adapter to the append-only anchor ledger. Every submit call awaits
/// inclusion: when it returns `Ok`, the transaction is confirmed; there is
/// no pending state exposed to callers.
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync {
    /// Write an anchor record on behalf of `patient`, signed by the device's
    /// own operating identity (the device pays the transaction cost).
    async fn submit_anchor(
        &self,
        signer: &DeviceIdentity,
        patient: &SessionIdentity,
        anchor: &Anchor,
        is_critical: bool,
    ) -> LedgerResult<TxReceipt>;

    /// The session identity grants `grantee` write-on-behalf-of permission.
    async fn submit_authorization(
        &self,
        signer: &SessionIdentity,
        grantee: &str,
    ) -> LedgerResult<TxReceipt>;

    /// Transfer `amount` native units from the device to `recipient`, so a
    /// fresh session identity can pay for its own authorization transaction.
    async fn fund_identity(
        &self,
        signer: &DeviceIdentity,
        recipient: &str,
        amount: u64,
    ) -> LedgerResult<TxReceipt>;

    /// Read the anchor records for a patient identity. Fails with
    /// `PermissionDenied` unless the ledger has authorized `caller` for
    /// that patient.
    async fn query_anchors(
        &self,
        patient: &str,
        caller: &str,
    ) -> LedgerResult<Vec<AnchorRecord>>;
}
