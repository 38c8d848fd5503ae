//! HTTP ledger client.
//!
//! Talks to the ledger node's REST surface. The node owns transaction
//! assembly, contract dispatch, and mining; this adapter submits signed
//! envelopes and waits for the node to report inclusion, so a returned
//! receipt always refers to a confirmed transaction. There is no timeout on
//! that wait; a stalled node stalls the caller.

use crate::client::{LedgerClient, LedgerError, LedgerResult};
use crate::identity::{DeviceIdentity, SessionIdentity};
use carelink_core::{Anchor, AnchorRecord, TxReceipt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

pub struct HttpLedgerClient {
    client: Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn submit_tx<B: Serialize>(&self, route: &str, body: &B) -> LedgerResult<TxReceipt> {
        let url = format!("{}/{route}", self.base_url);
        debug!(%url, "submitting ledger transaction");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(%url, %status, %detail, "ledger submission failed");
            return Err(triage(status, detail));
        }

        let receipt: TxReceipt = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        debug!(tx_hash = %receipt.tx_hash, block = receipt.block, "transaction included");
        Ok(receipt)
    }
}

fn triage(status: StatusCode, detail: String) -> LedgerError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LedgerError::PermissionDenied(detail),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            LedgerError::NodeUnavailable(detail)
        }
        _ => LedgerError::Rejected(format!("{status}: {detail}")),
    }
}

/// Demo-grade request seal: SHA-256 over the signer's key and the canonical
/// payload. Real signature schemes are the node's concern, not this
/// adapter's.
fn seal(secret: &str, payload: &str) -> String {
    let mut h = Sha256::new();
    h.update(secret.as_bytes());
    h.update(payload.as_bytes());
    hex::encode(h.finalize())
}

#[derive(Serialize)]
struct AnchorTx<'a> {
    signer: &'a str,
    patient: &'a str,
    anchor: &'a str,
    is_critical: bool,
    seal: String,
}

#[derive(Serialize)]
struct AuthorizeTx<'a> {
    signer: &'a str,
    grantee: &'a str,
    seal: String,
}

#[derive(Serialize)]
struct FundTx<'a> {
    signer: &'a str,
    recipient: &'a str,
    amount: u64,
    seal: String,
}

#[derive(Deserialize)]
struct AnchorsResponse {
    records: Vec<AnchorRecord>,
}

#[async_trait::async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit_anchor(
        &self,
        signer: &DeviceIdentity,
        patient: &SessionIdentity,
        anchor: &Anchor,
        is_critical: bool,
    ) -> LedgerResult<TxReceipt> {
        let payload = format!("{}:{}:{}", patient.address, anchor, is_critical);
        let tx = AnchorTx {
            signer: &signer.address,
            patient: &patient.address,
            anchor: anchor.as_str(),
            is_critical,
            seal: seal(&signer.secret, &payload),
        };
        self.submit_tx("tx/anchor", &tx).await
    }

    async fn submit_authorization(
        &self,
        signer: &SessionIdentity,
        grantee: &str,
    ) -> LedgerResult<TxReceipt> {
        let tx = AuthorizeTx {
            signer: &signer.address,
            grantee,
            seal: seal(&signer.secret, grantee),
        };
        self.submit_tx("tx/authorize", &tx).await
    }

    async fn fund_identity(
        &self,
        signer: &DeviceIdentity,
        recipient: &str,
        amount: u64,
    ) -> LedgerResult<TxReceipt> {
        let payload = format!("{recipient}:{amount}");
        let tx = FundTx {
            signer: &signer.address,
            recipient,
            amount,
            seal: seal(&signer.secret, &payload),
        };
        self.submit_tx("tx/fund", &tx).await
    }

    async fn query_anchors(
        &self,
        patient: &str,
        caller: &str,
    ) -> LedgerResult<Vec<AnchorRecord>> {
        let url = format!("{}/anchors/{patient}", self.base_url);
        debug!(%url, %caller, "querying anchor records");

        let response = self
            .client
            .get(&url)
            .query(&[("caller", caller)])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(triage(status, detail));
        }

        let body: AnchorsResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        Ok(body.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_is_deterministic_and_key_dependent() {
        let a = seal("key-1", "payload");
        assert_eq!(a, seal("key-1", "payload"));
        assert_ne!(a, seal("key-2", "payload"));
        assert_ne!(a, seal("key-1", "other"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn triage_maps_status_classes() {
        assert!(matches!(
            triage(StatusCode::FORBIDDEN, String::new()),
            LedgerError::PermissionDenied(_)
        ));
        assert!(matches!(
            triage(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            LedgerError::NodeUnavailable(_)
        ));
        assert!(matches!(
            triage(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            LedgerError::Rejected(_)
        ));
    }
}
