//! Device authorization handshake.
//!
//! One-time startup sequence: the device funds the session identity so it
//! can pay for its own authorization transaction, then the session identity
//! grants the device write-on-behalf-of permission. Any failure is fatal to
//! the caller; there is no partial-authorization retry loop.

use crate::client::{LedgerClient, LedgerError, LedgerResult};
use crate::identity::{DeviceIdentity, SessionIdentity};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Funded,
    Authorized,
    Ready,
    Failed,
}

impl std::fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub struct DeviceHandshake {
    state: HandshakeState,
    funding_amount: u64,
}

impl DeviceHandshake {
    pub fn new(funding_amount: u64) -> Self {
        Self {
            state: HandshakeState::Idle,
            funding_amount,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Drive the full Idle -> Funded -> Authorized -> Ready chain. On any
    /// leg failure the state is `Failed` and the ledger error is returned.
    pub async fn run(
        &mut self,
        ledger: &dyn LedgerClient,
        device: &DeviceIdentity,
        session: &SessionIdentity,
    ) -> LedgerResult<()> {
        info!(
            device = %device.address,
            session = %session.address,
            "starting device authorization handshake"
        );

        match ledger
            .fund_identity(device, &session.address, self.funding_amount)
            .await
        {
            Ok(receipt) => {
                self.state = HandshakeState::Funded;
                info!(tx_hash = %receipt.tx_hash, amount = self.funding_amount, "session identity funded");
            }
            Err(e) => return Err(self.fail("funding", e)),
        }

        match ledger.submit_authorization(session, &device.address).await {
            Ok(receipt) => {
                self.state = HandshakeState::Authorized;
                info!(tx_hash = %receipt.tx_hash, "device authorized for session identity");
            }
            Err(e) => return Err(self.fail("authorization", e)),
        }

        self.state = HandshakeState::Ready;
        info!("handshake complete, ingestion may begin");
        Ok(())
    }

    fn fail(&mut self, leg: &str, e: LedgerError) -> LedgerError {
        error!(leg, error = %e, "handshake failed");
        self.state = HandshakeState::Failed;
        e
    }
}
