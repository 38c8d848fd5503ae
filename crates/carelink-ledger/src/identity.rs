//! Device and session identities.
//!
//! The session identity is the "patient" the ledger sees; it is distinct
//! from the patient's real registered identity so that ledger activity is
//! not directly linkable. Whether one session identity lives for the whole
//! process or is minted fresh per commit is a configurable policy with real
//! privacy implications, so the dual writer only ever talks to the
//! `SessionIdentityProvider` seam.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The gateway device's own operating identity. Signs anchor submissions
/// and pays their resource cost.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub address: String,
    pub secret: String,
}

impl DeviceIdentity {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }
}

/// Credential presented to the ledger in place of the patient's registered
/// identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionIdentity {
    pub address: String,
    pub secret: String,
}

impl SessionIdentity {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// Mint a fresh random credential. Address and key material are opaque
    /// hex tokens; actual key derivation is owned by the ledger node.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut addr = [0u8; 20];
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut addr);
        rng.fill_bytes(&mut key);
        Self {
            address: format!("0x{}", hex::encode(addr)),
            secret: hex::encode(key),
        }
    }
}

/// Pluggable source of the identity presented to the ledger.
pub trait SessionIdentityProvider: Send + Sync {
    fn current_identity(&self) -> SessionIdentity;

    /// Called by the dual writer at each commit boundary. The fixed
    /// provider keeps its identity; the rotating provider mints a new one.
    fn rotate(&self) -> SessionIdentity {
        self.current_identity()
    }
}

/// One identity for the process lifetime.
pub struct FixedSessionProvider {
    identity: SessionIdentity,
}

impl FixedSessionProvider {
    pub fn new(identity: SessionIdentity) -> Self {
        Self { identity }
    }
}

impl SessionIdentityProvider for FixedSessionProvider {
    fn current_identity(&self) -> SessionIdentity {
        self.identity.clone()
    }
}

/// Fresh identity per commit; records are unlinkable across flushes at the
/// cost of a funding + authorization round per rotation.
pub struct RotatingSessionProvider {
    current: Mutex<SessionIdentity>,
}

impl RotatingSessionProvider {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(SessionIdentity::generate()),
        }
    }
}

impl Default for RotatingSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentityProvider for RotatingSessionProvider {
    fn current_identity(&self) -> SessionIdentity {
        self.current.lock().expect("identity lock poisoned").clone()
    }

    /// Discard the current identity and mint the next one.
    fn rotate(&self) -> SessionIdentity {
        let fresh = SessionIdentity::generate();
        let mut current = self.current.lock().expect("identity lock poisoned");
        *current = fresh.clone();
        fresh
    }
}
