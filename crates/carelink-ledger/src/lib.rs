//! Carelink Ledger - client trait, session identities, and the device
//! authorization handshake

pub mod client;
pub mod handshake;
pub mod http;
pub mod identity;

pub use client::{LedgerClient, LedgerError, LedgerResult};
pub use handshake::{DeviceHandshake, HandshakeState};
pub use http::HttpLedgerClient;
pub use identity::{
    DeviceIdentity, FixedSessionProvider, RotatingSessionProvider, SessionIdentity,
    SessionIdentityProvider,
};
