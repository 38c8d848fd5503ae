//! Carelink Core - domain types, config, anchoring, and the trigger policy

pub mod anchor;
pub mod config;
pub mod error;
pub mod trigger;
pub mod types;

pub use anchor::anchor_for;
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use trigger::{TriggerEngine, TriggerPolicy};
pub use types::*;
