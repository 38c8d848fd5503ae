//! Gateway config — serde structs for carelink.json
//!
//! Pure types and parsing only, loaded once at startup; nothing here is
//! hot-reloaded. Key material may come from the file or from environment
//! variables (`CARELINK_DEVICE_KEY`, `CARELINK_SESSION_KEY`).

use crate::error::{Error, Result};
use crate::trigger::TriggerPolicy;
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub triggers: TriggerConfig,
    pub ledger: LedgerConfig,
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    #[serde(rename = "criticalThreshold")]
    pub critical_threshold: Option<u32>,
    #[serde(rename = "sizeLimit")]
    pub size_limit: Option<usize>,
    #[serde(rename = "timeLimitSecs")]
    pub time_limit_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub url: Option<String>,
    #[serde(rename = "deviceAddress")]
    pub device_address: Option<String>,
    #[serde(rename = "deviceKey")]
    pub device_key: Option<String>,
    /// Native units transferred to the session identity during the
    /// funding leg of the handshake.
    #[serde(rename = "fundingAmount")]
    pub funding_amount: Option<u64>,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// "fixed" (one identity per process) or "per-batch" (fresh per commit).
    pub policy: Option<String>,
    pub address: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub url: Option<String>,
    pub patient: PatientConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientConfig {
    pub name: Option<String>,
    pub age: Option<u32>,
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        let mut config: GatewayConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config: {e}")))?;

        if config.ledger.device_key.is_none() {
            config.ledger.device_key = std::env::var("CARELINK_DEVICE_KEY").ok();
        }
        if config.ledger.session.key.is_none() {
            config.ledger.session.key = std::env::var("CARELINK_SESSION_KEY").ok();
        }
        Ok(config)
    }

    pub fn trigger_policy(&self) -> TriggerPolicy {
        let defaults = TriggerPolicy::default();
        TriggerPolicy {
            critical_threshold: self
                .triggers
                .critical_threshold
                .unwrap_or(defaults.critical_threshold),
            size_limit: self.triggers.size_limit.unwrap_or(defaults.size_limit),
            time_limit: self
                .triggers
                .time_limit_secs
                .map(Duration::seconds)
                .unwrap_or(defaults.time_limit),
        }
    }

    pub fn ledger_url(&self) -> &str {
        self.ledger.url.as_deref().unwrap_or("http://127.0.0.1:7545")
    }

    pub fn mirror_url(&self) -> &str {
        self.mirror
            .url
            .as_deref()
            .unwrap_or("http://localhost:8000/api/v1")
    }
}
