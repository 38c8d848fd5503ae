//! Core types for Carelink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single decoded vitals reading. Immutable once produced by the frame
/// reader, which stamps `captured_at` with local receipt time (the device's
/// own clock is not trusted).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Heart rate in beats per minute.
    pub heart_rate: u32,
    /// Blood oxygen saturation in percent.
    pub oxygen_saturation: u32,
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(heart_rate: u32, oxygen_saturation: u32, captured_at: DateTime<Utc>) -> Self {
        Self {
            heart_rate,
            oxygen_saturation,
            captured_at,
        }
    }
}

/// Why a batch was flushed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerReason {
    Critical,
    Size,
    Time,
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerReason::Critical => write!(f, "CRITICAL"),
            TriggerReason::Size => write!(f, "SIZE"),
            TriggerReason::Time => write!(f, "TIME"),
        }
    }
}

/// The unit of commit: readings drained from the trigger engine's buffer in
/// arrival order. Never retried as a unit once handed to the dual writer.
#[derive(Clone, Debug)]
pub struct Batch {
    pub readings: Vec<Reading>,
    pub reason: TriggerReason,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// The reading the integrity anchor is derived from: the last one
    /// appended before the flush.
    pub fn target(&self) -> &Reading {
        self.readings
            .last()
            .expect("batch is drained from a non-empty buffer")
    }

    pub fn is_critical(&self) -> bool {
        self.reason == TriggerReason::Critical
    }
}

/// Hex SHA-256 content digest published to the ledger - cheaply cloneable.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchor(String);

impl Anchor {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 10 hex chars, for log lines.
    pub fn prefix(&self) -> &str {
        &self.0[..self.0.len().min(10)]
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger-resident anchor record, as returned by queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub anchor: Anchor,
    pub captured_at: DateTime<Utc>,
    pub is_critical: bool,
    /// Address of the device identity that submitted the record.
    pub device: String,
}

/// Confirmation of an included ledger transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block: u64,
}
