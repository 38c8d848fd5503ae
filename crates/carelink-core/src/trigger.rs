//! Trigger policy engine - buffered escalation deciding when to flush.
//!
//! Three arrival-driven rules evaluated in order, first match wins:
//! critical bypass, size limit, plain buffering. A fourth rule (time limit)
//! runs on a periodic tick independent of arrivals, so the engine must be
//! polled even when the input source is idle.

use crate::types::{Batch, Reading, TriggerReason};
use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug)]
pub struct TriggerPolicy {
    /// Heart rate above this flushes immediately, regardless of buffer state.
    pub critical_threshold: u32,
    /// Buffer length at which a routine flush fires.
    pub size_limit: usize,
    /// Maximum age of a non-empty buffer before the time trigger fires.
    pub time_limit: Duration,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            critical_threshold: 140,
            size_limit: 50,
            time_limit: Duration::seconds(100),
        }
    }
}

/// Owns the reading buffer and flush clock; no ambient state.
pub struct TriggerEngine {
    policy: TriggerPolicy,
    buffer: Vec<Reading>,
    last_flush_at: DateTime<Utc>,
}

impl TriggerEngine {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            buffer: Vec::new(),
            last_flush_at: Utc::now(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    /// Accept one reading. Returns a batch when the critical or size rule
    /// fires; otherwise the reading is buffered.
    pub fn ingest(&mut self, reading: Reading) -> Option<Batch> {
        let critical = reading.heart_rate > self.policy.critical_threshold;
        self.buffer.push(reading);

        if critical {
            return Some(self.drain(TriggerReason::Critical));
        }
        if self.buffer.len() >= self.policy.size_limit {
            return Some(self.drain(TriggerReason::Size));
        }
        None
    }

    /// Periodic check for the time trigger. Fires only when the buffer is
    /// non-empty and stale.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Batch> {
        if !self.buffer.is_empty() && now - self.last_flush_at > self.policy.time_limit {
            return Some(self.drain(TriggerReason::Time));
        }
        None
    }

    fn drain(&mut self, reason: TriggerReason) -> Batch {
        self.last_flush_at = Utc::now();
        Batch {
            readings: std::mem::take(&mut self.buffer),
            reason,
        }
    }
}
