//! Integrity anchor - deterministic content digest over a target reading.
//!
//! The anchor asserts "a reading with these exact values existed at flush
//! time" without revealing the rest of the batch. The canonical payload is
//! `"{heart_rate}-{unix_seconds}"`, so identical (heart_rate, captured_at)
//! pairs always yield the identical digest.

use crate::types::{Anchor, Reading};
use sha2::{Digest, Sha256};

pub fn anchor_for(reading: &Reading) -> Anchor {
    let payload = format!("{}-{}", reading.heart_rate, reading.captured_at.timestamp());
    let mut h = Sha256::new();
    h.update(payload.as_bytes());
    Anchor::from_hex(hex::encode(h.finalize()))
}
