//! Carelink Mirror - relational (EMR) store client
//!
//! The mirror is a read-optimized projection of the ledger: one row per
//! reading, carrying the batch anchor. It is eventually consistent and
//! best-effort by design; nothing here blocks the authoritative path.

pub mod client;
pub mod http;

pub use client::{ensure_patient, MirrorClient, MirrorError, MirrorResult, PatientProfile, VitalsRecord};
pub use http::HttpMirrorClient;
