//! Carelink Gateway - frame decoding, the anchoring dual writer, and the
//! ingestion loop

pub mod frame;
pub mod ingest;
pub mod writer;

pub use frame::FrameReader;
pub use ingest::run_ingest;
pub use writer::{CommitOutcome, DualWriter, LedgerOutcome};
