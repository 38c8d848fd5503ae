//! Frame reader - newline-delimited JSON frames from the device transport.
//!
//! A malformed frame is recoverable: it is logged and dropped in full, and
//! framing resynchronizes at the next newline boundary. Decode never
//! fabricates a reading; frames missing required fields are rejected
//! outright.

use carelink_core::Reading;
use chrono::Utc;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::warn;

/// Raw wire frame as the device emits it: `{"bpm":72,"spo2":98}`.
#[derive(Debug, Deserialize)]
struct RawFrame {
    bpm: u32,
    spo2: u32,
}

pub struct FrameReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next decoded reading, stamped with local receipt time. Returns
    /// `None` when the transport reaches end of stream. Cancel-safe: no
    /// partially decoded frame is lost across a `select!` branch.
    pub async fn next_reading(&mut self) -> std::io::Result<Option<Reading>> {
        loop {
            let line = match self.lines.next_line().await? {
                Some(line) => line,
                None => return Ok(None),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<RawFrame>(line) {
                Ok(frame) => {
                    return Ok(Some(Reading::new(frame.bpm, frame.spo2, Utc::now())));
                }
                Err(e) => {
                    warn!(error = %e, raw = line, "malformed frame, resynchronizing at next newline");
                }
            }
        }
    }
}
