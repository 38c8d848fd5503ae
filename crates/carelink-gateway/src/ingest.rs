//! Ingestion loop - single task alternating between the frame source and
//! the periodic time-trigger check.
//!
//! Commits run inline on this task and are awaited to completion, so at
//! most one batch is ever in flight; while a commit blocks on ledger
//! confirmation, arriving telemetry sits in the transport's own buffers.

use crate::frame::FrameReader;
use crate::writer::DualWriter;
use carelink_core::{Result, TriggerEngine};
use chrono::Utc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tracing::{debug, info};

/// How often the time trigger is polled. Fine-grained relative to any sane
/// `time_limit`, so a stale buffer flushes promptly even on an idle source.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Run ingestion until the frame source closes. The caller must have
/// completed the startup handshake (`DualWriter::authorize_startup`).
pub async fn run_ingest<R>(
    mut frames: FrameReader<R>,
    mut engine: TriggerEngine,
    mut writer: DualWriter,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("ingestion loop started, waiting for vitals");
    loop {
        tokio::select! {
            reading = frames.next_reading() => {
                let Some(reading) = reading? else {
                    info!(buffered = engine.buffered(), "frame source closed, stopping ingestion");
                    return Ok(());
                };
                if reading.heart_rate > engine.policy().critical_threshold {
                    info!(bpm = reading.heart_rate, buffered = engine.buffered(), "critical reading");
                } else {
                    debug!(bpm = reading.heart_rate, buffered = engine.buffered(), "reading buffered");
                }
                if let Some(batch) = engine.ingest(reading) {
                    writer.commit(batch).await;
                }
            }
            _ = ticker.tick() => {
                if let Some(batch) = engine.tick(Utc::now()) {
                    writer.commit(batch).await;
                }
            }
        }
    }
}
