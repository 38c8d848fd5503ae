//! Tests for the trigger policy engine: critical bypass, size limit, time
//! limit, and the post-flush invariants.

use carelink_core::*;
use chrono::{Duration, Utc};

fn reading(heart_rate: u32) -> Reading {
    Reading::new(heart_rate, 98, Utc::now())
}

fn engine() -> TriggerEngine {
    TriggerEngine::new(TriggerPolicy::default())
}

// ===========================================================================
// Critical bypass
// ===========================================================================

#[test]
fn critical_reading_flushes_immediately() {
    let mut eng = engine();
    let batch = eng.ingest(reading(155)).expect("critical must flush");
    assert_eq!(batch.reason, TriggerReason::Critical);
    assert_eq!(batch.len(), 1);
    assert_eq!(eng.buffered(), 0);
}

#[test]
fn critical_drains_prior_buffer_including_trigger_reading() {
    // Scenario B: 10 buffered readings plus one critical = batch of 11.
    let mut eng = engine();
    for _ in 0..10 {
        assert!(eng.ingest(reading(80)).is_none());
    }
    let batch = eng.ingest(reading(155)).expect("critical must flush");
    assert_eq!(batch.reason, TriggerReason::Critical);
    assert_eq!(batch.len(), 11);
    assert_eq!(batch.target().heart_rate, 155);
    assert_eq!(eng.buffered(), 0);
}

#[test]
fn threshold_is_strictly_greater_than() {
    let mut eng = engine();
    assert!(eng.ingest(reading(140)).is_none());
    assert_eq!(eng.buffered(), 1);
    let batch = eng.ingest(reading(141)).expect("141 exceeds the threshold");
    assert_eq!(batch.reason, TriggerReason::Critical);
    assert_eq!(batch.len(), 2);
}

#[test]
fn critical_takes_precedence_over_size() {
    // Buffer one short of the size limit; a critical arrival must be tagged
    // CRITICAL, not SIZE.
    let mut eng = engine();
    for _ in 0..49 {
        assert!(eng.ingest(reading(80)).is_none());
    }
    let batch = eng.ingest(reading(180)).expect("must flush");
    assert_eq!(batch.reason, TriggerReason::Critical);
    assert_eq!(batch.len(), 50);
}

// ===========================================================================
// Size trigger
// ===========================================================================

#[test]
fn size_limit_flushes_on_nth_reading() {
    // Scenario A: 49 routine readings buffer, the 50th flushes.
    let mut eng = engine();
    for i in 0..49 {
        assert!(eng.ingest(reading(60 + i % 40)).is_none(), "reading {i}");
    }
    let batch = eng.ingest(reading(72)).expect("size limit reached");
    assert_eq!(batch.reason, TriggerReason::Size);
    assert_eq!(batch.len(), 50);
    assert_eq!(eng.buffered(), 0);
}

#[test]
fn readings_preserve_arrival_order() {
    let mut eng = TriggerEngine::new(TriggerPolicy {
        size_limit: 3,
        ..TriggerPolicy::default()
    });
    assert!(eng.ingest(reading(61)).is_none());
    assert!(eng.ingest(reading(62)).is_none());
    let batch = eng.ingest(reading(63)).unwrap();
    let rates: Vec<u32> = batch.readings.iter().map(|r| r.heart_rate).collect();
    assert_eq!(rates, vec![61, 62, 63]);
}

// ===========================================================================
// Time trigger
// ===========================================================================

#[test]
fn time_trigger_fires_on_stale_nonempty_buffer() {
    let mut eng = engine();
    assert!(eng.ingest(reading(70)).is_none());
    assert!(eng.ingest(reading(71)).is_none());

    // Not stale yet.
    assert!(eng.tick(Utc::now()).is_none());

    let batch = eng
        .tick(Utc::now() + Duration::seconds(101))
        .expect("stale buffer must flush");
    assert_eq!(batch.reason, TriggerReason::Time);
    assert_eq!(batch.len(), 2);
    assert_eq!(eng.buffered(), 0);
}

#[test]
fn time_trigger_never_fires_on_empty_buffer() {
    let mut eng = engine();
    assert!(eng.tick(Utc::now() + Duration::seconds(3600)).is_none());
}

#[test]
fn flush_resets_the_clock() {
    let mut eng = engine();
    eng.ingest(reading(70));
    let _ = eng.tick(Utc::now() + Duration::seconds(101)).unwrap();

    // Fresh buffer after the flush is not stale against the new clock.
    eng.ingest(reading(70));
    assert!(eng.tick(Utc::now() + Duration::seconds(5)).is_none());
}

// ===========================================================================
// Batch / reason types
// ===========================================================================

#[test]
fn batch_target_is_last_appended() {
    let mut eng = engine();
    eng.ingest(reading(70));
    let batch = eng.ingest(reading(160)).unwrap();
    assert_eq!(batch.target().heart_rate, 160);
    assert!(batch.is_critical());
}

#[test]
fn trigger_reason_serializes_uppercase() {
    assert_eq!(
        serde_json::to_string(&TriggerReason::Critical).unwrap(),
        r#""CRITICAL""#
    );
    assert_eq!(serde_json::to_string(&TriggerReason::Size).unwrap(), r#""SIZE""#);
    assert_eq!(serde_json::to_string(&TriggerReason::Time).unwrap(), r#""TIME""#);
    assert_eq!(format!("{}", TriggerReason::Time), "TIME");
}

#[test]
fn anchor_prefix_is_bounded() {
    let anchor = anchor_for(&reading(72));
    assert_eq!(anchor.prefix().len(), 10);
    assert!(anchor.as_str().starts_with(anchor.prefix()));
}
