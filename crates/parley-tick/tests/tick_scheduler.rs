//! Integration tests for the tick scheduler.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the runtime
//! is otherwise idle.

use std::time::Duration;

use parley_tick::{TickConfig, TickScheduler};
use tokio::time::Instant;

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_ticks_every_second_without_jitter() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.period, Duration::from_secs(1));
    assert_eq!(cfg.initial_jitter, Duration::ZERO);
}

#[test]
fn test_validated_clamps_zero_period() {
    let cfg = TickConfig::every(Duration::ZERO).validated();
    assert_eq!(cfg.period, TickConfig::MIN_PERIOD);
}

#[test]
fn test_with_jitter_sets_bound() {
    let cfg = TickConfig::every(Duration::from_millis(500)).with_jitter(Duration::from_millis(50));
    assert_eq!(cfg.initial_jitter, Duration::from_millis(50));
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_after_one_period() {
    let start = Instant::now();
    let mut s = TickScheduler::every(Duration::from_millis(500));

    let info = s.wait_for_tick().await;

    assert_eq!(info.tick, 1);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_keep_a_fixed_cadence() {
    let start = Instant::now();
    let mut s = TickScheduler::every(Duration::from_secs(1));

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
    }
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(s.tick_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_only_delays_first_tick_within_bound() {
    let start = Instant::now();
    let mut s = TickScheduler::new(
        TickConfig::every(Duration::from_millis(100)).with_jitter(Duration::from_millis(20)),
    );

    s.wait_for_tick().await;
    let first = start.elapsed();
    assert!(first >= Duration::from_millis(100));
    assert!(first < Duration::from_millis(120));

    s.wait_for_tick().await;
    assert_eq!(start.elapsed() - first, Duration::from_millis(100));
}

// =========================================================================
// Overruns
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_overrun_skips_missed_ticks() {
    let mut s = TickScheduler::every(Duration::from_millis(100));
    s.wait_for_tick().await;

    // Fall three and a half periods behind.
    tokio::time::advance(Duration::from_millis(350)).await;

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 2);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(s.total_skipped(), 2);

    // Cadence restarts from the late tick.
    let before = Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_millis(100));
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_paused_scheduler_never_fires() {
    let mut s = TickScheduler::every(Duration::from_millis(50));
    s.pause();
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(5), s.wait_for_tick()).await;
    assert!(result.is_err(), "paused scheduler should pend");
    assert_eq!(s.tick_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_waits_a_full_period() {
    let mut s = TickScheduler::every(Duration::from_millis(50));
    s.pause();
    tokio::time::advance(Duration::from_secs(1)).await;
    s.resume();
    assert!(!s.is_paused());

    let before = Instant::now();
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(before.elapsed(), Duration::from_millis(50));
}

#[test]
fn test_pause_and_resume_are_idempotent() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    rt.block_on(async {
        let mut s = TickScheduler::every(Duration::from_millis(10));
        s.pause();
        s.pause();
        assert!(s.is_paused());
        s.resume();
        s.resume();
        assert!(!s.is_paused());
    });
}
