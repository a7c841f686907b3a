//! Fixed-period tick scheduler for Parley.
//!
//! Two things in a Parley session run on a fixed period: the presence sweep
//! (every second by default) and one discovery announcer per joined room
//! (every 500 ms by default). Both use a [`TickScheduler`], which is meant
//! to sit inside a `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* handle command */ }
//!         tick = sweep.wait_for_tick() => { /* run presence sweep */ }
//!     }
//! }
//! ```
//!
//! # Overruns
//!
//! If the owner falls behind by one or more whole periods, the missed ticks
//! are skipped rather than replayed: a burst of back-to-back announcements
//! or sweeps carries no extra information.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Upper bound of a random delay added to the *first* tick only, so
    /// that peers started together do not announce in lockstep.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TickConfig {
    /// Shortest accepted period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// A config ticking every `period`, without jitter.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Sets the first-tick jitter bound.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.initial_jitter = jitter;
        self
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_secs_f64() * 1000.0,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// How late the tick fired relative to its deadline.
    pub late_by: Duration,
    /// Whole periods that were skipped because the owner fell behind.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fires at a fixed period.
pub struct TickScheduler {
    period: Duration,
    next_tick: Instant,
    tick_count: u64,
    total_skipped: u64,
    paused: bool,
}

impl TickScheduler {
    /// Creates a scheduler whose first tick is one period (plus jitter) away.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..max_us.max(1)))
        };

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            period: config.period,
            next_tick: Instant::now() + config.period + jitter,
            tick_count: 0,
            total_skipped: 0,
            paused: false,
        }
    }

    /// A scheduler ticking every `period` without jitter.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Waits until the next tick is due.
    ///
    /// While paused, the returned future never resolves; other
    /// `tokio::select!` branches keep running.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let deadline = self.next_tick;
        time::sleep_until(deadline).await;

        let now = Instant::now();
        self.tick_count += 1;
        let late_by = now.saturating_duration_since(deadline);
        let ticks_skipped = (late_by.as_nanos() / self.period.as_nanos()) as u64;

        self.next_tick = if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, skipping ahead"
            );
            self.total_skipped += ticks_skipped;
            now + self.period
        } else {
            deadline + self.period
        };

        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            late_by,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes ticking; the next tick is one full period from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.period;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks skipped so far because of overruns.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}
