//! Presence engine.
//!
//! Peers never say goodbye. A member that stops announcing simply ages:
//! first it is shown offline, then it disappears. A sweep applies that rule
//! to every member of every room:
//!
//! ```text
//! elapsed = now - last_seen
//!
//!   elapsed <  online_threshold                     -> online
//!   online_threshold <= elapsed <= purge_threshold  -> offline (kept)
//!   elapsed >  purge_threshold                      -> removed
//! ```
//!
//! The local account gets no special treatment. It stays listed only
//! because its own announcements keep refreshing it.

use std::time::Duration;

use parley_protocol::{Account, RoomName, Timestamp};
use parley_room::RoomStore;
use parley_tick::{TickConfig, TickScheduler};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Presence thresholds and sweep cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Members seen more recently than this are online.
    pub online_threshold: Duration,
    /// Members silent for longer than this are removed.
    pub purge_threshold: Duration,
    /// Time between sweeps.
    pub sweep_interval: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_threshold: Duration::from_secs(2),
            purge_threshold: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl PresenceConfig {
    /// Repairs inconsistent settings.
    ///
    /// - a zero `sweep_interval` becomes [`TickConfig::MIN_PERIOD`]
    /// - a `purge_threshold` not above `online_threshold` is raised to
    ///   `online_threshold + sweep_interval`
    pub fn validated(mut self) -> Self {
        if self.sweep_interval < TickConfig::MIN_PERIOD {
            warn!("presence sweep interval is zero, clamping");
            self.sweep_interval = TickConfig::MIN_PERIOD;
        }
        if self.purge_threshold <= self.online_threshold {
            let raised = self.online_threshold + self.sweep_interval;
            warn!(
                online_ms = self.online_threshold.as_millis() as u64,
                purge_ms = self.purge_threshold.as_millis() as u64,
                raised_ms = raised.as_millis() as u64,
                "purge threshold must exceed online threshold, raising"
            );
            self.purge_threshold = raised;
        }
        self
    }

    /// Classifies a member by time since its last announcement.
    pub fn classify(&self, elapsed: Duration) -> Liveness {
        if elapsed < self.online_threshold {
            Liveness::Online
        } else if elapsed <= self.purge_threshold {
            Liveness::Offline
        } else {
            Liveness::Expired
        }
    }
}

/// Where a member stands after a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Announced recently.
    Online,
    /// Quiet for a while, still listed.
    Offline,
    /// Quiet for too long, to be removed.
    Expired,
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// What a sweep changed. Members whose classification didn't change are not
/// listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Members flipped from offline to online.
    pub came_online: Vec<(RoomName, Account)>,
    /// Members flipped from online to offline.
    pub went_offline: Vec<(RoomName, Account)>,
    /// Members removed.
    pub purged: Vec<(RoomName, Account)>,
}

impl SweepReport {
    /// Returns `true` if the sweep changed nothing.
    pub fn is_empty(&self) -> bool {
        self.came_online.is_empty() && self.went_offline.is_empty() && self.purged.is_empty()
    }
}

/// Applies the presence rule to a [`RoomStore`].
#[derive(Debug, Clone, Default)]
pub struct PresenceEngine {
    config: PresenceConfig,
}

impl PresenceEngine {
    /// Creates an engine from (validated) config.
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// A scheduler firing at the sweep interval.
    pub fn scheduler(&self) -> TickScheduler {
        TickScheduler::every(self.config.sweep_interval)
    }

    /// Reclassifies every member of every room as of `now`.
    ///
    /// Only entries whose state actually changes are written, so a quiet
    /// sweep leaves existing snapshots of the store fully shared.
    pub fn sweep(&self, store: &mut RoomStore, now: Timestamp) -> SweepReport {
        let mut changes = Vec::new();
        for (room, state) in store.iter() {
            for member in state.members().values() {
                let liveness = self.config.classify(now.saturating_since(member.last_seen));
                let changed = match liveness {
                    Liveness::Online => !member.online,
                    Liveness::Offline => member.online,
                    Liveness::Expired => true,
                };
                if changed {
                    changes.push((room.clone(), member.account.clone(), liveness));
                }
            }
        }

        let mut report = SweepReport::default();
        for (room, account, liveness) in changes {
            match liveness {
                Liveness::Online => {
                    store.set_online(room.as_str(), account.as_str(), true);
                    report.came_online.push((room, account));
                }
                Liveness::Offline => {
                    store.set_online(room.as_str(), account.as_str(), false);
                    debug!(%room, %account, "member went offline");
                    report.went_offline.push((room, account));
                }
                Liveness::Expired => {
                    store.remove_member(room.as_str(), account.as_str());
                    debug!(%room, %account, "member purged after silence");
                    report.purged.push((room, account));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_default_thresholds() {
        let cfg = PresenceConfig::default();
        assert_eq!(cfg.online_threshold, ms(2_000));
        assert_eq!(cfg.purge_threshold, ms(5_000));
        assert_eq!(cfg.sweep_interval, ms(1_000));
    }

    #[test]
    fn test_classify_boundaries() {
        let cfg = PresenceConfig::default();
        assert_eq!(cfg.classify(ms(0)), Liveness::Online);
        assert_eq!(cfg.classify(ms(1_999)), Liveness::Online);
        assert_eq!(cfg.classify(ms(2_000)), Liveness::Offline);
        assert_eq!(cfg.classify(ms(5_000)), Liveness::Offline);
        assert_eq!(cfg.classify(ms(5_001)), Liveness::Expired);
    }

    #[test]
    fn test_validated_raises_purge_threshold() {
        let cfg = PresenceConfig {
            online_threshold: ms(3_000),
            purge_threshold: ms(3_000),
            sweep_interval: ms(500),
        }
        .validated();
        assert_eq!(cfg.purge_threshold, ms(3_500));
    }

    #[test]
    fn test_validated_clamps_zero_interval() {
        let cfg = PresenceConfig {
            sweep_interval: Duration::ZERO,
            ..PresenceConfig::default()
        }
        .validated();
        assert_eq!(cfg.sweep_interval, TickConfig::MIN_PERIOD);
    }

    #[test]
    fn test_validated_keeps_good_config() {
        assert_eq!(PresenceConfig::default().validated(), PresenceConfig::default());
    }
}
