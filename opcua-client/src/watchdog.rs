// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The inactivity watchdog (§4.13): if nothing at all has arrived on the
//! channel — not even a keep-alive Publish response — for longer than
//! `inactivity_timeout_ms`, the connection is presumed dead and the caller
//! should reconnect rather than keep waiting.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use crate::config::ClientConfig;

/// Tracks the last time anything was received from the server.
pub struct Watchdog {
    last_activity: Mutex<DateTime<Utc>>,
    check_interval: ChronoDuration,
    inactivity_timeout: ChronoDuration,
}

impl Watchdog {
    pub fn new(config: &ClientConfig, now: DateTime<Utc>) -> Self {
        Self {
            last_activity: Mutex::new(now),
            check_interval: ChronoDuration::milliseconds(config.connectivity_check_interval_ms as i64),
            inactivity_timeout: ChronoDuration::milliseconds(config.inactivity_timeout_ms as i64),
        }
    }

    /// Records that something (a response, a keep-alive, anything) was just
    /// received on the channel.
    pub fn record_activity(&self, now: DateTime<Utc>) {
        *self.last_activity.lock() = now;
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// How often the caller should poll this watchdog.
    pub fn check_interval(&self) -> ChronoDuration {
        self.check_interval
    }

    /// True once `inactivity_timeout_ms` has passed with no recorded
    /// activity; the caller should treat the channel as dead.
    pub fn is_stalled(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_activity()) >= self.inactivity_timeout
    }

    /// How long remains before the watchdog would declare the channel
    /// stalled, clamped to zero once already past due.
    pub fn remaining(&self, now: DateTime<Utc>) -> ChronoDuration {
        let elapsed = now.signed_duration_since(self.last_activity());
        let remaining = self.inactivity_timeout - elapsed;
        remaining.max(ChronoDuration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn config() -> ClientConfig {
        ClientConfig {
            inactivity_timeout_ms: 60_000,
            connectivity_check_interval_ms: 5_000,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn fresh_watchdog_is_not_stalled() {
        let watchdog = Watchdog::new(&config(), now());
        assert!(!watchdog.is_stalled(now()));
    }

    #[test]
    fn watchdog_stalls_once_the_timeout_elapses() {
        let watchdog = Watchdog::new(&config(), now());
        let later = now() + ChronoDuration::milliseconds(60_001);
        assert!(watchdog.is_stalled(later));
    }

    #[test]
    fn recorded_activity_resets_the_clock() {
        let watchdog = Watchdog::new(&config(), now());
        let midway = now() + ChronoDuration::milliseconds(40_000);
        watchdog.record_activity(midway);
        let later = now() + ChronoDuration::milliseconds(60_001);
        assert!(!watchdog.is_stalled(later));
        assert!(watchdog.is_stalled(midway + ChronoDuration::milliseconds(60_001)));
    }

    #[test]
    fn remaining_counts_down_to_zero_and_clamps() {
        let watchdog = Watchdog::new(&config(), now());
        let past_due = now() + ChronoDuration::milliseconds(100_000);
        assert_eq!(watchdog.remaining(past_due), ChronoDuration::zero());
    }
}
