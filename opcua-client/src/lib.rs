// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The client half of the core (§4.13): outstanding-request bookkeeping,
//! the outstanding-publish-request pool, subscription/monitored item
//! mirroring, and the inactivity watchdog. Like [`opcua_server`], this
//! crate owns no transport or wire codec — a caller that does own a
//! connection drives it by allocating request handles, recording
//! responses, and ticking the maintenance loop on a timer.

pub mod config;
pub mod publish_pool;
pub mod requests;
pub mod subscription;
pub mod watchdog;

use std::time::Duration;

use chrono::{DateTime, Utc};

pub use config::ClientConfig;
pub use publish_pool::PublishPool;
pub use requests::RequestTable;
pub use subscription::{MonitoredItem, Subscription, SubscriptionState};
pub use watchdog::Watchdog;

/// Everything the client keeps locally for one connected session: the
/// outstanding-request table, the publish pool, the subscription mirror,
/// and the inactivity watchdog.
pub struct ClientSession {
    pub requests: RequestTable,
    pub publish_pool: PublishPool,
    pub subscriptions: SubscriptionState,
    pub watchdog: Watchdog,
}

impl ClientSession {
    pub fn new(config: &ClientConfig, now: DateTime<Utc>) -> Self {
        let mut publish_pool = PublishPool::new();
        publish_pool.update_subscriptions(0, Duration::ZERO);
        publish_pool.set_initial_target(config.default_publish_pool_size);
        Self {
            requests: RequestTable::new(),
            publish_pool,
            subscriptions: SubscriptionState::new(),
            watchdog: Watchdog::new(config, now),
        }
    }

    /// Recomputes the publish pool's target against the subscriptions
    /// currently tracked, using `publishing_interval` of the fastest one
    /// (the one that needs requests answered soonest) to size the pool.
    pub fn recalculate_publish_pool(&mut self) {
        let count = self.subscriptions.len();
        let fastest_interval = self
            .subscriptions
            .ids()
            .into_iter()
            .filter_map(|id| self.subscriptions.get(id))
            .map(|s| s.publishing_interval())
            .fold(f64::INFINITY, f64::min);
        let interval = if fastest_interval.is_finite() {
            Duration::from_secs_f64((fastest_interval / 1000.0).max(0.0))
        } else {
            Duration::ZERO
        };
        self.publish_pool.update_subscriptions(count, interval);
    }

    /// One maintenance tick: expires stale requests and reports whether the
    /// channel should be considered dead. Callers run this on a timer no
    /// slower than `watchdog.check_interval()`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> MaintenanceResult {
        let expired_requests = self.requests.expire(now);
        MaintenanceResult {
            expired_requests,
            channel_stalled: self.watchdog.is_stalled(now),
        }
    }
}

/// What a maintenance tick found.
#[derive(Debug, Default)]
pub struct MaintenanceResult {
    /// Request handles that timed out waiting for a response.
    pub expired_requests: Vec<u32>,
    /// Whether the inactivity watchdog considers the channel dead.
    pub channel_stalled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn new_session_starts_with_an_empty_publish_pool_target() {
        let session = ClientSession::new(&ClientConfig::default(), now());
        assert_eq!(session.publish_pool.target(), 1);
    }

    #[test]
    fn recalculate_publish_pool_scales_with_tracked_subscriptions() {
        let mut session = ClientSession::new(&ClientConfig::default(), now());
        session.subscriptions.insert(Subscription::new(1, 500.0, 120, 30, 0, 0, true));
        session.recalculate_publish_pool();
        assert!(session.publish_pool.deficit() >= 2);
    }

    #[test]
    fn tick_reports_a_stalled_channel_once_inactivity_timeout_elapses() {
        let config = ClientConfig {
            inactivity_timeout_ms: 1_000,
            ..ClientConfig::default()
        };
        let mut session = ClientSession::new(&config, now());
        let later = now() + chrono::Duration::milliseconds(1_001);
        let result = session.tick(later);
        assert!(result.channel_stalled);
    }

    #[test]
    fn tick_surfaces_expired_request_handles() {
        let mut session = ClientSession::new(&ClientConfig::default(), now());
        let handle = session.requests.allocate(now(), Some(chrono::Duration::milliseconds(50))).unwrap();
        let later = now() + chrono::Duration::milliseconds(100);
        let result = session.tick(later);
        assert_eq!(result.expired_requests, vec![handle]);
    }
}
