// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The outstanding-publish-request pool (§4.13). The client is expected to
//! keep several `PublishRequest`s outstanding at all times so the server
//! always has one to answer as soon as a subscription has something to
//! report; how many depends on the subscription count and the observed
//! message round-trip, following the teacher's `PublishLimits` shape. On
//! top of that this core halves the target whenever the server answers
//! with `BadTooManyPublishRequests`, the server's signal that it is
//! refusing to queue any more from us, and grows it back gradually once
//! publishes start succeeding again.

use std::time::Duration;

const MIN_MESSAGE_ROUNDTRIP: Duration = Duration::from_millis(10);
const REQUESTS_PER_SUBSCRIPTION: usize = 2;
const MIN_OUTSTANDING: usize = 1;

/// Tracks how many `PublishRequest`s the client should try to keep
/// outstanding, and how many it currently has in flight.
#[derive(Debug)]
pub struct PublishPool {
    message_roundtrip: Duration,
    publish_interval: Duration,
    subscriptions: usize,
    min_requests: usize,
    max_requests: usize,
    /// Current target, independent of `min`/`max`: starts at `max` and is
    /// halved on `BadTooManyPublishRequests`, then grown back one step at
    /// a time as publishes succeed.
    target: usize,
    outstanding: usize,
}

impl PublishPool {
    pub fn new() -> Self {
        let mut pool = Self {
            message_roundtrip: MIN_MESSAGE_ROUNDTRIP,
            publish_interval: Duration::ZERO,
            subscriptions: 0,
            min_requests: 0,
            max_requests: 0,
            target: MIN_OUTSTANDING,
            outstanding: 0,
        };
        pool.recalculate();
        pool
    }

    pub fn update_message_roundtrip(&mut self, message_roundtrip: Duration) {
        self.message_roundtrip = message_roundtrip.max(MIN_MESSAGE_ROUNDTRIP);
        self.recalculate();
    }

    pub fn update_subscriptions(&mut self, subscriptions: usize, publish_interval: Duration) {
        self.subscriptions = subscriptions;
        self.publish_interval = publish_interval;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.min_requests = (self.subscriptions * REQUESTS_PER_SUBSCRIPTION).max(MIN_OUTSTANDING);
        self.max_requests = if self.publish_interval.is_zero() {
            self.min_requests
        } else {
            let ratio = self.message_roundtrip.as_secs_f64() / self.publish_interval.as_secs_f64();
            (ratio.ceil() as usize * self.min_requests).max(self.min_requests)
        };
        self.target = self.target.clamp(self.min_requests, self.max_requests);
    }

    /// How many requests should be outstanding right now.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Overrides the starting target, e.g. from
    /// `ClientConfig::default_publish_pool_size` before any subscription
    /// has been created. Clamped to the current `min`/`max` bounds.
    pub fn set_initial_target(&mut self, target: usize) {
        self.target = target.clamp(self.min_requests, self.max_requests.max(self.min_requests));
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// How many more `PublishRequest`s should be sent to reach the target.
    pub fn deficit(&self) -> usize {
        self.target.saturating_sub(self.outstanding)
    }

    pub fn request_sent(&mut self) {
        self.outstanding += 1;
    }

    pub fn request_completed(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.target < self.max_requests {
            self.target += 1;
        }
    }

    /// Call when the server answers a publish with `BadTooManyPublishRequests`:
    /// halve the target (never below `min_requests`) so the client backs off
    /// before trying again.
    pub fn too_many_publish_requests(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.target = (self.target / 2).max(self.min_requests);
    }
}

impl Default for PublishPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_scales_with_subscription_count() {
        let mut pool = PublishPool::new();
        pool.update_subscriptions(3, Duration::from_millis(500));
        assert_eq!(pool.deficit(), 6);
    }

    #[test]
    fn too_many_publish_requests_halves_the_target() {
        let mut pool = PublishPool::new();
        pool.update_message_roundtrip(Duration::from_millis(400));
        pool.update_subscriptions(4, Duration::from_millis(100));
        for _ in 0..pool.max_requests {
            pool.request_sent();
            pool.request_completed();
        }
        let before = pool.target();
        pool.too_many_publish_requests();
        assert!(pool.target() <= before / 2 + 1);
        assert!(pool.target() >= pool.min_requests);
    }

    #[test]
    fn halved_target_never_drops_below_the_subscription_minimum() {
        let mut pool = PublishPool::new();
        pool.update_subscriptions(1, Duration::from_millis(500));
        for _ in 0..10 {
            pool.too_many_publish_requests();
        }
        assert_eq!(pool.target(), pool.min_requests);
    }

    #[test]
    fn successful_completions_grow_the_target_back_up() {
        let mut pool = PublishPool::new();
        // A round trip several times slower than the publishing interval
        // widens the gap between min and max so backoff and recovery are
        // each individually observable.
        pool.update_message_roundtrip(Duration::from_millis(300));
        pool.update_subscriptions(2, Duration::from_millis(100));
        assert!(pool.max_requests > pool.min_requests);

        // Grow to the ceiling first so the halving below has somewhere to fall from.
        for _ in 0..pool.max_requests {
            pool.request_sent();
            pool.request_completed();
        }
        assert_eq!(pool.target(), pool.max_requests);

        pool.too_many_publish_requests();
        let after_backoff = pool.target();
        assert!(after_backoff < pool.max_requests);

        for _ in 0..pool.max_requests {
            pool.request_sent();
            pool.request_completed();
        }
        assert!(pool.target() > after_backoff);
        assert!(pool.target() <= pool.max_requests);
    }
}
