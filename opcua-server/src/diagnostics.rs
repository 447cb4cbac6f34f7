// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Per-service and per-session request/error counters, updated generically
//! by the dispatcher around every call (open62541 `ua_services.c` tracks the
//! same counters per service; here the dispatcher is the single place that
//! increments them, rather than every handler doing it itself).

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

/// Request and error totals for one service type.
#[derive(Debug, Default)]
pub struct ServiceCounter {
    requests: AtomicU64,
    errors: AtomicU64,
}

impl ServiceCounter {
    fn record(&self, ok: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total requests observed for this service.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Total requests that ended in a non-Good top-level `service_result`.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Server-wide counters keyed by service name, e.g. `"Read"`, `"Publish"`.
/// The dispatcher is the only writer; everything else only reads.
#[derive(Debug, Default)]
pub struct ServiceCounters {
    by_service: RwLock<HashMap<&'static str, ServiceCounter>>,
}

impl ServiceCounters {
    /// An empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request for `service`, whether it succeeded.
    pub fn record(&self, service: &'static str, ok: bool) {
        let counters = self.by_service.read();
        if let Some(counter) = counters.get(service) {
            counter.record(ok);
            return;
        }
        drop(counters);
        self.by_service
            .write()
            .entry(service)
            .or_default()
            .record(ok);
    }

    /// Snapshot of `(requests, errors)` for `service`, or `(0, 0)` if it has
    /// never been invoked.
    pub fn snapshot(&self, service: &str) -> (u64, u64) {
        self.by_service
            .read()
            .get(service)
            .map(|c| (c.requests(), c.errors()))
            .unwrap_or((0, 0))
    }
}

/// Per-session request/error counts (open62541 `ua_services_session.c`
/// tracks the same thing per `UA_Session`), incremented by the dispatcher
/// alongside the server-wide [`ServiceCounters`].
#[derive(Debug, Default)]
pub struct SessionDiagnostics {
    requests: AtomicU64,
    errors: AtomicU64,
    current_subscriptions: AtomicU64,
    current_monitored_items: AtomicU64,
}

impl SessionDiagnostics {
    /// A fresh, all-zero counter set for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request handled on behalf of this session.
    pub fn record(&self, ok: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Adjust the live subscription count by `delta` (negative to decrement).
    pub fn adjust_subscriptions(&self, delta: i64) {
        adjust(&self.current_subscriptions, delta);
    }

    /// Adjust the live monitored item count by `delta`.
    pub fn adjust_monitored_items(&self, delta: i64) {
        adjust(&self.current_monitored_items, delta);
    }

    /// Total requests this session has made.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Total requests that ended in error.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Subscriptions currently owned by this session.
    pub fn current_subscriptions(&self) -> u64 {
        self.current_subscriptions.load(Ordering::Relaxed)
    }

    /// MonitoredItems currently owned across this session's subscriptions.
    pub fn current_monitored_items(&self) -> u64 {
        self.current_monitored_items.load(Ordering::Relaxed)
    }
}

fn adjust(counter: &AtomicU64, delta: i64) {
    if delta >= 0 {
        counter.fetch_add(delta as u64, Ordering::Relaxed);
    } else {
        counter.fetch_sub((-delta) as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_counters_separate_by_name() {
        let counters = ServiceCounters::new();
        counters.record("Read", true);
        counters.record("Read", false);
        counters.record("Write", true);
        assert_eq!(counters.snapshot("Read"), (2, 1));
        assert_eq!(counters.snapshot("Write"), (1, 0));
        assert_eq!(counters.snapshot("Browse"), (0, 0));
    }

    #[test]
    fn session_diagnostics_tracks_live_counts() {
        let diag = SessionDiagnostics::new();
        diag.adjust_subscriptions(1);
        diag.adjust_monitored_items(3);
        diag.adjust_monitored_items(-1);
        assert_eq!(diag.current_subscriptions(), 1);
        assert_eq!(diag.current_monitored_items(), 2);
    }
}
