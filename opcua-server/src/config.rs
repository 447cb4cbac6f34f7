// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Server-wide configuration: session/subscription/monitored-item bounds and
//! the endpoint descriptions handed back by CreateSession.

use opcua_core::config::Config;
use serde::{Deserialize, Serialize};

/// A single endpoint the server advertises, returned verbatim in
/// `CreateSessionResponse` (§4.10: "the response carries the server's
/// endpoints").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// The URL a client connects to for this endpoint.
    pub endpoint_url: String,
    /// The security policy URI this endpoint negotiates.
    pub security_policy_uri: String,
    /// The security mode this endpoint negotiates.
    pub security_mode: String,
}

/// Bounds and defaults the server imposes on Subscription/MonitoredItem
/// creation, independent of what any one client requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Smallest `samplingInterval`/`publishingInterval` the server will honour, ms.
    pub min_publishing_interval_ms: f64,
    /// Largest `samplingInterval`/`publishingInterval` the server will honour, ms.
    pub max_publishing_interval_ms: f64,
    /// Smallest MonitoredItem `queueSize` the server will honour.
    pub min_queue_size: u32,
    /// Largest MonitoredItem `queueSize` the server will honour.
    pub max_queue_size: u32,
    /// Default sampling interval assigned to an EventNotifier MonitoredItem (§4.12).
    pub default_event_sampling_interval_ms: f64,
    /// Number of ContinuationPoints a session may hold at once (P7).
    pub max_continuation_points_per_session: usize,
    /// Number of PublishRequests a session may have queued at once.
    pub max_publish_requests_per_session: usize,
    /// Default session timeout applied when a client requests `0`, ms.
    pub default_session_timeout_ms: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_publishing_interval_ms: 50.0,
            max_publishing_interval_ms: 60_000.0,
            min_queue_size: 1,
            max_queue_size: 10_000,
            default_event_sampling_interval_ms: 10_000.0,
            max_continuation_points_per_session: 64,
            max_publish_requests_per_session: 64,
            default_session_timeout_ms: 60_000.0,
        }
    }
}

/// The server's whole configuration: endpoints plus engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Endpoints advertised to clients.
    pub endpoints: Vec<EndpointDescription>,
    /// Engine-wide limits.
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            limits: Limits::default(),
        }
    }
}

impl Config for ServerConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.limits.min_publishing_interval_ms <= 0.0 {
            errors.push("limits.min_publishing_interval_ms must be positive".to_string());
        }
        if self.limits.max_publishing_interval_ms < self.limits.min_publishing_interval_ms {
            errors.push("limits.max_publishing_interval_ms must be >= min_publishing_interval_ms".to_string());
        }
        if self.limits.min_queue_size == 0 {
            errors.push("limits.min_queue_size must be at least 1".to_string());
        }
        if self.limits.max_queue_size < self.limits.min_queue_size {
            errors.push("limits.max_queue_size must be >= min_queue_size".to_string());
        }
        errors
    }
}

impl Limits {
    /// Clamp a requested publishing/sampling interval into `[min, max]`,
    /// substituting the minimum for a non-positive request.
    pub fn clamp_interval(&self, requested: f64) -> f64 {
        if requested <= 0.0 {
            self.min_publishing_interval_ms
        } else {
            requested.clamp(self.min_publishing_interval_ms, self.max_publishing_interval_ms)
        }
    }

    /// Clamp a requested MonitoredItem queue size into `[min, max]`,
    /// substituting the minimum for `0`.
    pub fn clamp_queue_size(&self, requested: u32) -> u32 {
        requested.clamp(self.min_queue_size, self.max_queue_size)
    }
}
