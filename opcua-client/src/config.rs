// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Client-side configuration: the starting size of the outstanding-publish
//! pool and how often the connectivity watchdog checks for a stalled
//! channel.

use opcua_core::config::Config;
use serde::{Deserialize, Serialize};

/// The client's whole configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Number of PublishRequests kept outstanding per subscription before
    /// the pool starts halving back (§4.13).
    pub default_publish_pool_size: usize,
    /// How often, in milliseconds, the watchdog checks whether the channel
    /// has gone quiet.
    pub connectivity_check_interval_ms: u64,
    /// How long, in milliseconds, a channel may receive nothing before the
    /// watchdog declares it inactive.
    pub inactivity_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_publish_pool_size: 2,
            connectivity_check_interval_ms: 5_000,
            inactivity_timeout_ms: 60_000,
        }
    }
}

impl Config for ClientConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.default_publish_pool_size == 0 {
            errors.push("default_publish_pool_size must be at least 1".to_string());
        }
        if self.connectivity_check_interval_ms == 0 {
            errors.push("connectivity_check_interval_ms must be positive".to_string());
        }
        if self.inactivity_timeout_ms < self.connectivity_check_interval_ms {
            errors.push("inactivity_timeout_ms must be >= connectivity_check_interval_ms".to_string());
        }
        errors
    }
}
