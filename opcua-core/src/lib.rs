// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Transport-adjacent plumbing shared by `opcua-server` and `opcua-client`:
//! Binary/TCP framing (§6), the `SecureChannel`/`SecureChannelManager`
//! lifecycle (§4.9), the `Dispatcher` seam that decouples a connection loop
//! from service logic (§2 item 4), and the `Config` trait both endpoint
//! kinds use for their YAML-backed settings.

pub mod comms;
pub mod config;
pub mod dispatch;
pub mod errors;

pub use comms::secure_channel::{
    generate_nonce, ChannelState, Role, SecureChannel, SecureChannelManager,
};
pub use config::{Config, ConfigError};
pub use dispatch::{Dispatcher, RequestContext, ServiceRequest, ServiceResponse};
pub use errors::FramingError;
