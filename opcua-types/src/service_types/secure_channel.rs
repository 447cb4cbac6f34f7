// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for OpenSecureChannel/CloseSecureChannel (§4.9, §6).

use crate::byte_string::ByteString;

use super::headers::{RequestHeader, ResponseHeader};

/// Whether an OpenSecureChannel request issues a new channel or renews an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityTokenRequestType {
    /// Create a brand new channel.
    Issue,
    /// Renew the channel this request arrived on.
    Renew,
}

/// The overall security mode negotiated for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSecurityMode {
    /// No signing or encryption.
    None,
    /// Messages are signed but not encrypted.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

/// Parameters of an OpenSecureChannel service call.
#[derive(Debug, Clone)]
pub struct OpenSecureChannelRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Protocol version the client supports; echoed, not enforced by this core.
    pub client_protocol_version: u32,
    /// Issue a new channel or renew the current one.
    pub request_type: SecurityTokenRequestType,
    /// Requested security mode.
    pub security_mode: MessageSecurityMode,
    /// Client nonce, used by the SecurityPolicy to derive symmetric keys.
    pub client_nonce: ByteString,
    /// Requested token lifetime, milliseconds.
    pub requested_lifetime: u32,
}

/// A symmetric security token: a channel's keys are valid under this token
/// until it is superseded by renewal or its lifetime elapses.
#[derive(Debug, Clone)]
pub struct ChannelSecurityToken {
    /// The channel this token belongs to.
    pub channel_id: u32,
    /// The token's own id, unique within the channel.
    pub token_id: u32,
    /// When the token was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// The lifetime actually granted, milliseconds.
    pub revised_lifetime: u32,
}

impl ChannelSecurityToken {
    /// `true` if `now` is past this token's lifetime.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now.signed_duration_since(self.created_at).num_milliseconds()
            > self.revised_lifetime as i64
    }
}

/// Result of an OpenSecureChannel service call.
#[derive(Debug, Clone)]
pub struct OpenSecureChannelResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Server protocol version.
    pub server_protocol_version: u32,
    /// The token now in effect.
    pub security_token: ChannelSecurityToken,
    /// Server nonce, used by the SecurityPolicy to derive symmetric keys.
    pub server_nonce: ByteString,
}

/// Parameters of a CloseSecureChannel service call. No response is ever sent
/// (§4.9).
#[derive(Debug, Clone)]
pub struct CloseSecureChannelRequest {
    /// Request header.
    pub request_header: RequestHeader,
}
