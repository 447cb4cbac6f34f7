// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for the Session services (§4.10).

use crate::{
    byte_string::ByteString, guid::Guid, node_id::NodeId, status_code::StatusCode,
    string::UAString,
};

use super::{
    headers::{RequestHeader, ResponseHeader},
    identity_token::IdentityToken,
};

/// Parameters of a CreateSession service call.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    /// Request header (its `authentication_token` is null: no session exists yet).
    pub request_header: RequestHeader,
    /// Client-chosen human readable session name.
    pub session_name: UAString,
    /// Requested session timeout, milliseconds.
    pub requested_session_timeout: f64,
    /// Maximum response size the client will accept; informational to this core.
    pub max_response_message_size: u32,
}

/// Result of a CreateSession service call.
#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Server-assigned session id.
    pub session_id: NodeId,
    /// Opaque authentication token identifying the session in subsequent requests.
    pub authentication_token: NodeId,
    /// The timeout actually applied.
    pub revised_session_timeout: f64,
}

/// Parameters of an ActivateSession service call.
#[derive(Debug, Clone)]
pub struct ActivateSessionRequest {
    /// Request header, whose `authentication_token` names the session to activate.
    pub request_header: RequestHeader,
    /// The identity to activate the session as.
    pub user_identity_token: IdentityToken,
}

/// Result of an ActivateSession service call.
#[derive(Debug, Clone)]
pub struct ActivateSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Fresh server nonce for the next channel renewal.
    pub server_nonce: ByteString,
}

/// Parameters of a CloseSession service call.
#[derive(Debug, Clone)]
pub struct CloseSessionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// If set, delete the session's subscriptions along with the session;
    /// otherwise they may be left available for TransferSubscriptions
    /// (unimplemented, so effectively always deleted in practice).
    pub delete_subscriptions: bool,
}

/// Result of a CloseSession service call.
#[derive(Debug, Clone)]
pub struct CloseSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
}

/// An opaque continuation-point identifier scoped to one session's Browse state.
pub type SessionContinuationId = Guid;

/// A status carried back when a session-scoped operation fails because the
/// session does not exist or has expired.
pub const SESSION_INVALID: StatusCode = StatusCode::BadSessionIdInvalid;
