// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! `RequestHeader`/`ResponseHeader`, carried by every service request and
//! response.

use chrono::{DateTime, Utc};

use crate::{
    byte_string::ByteString, guid::Guid, node_id::NodeId, status_code::StatusCode,
    string::UAString,
};

/// Header carried by every service request, identifying the session and
/// request and bounding how long the server should spend on it.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    /// The authentication token of the session making the request, or the
    /// null `NodeId` before a session exists.
    pub authentication_token: NodeId,
    /// Client-generated timestamp, informational only to this core.
    pub timestamp: DateTime<Utc>,
    /// Client-generated request handle, echoed in diagnostics.
    pub request_handle: u32,
    /// Bit mask requesting which optional diagnostics the response should carry.
    pub return_diagnostics: u32,
    /// Identifies an audit trail for the request; opaque to the core.
    pub audit_entry_id: UAString,
    /// Requested maximum time, in milliseconds, the server should take to
    /// answer (`0` = no limit). Meaningful chiefly for Publish requests,
    /// which use it in place of a fixed timeout.
    pub timeout_hint: u32,
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self {
            authentication_token: NodeId::null(),
            timestamp: Utc::now(),
            request_handle: 0,
            return_diagnostics: 0,
            audit_entry_id: UAString::null(),
            timeout_hint: 0,
        }
    }
}

/// Header carried by every service response.
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    /// Server-generated timestamp of the response.
    pub timestamp: DateTime<Utc>,
    /// Echo of the request's `request_handle`.
    pub request_handle: u32,
    /// Overall result of the service call. `Good` unless the whole request
    /// failed outright (malformed, unauthenticated, unknown session); in that
    /// case per-result arrays are left empty.
    pub service_result: StatusCode,
    /// Opaque server-assigned diagnostic info handle; unused by this core.
    pub string_table: Vec<UAString>,
}

impl ResponseHeader {
    /// A response header replying to `request` with the given overall result.
    pub fn new(request: &RequestHeader, service_result: StatusCode) -> Self {
        Self {
            timestamp: Utc::now(),
            request_handle: request.request_handle,
            service_result,
            string_table: Vec::new(),
        }
    }
}

/// Opaque identifier returned by Browse/TranslateBrowsePaths that lets a
/// client resume a paged result set.
pub type ContinuationPointId = ByteString;

/// A client-visible subscription/session diagnostic identity, used nowhere
/// on the wire but convenient for the core's internal bookkeeping.
pub type SessionAuthToken = Guid;
