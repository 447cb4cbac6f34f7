// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The [`StatusCode`], the result code attached to almost every operation
//! the core performs. On the wire this is a `u32` with the top two bits
//! carrying severity (00 = Good, 01 = Uncertain, 10 = Bad); the external
//! codec is responsible for that encoding, this enum only needs to carry
//! the distinct values the core itself produces or inspects.

use std::fmt;

/// Severity band of a [`StatusCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation succeeded.
    Good,
    /// The operation succeeded, but the value should be treated with suspicion.
    Uncertain,
    /// The operation failed.
    Bad,
}

/// Result code attached to service operations, node attribute values, and
/// diagnostic fields throughout the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// The operation succeeded.
    Good = 0x0000_0000,
    /// No data exists for the requested time range or event filter.
    GoodNoData,
    /// A non-critical timeout occurred, for example waiting for a lock.
    GoodNonCriticalTimeout,
    /// The server does not have enough bandwidth to satisfy the request, but
    /// has done the best it can.
    GoodOverload,
    /// There is more data to return than fits in the response.
    GoodMoreData,
    /// The value is good but its status is not fully known.
    Uncertain = 0x4000_0000,

    // --- Identity errors ---
    /// A node id refers to a node that does not exist in the server.
    BadNodeIdUnknown = 0x8000_0001,
    /// A node id has a syntactically invalid format.
    BadNodeIdInvalid,
    /// A node id supplied as a parent for a new node is invalid or does not exist.
    BadParentNodeIdInvalid,
    /// A reference type id is invalid or does not refer to a `ReferenceType` node.
    BadReferenceTypeIdInvalid,
    /// A type definition node id is invalid or does not refer to a type node.
    BadTypeDefinitionInvalid,
    /// A subscription id does not refer to a subscription owned by the session.
    BadSubscriptionIdInvalid,
    /// A monitored item id does not refer to an item owned by the subscription.
    BadMonitoredItemIdInvalid,
    /// A node id that was expected to already exist in the store does not.
    BadNodeIdExists,
    /// A requested node class is not valid in this context.
    BadNodeClassInvalid,
    /// A requested browse name is empty or otherwise invalid.
    BadBrowseNameInvalid,
    /// A browse name is already in use among the siblings of a node.
    BadBrowseNameDuplicated,

    // --- Type/shape errors ---
    /// The value does not match the declared data type, value rank, or array dimensions.
    BadTypeMismatch = 0x8001_0000,
    /// A numeric range string could not be parsed, or selects out-of-bounds elements.
    BadIndexRangeInvalid,
    /// A numeric range selected a region that has no corresponding data.
    BadIndexRangeNoData,
    /// The requested data encoding is not supported (only Default Binary is).
    BadDataEncodingUnsupported,
    /// The requested data encoding name could not be parsed.
    BadDataEncodingInvalid,
    /// The attribute id is not a recognised attribute, or not valid for the node class.
    BadAttributeIdInvalid,

    // --- Access errors ---
    /// The current user is not permitted to perform the requested operation.
    BadUserAccessDenied = 0x8002_0000,
    /// The attribute cannot be read, as indicated by its access level.
    BadNotReadable,
    /// The attribute cannot be written, as indicated by its access level.
    BadNotWritable,
    /// The attribute does not support being written through this service.
    BadWriteNotSupported,
    /// The method is not executable, or the user is not permitted to execute it.
    BadNotExecutable,

    // --- Protocol/session-state errors ---
    /// The authentication token does not match any active session.
    BadSessionIdInvalid = 0x8003_0000,
    /// The session exists but has not yet completed `ActivateSession`.
    BadSessionNotActivated,
    /// The requested security policy is not supported or not permitted.
    BadSecurityPolicyRejected,
    /// The secure channel id does not match any open channel.
    BadSecureChannelIdInvalid,
    /// The identity token is malformed, uses an unsupported encryption algorithm, or is otherwise rejected.
    BadIdentityTokenInvalid,
    /// The subscription referenced by a request no longer exists.
    BadNoSubscription,
    /// A request contained more operations than the server allows in a single call.
    BadTooManyOperations,
    /// The session already has more `PublishRequest`s queued than the server allows.
    BadTooManyPublishRequests,
    /// The server already has as many sessions as it allows.
    BadTooManySessions,
    /// The subscription already has as many monitored items as the server allows.
    BadTooManyMonitoredItems,
    /// The endpoint URL supplied to `CreateSession` does not match any configured endpoint.
    BadTcpEndpointUrlInvalid,

    // --- Timing/resource errors ---
    /// The operation did not complete within its allotted time.
    BadTimeout = 0x8004_0000,
    /// The server could not allocate memory to complete the request.
    BadOutOfMemory,
    /// The session has exhausted its configured budget of continuation points.
    BadNoContinuationPoints,
    /// `Republish` was asked for a sequence number that was never issued or has been discarded.
    BadSequenceNumberUnknown,
    /// `Republish` was asked for a sequence number that is no longer in the retransmission queue.
    BadMessageNotAvailable,
    /// The underlying transport connection has been closed.
    BadConnectionClosed,

    // --- Node management / view / method errors ---
    /// An argument passed to a node-management or method service did not type-check.
    BadInvalidArgument = 0x8005_0000,
    /// Fewer input arguments were supplied to `Call` than the method requires.
    BadArgumentsMissing,
    /// More input arguments were supplied to `Call` than the method accepts.
    BadTooManyArguments,
    /// The object does not expose the requested method.
    BadMethodInvalid,
    /// `AddReferences`/`DeleteReferences` were asked to honour a non-empty `targetServerUri`.
    BadNotImplemented,
    /// No relative path element matched any reference from the starting node.
    BadNoMatch,
    /// A generic internal error that does not fit a more specific code.
    BadUnexpectedError,
    /// A value's readability is only transient, and creation should be retried later.
    BadWaitingForInitialData,
    /// A resource needed to service the request is temporarily unavailable.
    BadResourceUnavailable,
    /// A communication error occurred while servicing the request.
    BadCommunicationError,
    /// The server, session, subscription, or channel is not in a state where this operation is valid.
    BadInvalidState,
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Good
    }
}

impl StatusCode {
    /// The severity band of this status code, derived from its top two bits.
    pub fn severity(&self) -> Severity {
        let v = *self as u32;
        if v & 0x8000_0000 != 0 {
            Severity::Bad
        } else if v & 0x4000_0000 != 0 {
            Severity::Uncertain
        } else {
            Severity::Good
        }
    }

    /// `true` if this code is in the Good severity band (including sub-codes
    /// like [`StatusCode::GoodMoreData`]).
    pub fn is_good(&self) -> bool {
        matches!(self.severity(), Severity::Good)
    }

    /// `true` if this code is in the Uncertain severity band.
    pub fn is_uncertain(&self) -> bool {
        matches!(self.severity(), Severity::Uncertain)
    }

    /// `true` if this code is in the Bad severity band.
    pub fn is_bad(&self) -> bool {
        matches!(self.severity(), Severity::Bad)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:08X})", self, *self as u32)
    }
}
