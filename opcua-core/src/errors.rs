// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Errors specific to the core's framing and channel layer, distinct from
//! per-operation `StatusCode`s which flow through response bodies instead.

use thiserror::Error;

/// Failures raised while assembling or validating a message's chunk
/// sequence, before a request ever reaches a service handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A chunk's `secure_channel_id` didn't match the channel it arrived on.
    #[error("chunk secure channel id mismatch")]
    ChannelIdMismatch,
    /// An intermediate chunk's body overflowed `maxMessageSize` before a
    /// final chunk arrived.
    #[error("message exceeds maximum size")]
    MessageTooLarge,
    /// A final chunk was expected but an abort chunk arrived instead.
    #[error("message aborted by sender")]
    Aborted,
    /// More chunks arrived than `maxChunkCount` permits.
    #[error("too many chunks")]
    TooManyChunks,
}
