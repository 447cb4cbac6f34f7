// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Error and result types shared across the core.

use std::fmt;

use crate::status_code::StatusCode;

/// Result of an encoding/decoding operation performed by the external wire
/// codec. The core itself never encodes or decodes bytes; it only produces
/// and consumes the typed values that a generated codec would otherwise
/// serialize.
pub type EncodingResult<T> = Result<T, Error>;

/// A generic error carrying an OPC UA status code plus a human-readable
/// context message, used anywhere a fallible core operation cannot be
/// represented purely as a `StatusCode`.
#[derive(Debug, Clone)]
pub struct Error {
    status: StatusCode,
    message: String,
}

impl std::error::Error for Error {}

impl Error {
    /// Create a new error from a status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The status code this error carries.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Self {
            status,
            message: status.to_string(),
        }
    }
}

impl From<Error> for StatusCode {
    fn from(e: Error) -> Self {
        e.status
    }
}
