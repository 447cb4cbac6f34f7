// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ByteString`.

use std::fmt;

/// A sequence of octets, distinguishing a null byte string from an empty one.
#[derive(Eq, PartialEq, Default, Debug, Clone, Hash)]
pub struct ByteString {
    /// Raw inner byte string value.
    pub value: Option<Vec<u8>>,
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "ByteString[{}]", v.len()),
            None => write!(f, "[null]"),
        }
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.value.as_deref().unwrap_or(&[])
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        ByteString { value: Some(value) }
    }
}

impl From<&[u8]> for ByteString {
    fn from(value: &[u8]) -> Self {
        ByteString {
            value: Some(value.to_vec()),
        }
    }
}

impl ByteString {
    /// Returns the null byte string, distinct from an empty one.
    pub fn null() -> Self {
        ByteString { value: None }
    }

    /// `true` if this is the null byte string rather than an empty one.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// `true` if this is the null byte string or has zero length.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            None => true,
            Some(v) => v.is_empty(),
        }
    }

    /// Length in bytes, or -1 to mirror the wire encoding of a null byte string.
    pub fn len(&self) -> isize {
        match &self.value {
            None => -1,
            Some(v) => v.len() as isize,
        }
    }
}
