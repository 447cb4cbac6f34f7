// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `UAString`.

use std::fmt;

/// To avoid naming conflict hell, the OPC UA String type is typed `UAString` so it does not
/// collide with the Rust `String`.
///
/// A string contains UTF-8 encoded characters or a null value. A null value is distinct from
/// being an empty string, so internally this holds the value as an `Option<String>`.
#[derive(Eq, PartialEq, Default, Debug, Clone, Hash)]
pub struct UAString {
    value: Option<String>,
}

impl fmt::Display for UAString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "[null]"),
        }
    }
}

impl From<&str> for UAString {
    fn from(v: &str) -> Self {
        UAString {
            value: Some(v.to_string()),
        }
    }
}

impl From<&String> for UAString {
    fn from(v: &String) -> Self {
        UAString {
            value: Some(v.clone()),
        }
    }
}

impl From<String> for UAString {
    fn from(value: String) -> Self {
        UAString { value: Some(value) }
    }
}

impl From<UAString> for String {
    fn from(value: UAString) -> Self {
        value.value.unwrap_or_default()
    }
}

impl UAString {
    /// Returns the null string, distinct from an empty string.
    pub fn null() -> Self {
        UAString { value: None }
    }

    /// `true` if this is the null string rather than an empty one.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// `true` if this is the null string or the empty string.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            None => true,
            Some(v) => v.is_empty(),
        }
    }

    /// Length in bytes, or -1 to mirror the wire encoding of a null string.
    pub fn len(&self) -> isize {
        match &self.value {
            None => -1,
            Some(v) => v.len() as isize,
        }
    }

    /// Borrow the underlying string, if this is not null.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Borrow the underlying string, substituting `""` for null.
    pub fn as_ref(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}
