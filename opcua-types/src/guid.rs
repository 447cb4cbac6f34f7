// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `Guid`.

use std::{fmt, str::FromStr};

use uuid::Uuid;

/// A Guid is a 16 byte Globally Unique Identifier.
#[derive(Eq, PartialEq, Clone, Copy, Hash)]
pub struct Guid {
    uuid: Uuid,
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl Default for Guid {
    fn default() -> Self {
        Guid { uuid: Uuid::nil() }
    }
}

impl Guid {
    /// Create a new, random Guid.
    pub fn new() -> Self {
        Guid {
            uuid: Uuid::new_v4(),
        }
    }

    /// `true` if this is the nil Guid (all zero bytes).
    pub fn is_null(&self) -> bool {
        self.uuid.is_nil()
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Guid {
            uuid: Uuid::parse_str(s)?,
        })
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Guid { uuid }
    }
}

impl From<Guid> for Uuid {
    fn from(value: Guid) -> Self {
        value.uuid
    }
}
