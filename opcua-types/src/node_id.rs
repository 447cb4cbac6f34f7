// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `NodeId`.

use std::{fmt, str::FromStr};

use crate::{byte_string::ByteString, guid::Guid, string::UAString};

/// The kind of identifier carried by a `NodeId`: numeric, string, guid or opaque byte string.
#[derive(Eq, PartialEq, Clone, Debug, Hash)]
pub enum Identifier {
    /// Numeric node id identifier, `i=123`.
    Numeric(u32),
    /// String node id identifier, `s=...`.
    String(UAString),
    /// Guid node id identifier, `g=...`.
    Guid(Guid),
    /// Opaque node id identifier, `b=...`.
    ByteString(ByteString),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Numeric(v) => write!(f, "i={v}"),
            Identifier::String(v) => write!(f, "s={v}"),
            Identifier::Guid(v) => write!(f, "g={v}"),
            Identifier::ByteString(v) => write!(f, "b={v}"),
        }
    }
}

impl FromStr for Identifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 {
            return Err(());
        }
        let (kind, value) = s.split_at(2);
        match kind {
            "i=" => value.parse::<u32>().map(Identifier::Numeric).map_err(|_| ()),
            "s=" => Ok(Identifier::String(UAString::from(value))),
            "g=" => Guid::from_str(value).map(Identifier::Guid).map_err(|_| ()),
            _ => Err(()),
        }
    }
}

impl From<i32> for Identifier {
    fn from(v: i32) -> Self {
        Identifier::Numeric(v as u32)
    }
}

impl From<u32> for Identifier {
    fn from(v: u32) -> Self {
        Identifier::Numeric(v)
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Identifier::String(UAString::from(v))
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier::String(UAString::from(v))
    }
}

impl From<UAString> for Identifier {
    fn from(v: UAString) -> Self {
        Identifier::String(v)
    }
}

impl From<Guid> for Identifier {
    fn from(v: Guid) -> Self {
        Identifier::Guid(v)
    }
}

impl From<ByteString> for Identifier {
    fn from(v: ByteString) -> Self {
        Identifier::ByteString(v)
    }
}

/// An identifier for a node in the address space of an OPC UA server, made up
/// of a namespace index and an [`Identifier`].
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct NodeId {
    /// The index of the namespace this id belongs to.
    pub namespace: u16,
    /// The identifier for the node within its namespace.
    pub identifier: Identifier,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        } else {
            write!(f, "{}", self.identifier)
        }
    }
}

impl FromStr for NodeId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("ns=") {
            let (ns_str, id_str) = rest.split_once(';').ok_or(())?;
            let namespace = ns_str.parse::<u16>().map_err(|_| ())?;
            let identifier = Identifier::from_str(id_str)?;
            Ok(NodeId {
                namespace,
                identifier,
            })
        } else {
            let identifier = Identifier::from_str(s)?;
            Ok(NodeId {
                namespace: 0,
                identifier,
            })
        }
    }
}

impl NodeId {
    /// Construct a new node id from a namespace index and anything that converts
    /// into an [`Identifier`].
    pub fn new<T>(namespace: u16, identifier: T) -> NodeId
    where
        T: Into<Identifier>,
    {
        NodeId {
            namespace,
            identifier: identifier.into(),
        }
    }

    /// The null node id: namespace 0, numeric identifier 0. Used to represent
    /// "no node" in references and as the default value of optional node id fields.
    pub fn null() -> NodeId {
        NodeId::new(0, 0u32)
    }

    /// `true` if this is the null node id.
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && matches!(self.identifier, Identifier::Numeric(0))
    }

    /// Borrow the numeric identifier, if this node id has one.
    pub fn as_u32(&self) -> Option<u32> {
        match &self.identifier {
            Identifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::null()
    }
}
