// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `ExpandedNodeId`.

use std::fmt;

use crate::{node_id::NodeId, string::UAString};

/// A `NodeId` that allows the namespace to be carried as a URI instead of,
/// or in addition to, a namespace index, and that can refer to a node in a
/// different server.
#[derive(PartialEq, Debug, Clone, Eq, Hash, Default)]
pub struct ExpandedNodeId {
    /// The inner node id.
    pub node_id: NodeId,
    /// The full namespace URI. If set, the node id's namespace index may be ignored.
    pub namespace_uri: UAString,
    /// The server index. 0 means the current server.
    pub server_index: u32,
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        if let Some(uri) = self.namespace_uri.value() {
            write!(f, "nsu={uri};{}", self.node_id.identifier)
        } else {
            write!(f, "{}", self.node_id)
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        ExpandedNodeId {
            node_id,
            namespace_uri: UAString::null(),
            server_index: 0,
        }
    }
}

impl ExpandedNodeId {
    /// Construct an expanded node id local to the current server with no namespace URI.
    pub fn new(node_id: NodeId) -> Self {
        node_id.into()
    }

    /// `true` if this expanded node id refers to a node in the current server.
    pub fn is_local(&self) -> bool {
        self.server_index == 0
    }

    /// `true` if the inner node id is null.
    pub fn is_null(&self) -> bool {
        self.node_id.is_null()
    }
}
