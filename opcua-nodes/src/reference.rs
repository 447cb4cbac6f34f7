// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`Reference`], the outgoing (or mirrored incoming) edge slot carried by
//! every node.

use opcua_types::{ExpandedNodeId, NodeId};

/// One edge on a node: a reference type, a direction, and a target. The
/// store always keeps both endpoints of a logical edge: a forward reference
/// `(a)-r->(b)` on `a` is mirrored by an inverse reference `(b)<-r-(a)` on
/// `b` (I2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// The reference type of this edge.
    pub reference_type_id: NodeId,
    /// `false` if this edge was the one originally added (source -> target);
    /// `true` if this is the mirrored inverse slot stored on the target.
    pub is_inverse: bool,
    /// The node at the other end of the edge.
    pub target_id: ExpandedNodeId,
}

impl Reference {
    /// Construct a forward reference to `target`.
    pub fn forward(reference_type_id: NodeId, target: impl Into<ExpandedNodeId>) -> Self {
        Self {
            reference_type_id,
            is_inverse: false,
            target_id: target.into(),
        }
    }

    /// Construct an inverse reference to `target`.
    pub fn inverse(reference_type_id: NodeId, target: impl Into<ExpandedNodeId>) -> Self {
        Self {
            reference_type_id,
            is_inverse: true,
            target_id: target.into(),
        }
    }

    /// The reference this one mirrors on the opposite endpoint: same type,
    /// opposite direction, pointing back at `at_node`.
    pub fn mirror(&self, at_node: &NodeId) -> Reference {
        Reference {
            reference_type_id: self.reference_type_id.clone(),
            is_inverse: !self.is_inverse,
            target_id: at_node.clone().into(),
        }
    }
}
