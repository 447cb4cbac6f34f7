// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Reference/type hierarchy walks (§4.2): subtype tests used by the
//! type-checking kernel, Browse's `includeSubtypes` filter, and AddNodes
//! instantiation's supertype-chain walk.

use hashbrown::HashSet;
use opcua_types::{constants::object_id, ExpandedNodeId, NodeClass, NodeId};

use crate::node_store::NodeStore;

/// `true` if `candidate` is `root` or a (possibly indirect) subtype of it,
/// found by walking inverse `HasSubType` references from `candidate` towards
/// its supertypes. Bounded by the store's reference-type count so a
/// malformed store (a `HasSubType` cycle) can't loop forever.
pub fn is_subtype_or_same(store: &NodeStore, candidate: &NodeId, root: &NodeId) -> bool {
    if candidate == root {
        return true;
    }
    let bound = store.reference_type_count().max(1);
    let mut current = candidate.clone();
    let has_subtype = NodeId::new(0, object_id::HAS_SUBTYPE);
    for _ in 0..bound {
        let Some(refs) = store.iter_references(&current) else {
            return false;
        };
        let Some(supertype) = refs
            .iter()
            .find(|r| r.is_inverse && is_subtype_of(&r.reference_type_id, &has_subtype, store))
            .map(|r| r.target_id.node_id.clone())
        else {
            return false;
        };
        if &supertype == root {
            return true;
        }
        current = supertype;
    }
    false
}

/// Reference types are themselves arranged in a `HasSubType` hierarchy; used
/// internally to recognise a `HasSubType` reference even when a custom
/// reference type subtypes it (not expected in practice, but kept exact).
fn is_subtype_of(candidate: &NodeId, root: &NodeId, store: &NodeStore) -> bool {
    if candidate == root {
        return true;
    }
    is_subtype_or_same(store, candidate, root)
}

/// The deduplicated set of node ids reachable from `root` via forward
/// `HasSubType` references, including `root` itself. Used to compile a
/// Browse reference-type filter when `includeSubtypes` is set.
pub fn expand_subtype_set(store: &NodeStore, root: &NodeId) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut frontier = vec![root.clone()];
    seen.insert(root.clone());
    let has_subtype = NodeId::new(0, object_id::HAS_SUBTYPE);
    while let Some(current) = frontier.pop() {
        let Some(refs) = store.iter_references(&current) else {
            continue;
        };
        for r in refs.iter().filter(|r| !r.is_inverse && r.reference_type_id == has_subtype) {
            let child = r.target_id.node_id.clone();
            if seen.insert(child.clone()) {
                frontier.push(child);
            }
        }
    }
    seen
}

/// Like [`expand_subtype_set`] but only includes nodes whose `NodeClass`
/// matches `root`'s — used during AddNodes instantiation to walk a type's
/// supertype chain (ObjectType/VariableType only ever subtype their own
/// class) while copying Mandatory children.
pub fn get_type_hierarchy(store: &NodeStore, root: &NodeId) -> Vec<NodeId> {
    let Some(root_class) = store.with_node(root, |n| n.node_class()) else {
        return Vec::new();
    };
    let mut chain = vec![root.clone()];
    let mut current = root.clone();
    let bound = store.reference_type_count().max(1) + 16;
    let has_subtype = NodeId::new(0, object_id::HAS_SUBTYPE);
    for _ in 0..bound {
        let Some(refs) = store.iter_references(&current) else {
            break;
        };
        let Some(supertype) = refs
            .iter()
            .find(|r| r.is_inverse && r.reference_type_id == has_subtype)
            .map(|r| r.target_id.node_id.clone())
        else {
            break;
        };
        match store.with_node(&supertype, |n| n.node_class()) {
            Some(class) if class == root_class => {
                chain.push(supertype.clone());
                current = supertype;
            }
            _ => break,
        }
    }
    chain
}

/// `true` if `node_id` identifies a built-in (namespace 0, numeric ≤ 25) data
/// type, used by type-check rule 6 (§4.3).
pub fn is_builtin_data_type(node_id: &NodeId) -> bool {
    node_id.namespace == 0
        && node_id
            .as_u32()
            .is_some_and(|n| n <= object_id::BUILTIN_DATA_TYPE_MAX)
}

/// Resolve the node class of a reference's target, if local and present.
pub fn target_node_class(store: &NodeStore, target: &ExpandedNodeId) -> Option<NodeClass> {
    if !target.is_local() || !target.namespace_uri.is_empty() {
        return None;
    }
    store.with_node(&target.node_id, |n| n.node_class())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Base, Node, ReferenceTypeNode};

    fn reference_type(id: u32, name: &str) -> Node {
        Node::ReferenceType(Box::new(ReferenceTypeNode {
            base: Base::new(NodeId::new(0, id), name, name),
            is_abstract: false,
            symmetric: false,
            inverse_name: None,
        }))
    }

    #[test]
    fn subtype_walk_reaches_own_root() {
        let store = NodeStore::new();
        let id = store.insert(reference_type(9000, "Foo")).unwrap();
        assert!(is_subtype_or_same(&store, &id, &id));
    }

    #[test]
    fn subtype_walk_follows_has_subtype() {
        let store = NodeStore::new();
        let organizes = NodeId::new(0, object_id::ORGANIZES);
        let sub = store.insert(reference_type(9001, "OrganizesSubtype")).unwrap();
        let hierarchical = NodeId::new(0, object_id::HAS_SUBTYPE);
        store.add_reference_pair(&organizes, &hierarchical, &sub).unwrap();
        assert!(is_subtype_or_same(&store, &sub, &organizes));
        assert!(!is_subtype_or_same(&store, &organizes, &sub));
    }
}
