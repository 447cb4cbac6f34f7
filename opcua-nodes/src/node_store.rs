// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`NodeStore`], the address space's node table (§4.1).
//!
//! Mutation goes through copy/edit/compare-and-replace rather than handing
//! out mutable references: `get_copy` clones a node out, the caller edits it
//! locally, and `replace` commits the edit only if nobody else touched the
//! node in the meantime. This keeps the store safe to share behind a single
//! lock without exposing that lock's guard type to callers.

use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::HashMap;
use opcua_types::{ExpandedNodeId, NodeId};
use parking_lot::RwLock;

use crate::{node::Node, reference::Reference};

/// A node plus a generation counter bumped on every `replace`, used to detect
/// stale compare-and-replace attempts.
struct Slot {
    node: Node,
    generation: u64,
}

/// A node paired with the generation it was read at, returned by `get_copy`
/// and consumed by `replace`.
#[derive(Debug, Clone)]
pub struct OwnedNode {
    /// The cloned node, free for the caller to mutate.
    pub node: Node,
    generation: u64,
}

impl OwnedNode {
    /// Mutably borrow the cloned node.
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl std::ops::Deref for OwnedNode {
    type Target = Node;
    fn deref(&self) -> &Node {
        &self.node
    }
}

/// Why an `insert` was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    /// A node with this id is already present.
    #[error("a node with this id already exists")]
    NodeIdExists,
}

/// Why a `replace` was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplaceError {
    /// The node was modified (or removed and reinserted) since it was copied.
    /// The caller should re-read and retry.
    #[error("node was concurrently modified, retry with a fresh copy")]
    Stale,
    /// The node no longer exists.
    #[error("node does not exist")]
    NotFound,
}

/// Why a `remove` was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("node does not exist")]
pub struct NotFound;

/// The address space's node table: every node, keyed by `NodeId`.
///
/// Held behind an `RwLock` so readers (the overwhelmingly common case —
/// Browse, Read, type-hierarchy walks) don't contend with each other; writers
/// take the copy/replace path described above.
pub struct NodeStore {
    nodes: RwLock<HashMap<NodeId, Slot>>,
    next_numeric_id: AtomicU32,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// An empty store. Numeric auto-allocation starts at 1 (0 is reserved for
    /// the null identifier).
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            next_numeric_id: AtomicU32::new(1),
        }
    }

    /// Look up a node and clone it out, unless absent.
    pub fn get_copy(&self, node_id: &NodeId) -> Option<OwnedNode> {
        let nodes = self.nodes.read();
        nodes.get(node_id).map(|slot| OwnedNode {
            node: slot.node.clone(),
            generation: slot.generation,
        })
    }

    /// Run `f` against the stored node without cloning it, unless absent.
    pub fn with_node<R>(&self, node_id: &NodeId, f: impl FnOnce(&Node) -> R) -> Option<R> {
        let nodes = self.nodes.read();
        nodes.get(node_id).map(|slot| f(&slot.node))
    }

    /// `true` if a node with this id is present.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.read().contains_key(node_id)
    }

    /// Insert a new node. If `node.node_id()` is null, a fresh numeric
    /// identifier is allocated in the requested namespace and assigned before
    /// insertion. Returns the id the node was actually stored under.
    pub fn insert(&self, mut node: Node) -> Result<NodeId, InsertError> {
        let mut nodes = self.nodes.write();
        if node.node_id().is_null() {
            let namespace = node.node_id().namespace;
            let id = self.next_numeric_id.fetch_add(1, Ordering::Relaxed);
            node.base_mut().node_id = NodeId::new(namespace, id);
        }
        let node_id = node.node_id().clone();
        if nodes.contains_key(&node_id) {
            return Err(InsertError::NodeIdExists);
        }
        nodes.insert(
            node_id.clone(),
            Slot {
                node,
                generation: 0,
            },
        );
        Ok(node_id)
    }

    /// Commit an edited copy previously obtained via `get_copy`. Fails if the
    /// node was removed, reinserted, or replaced again since the copy was
    /// taken — the caller should re-read and retry in that case.
    pub fn replace(&self, owned: OwnedNode) -> Result<(), ReplaceError> {
        let mut nodes = self.nodes.write();
        let node_id = owned.node.node_id().clone();
        let slot = nodes.get_mut(&node_id).ok_or(ReplaceError::NotFound)?;
        if slot.generation != owned.generation {
            return Err(ReplaceError::Stale);
        }
        slot.generation += 1;
        slot.node = owned.node;
        Ok(())
    }

    /// Remove a node outright, with no reference bookkeeping: callers that
    /// need I2 maintained (DeleteNodes, DeleteReferences) must unwire
    /// references before calling this.
    pub fn remove(&self, node_id: &NodeId) -> Result<(), NotFound> {
        let mut nodes = self.nodes.write();
        nodes.remove(node_id).map(|_| ()).ok_or(NotFound)
    }

    /// The references stored on a node, in insertion order, or `None` if the
    /// node doesn't exist.
    pub fn iter_references(&self, node_id: &NodeId) -> Option<Vec<Reference>> {
        self.with_node(node_id, |node| node.base().references.clone())
    }

    /// Find the `nth` reference on `node_id` whose target is `target` and
    /// direction/type match, used to locate the mirrored half of an edge
    /// before removing it.
    pub fn find_reference(
        &self,
        node_id: &NodeId,
        reference_type_id: &NodeId,
        is_inverse: bool,
        target: &ExpandedNodeId,
    ) -> Option<usize> {
        self.with_node(node_id, |node| {
            node.base().references.iter().position(|r| {
                &r.reference_type_id == reference_type_id
                    && r.is_inverse == is_inverse
                    && &r.target_id == target
            })
        })
        .flatten()
    }

    /// Wire a forward reference on `source` and its mirrored inverse on
    /// `target` (I2), atomically from the caller's point of view. Fails if
    /// either endpoint is missing.
    pub fn add_reference_pair(
        &self,
        source: &NodeId,
        reference_type_id: &NodeId,
        target: &NodeId,
    ) -> Result<(), NotFound> {
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(source) || !nodes.contains_key(target) {
            return Err(NotFound);
        }
        let forward = Reference::forward(reference_type_id.clone(), target.clone());
        let inverse = Reference::inverse(reference_type_id.clone(), source.clone());
        {
            let slot = nodes.get_mut(source).expect("checked above");
            slot.node.base_mut().references.push(forward);
            slot.generation += 1;
        }
        {
            let slot = nodes.get_mut(target).expect("checked above");
            slot.node.base_mut().references.push(inverse);
            slot.generation += 1;
        }
        Ok(())
    }

    /// Remove one matching reference from `source` and, if present, its
    /// mirrored inverse on `target` (used by DeleteReferences with
    /// `delete_bidirectional` and by DeleteNodes tearing down a node's edges).
    pub fn remove_reference_pair(
        &self,
        source: &NodeId,
        reference_type_id: &NodeId,
        is_forward: bool,
        target: &ExpandedNodeId,
        also_remove_inverse: bool,
    ) {
        let mut nodes = self.nodes.write();
        if let Some(slot) = nodes.get_mut(source) {
            if let Some(pos) = slot.node.base().references.iter().position(|r| {
                &r.reference_type_id == reference_type_id
                    && r.is_inverse == !is_forward
                    && &r.target_id == target
            }) {
                slot.node.base_mut().references.remove(pos);
                slot.generation += 1;
            }
        }
        if also_remove_inverse {
            let target_id = target.node_id.clone();
            let mirrored = ExpandedNodeId::from(source.clone());
            if let Some(slot) = nodes.get_mut(&target_id) {
                if let Some(pos) = slot.node.base().references.iter().position(|r| {
                    &r.reference_type_id == reference_type_id
                        && r.is_inverse == is_forward
                        && r.target_id == mirrored
                }) {
                    slot.node.base_mut().references.remove(pos);
                    slot.generation += 1;
                }
            }
        }
    }

    /// All node ids currently stored, for diagnostics and iteration-heavy
    /// operations like type-hierarchy expansion.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().keys().cloned().collect()
    }

    /// Total number of reference-type nodes, used as a termination bound by
    /// `is_subtype_or_same` (§4.2): a subtype walk can never need more hops
    /// than there are reference types to walk through.
    pub fn reference_type_count(&self) -> usize {
        self.nodes
            .read()
            .values()
            .filter(|slot| matches!(slot.node, Node::ReferenceType(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Base, Node, ObjectNode};

    fn object(namespace: u16, name: &str) -> Node {
        Node::Object(Box::new(ObjectNode {
            base: Base::new(NodeId::new(namespace, 0u32), name, name),
            event_notifier: 0,
        }))
    }

    #[test]
    fn insert_allocates_numeric_id_for_null_request() {
        let store = NodeStore::new();
        let id = store.insert(object(1, "a")).unwrap();
        assert_eq!(id.namespace, 1);
        assert!(!id.is_null());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = NodeStore::new();
        let explicit = Node::Object(Box::new(ObjectNode {
            base: Base::new(NodeId::new(0, 100u32), "a", "a"),
            event_notifier: 0,
        }));
        store.insert(explicit.clone()).unwrap();
        assert_eq!(store.insert(explicit).unwrap_err(), InsertError::NodeIdExists);
    }

    #[test]
    fn replace_detects_staleness() {
        let store = NodeStore::new();
        let id = store.insert(object(1, "a")).unwrap();
        let first_copy = store.get_copy(&id).unwrap();
        let mut second_copy = store.get_copy(&id).unwrap();
        second_copy.node_mut().base_mut().display_name = "b".into();
        store.replace(second_copy).unwrap();
        assert_eq!(store.replace(first_copy).unwrap_err(), ReplaceError::Stale);
    }

    #[test]
    fn add_reference_pair_mirrors_both_endpoints() {
        let store = NodeStore::new();
        let a = store.insert(object(1, "a")).unwrap();
        let b = store.insert(object(1, "b")).unwrap();
        let organizes = NodeId::new(0, opcua_types::constants::object_id::ORGANIZES);
        store.add_reference_pair(&a, &organizes, &b).unwrap();
        let a_refs = store.iter_references(&a).unwrap();
        let b_refs = store.iter_references(&b).unwrap();
        assert!(a_refs.iter().any(|r| !r.is_inverse && r.target_id == ExpandedNodeId::from(b.clone())));
        assert!(b_refs.iter().any(|r| r.is_inverse && r.target_id == ExpandedNodeId::from(a.clone())));
    }
}
