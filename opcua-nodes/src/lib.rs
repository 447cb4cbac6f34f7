// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The address space: node storage, the reference/type hierarchy, and the
//! type-checking kernel that keeps it consistent (I3).
//!
//! This crate knows nothing about the wire, sessions or subscriptions; it is
//! the data structure `opcua-server`'s services operate on.

pub mod hierarchy;
pub mod node;
pub mod node_store;
pub mod reference;
pub mod type_check;
pub mod value_source;

pub use node::{
    Base, DataTypeNode, MethodCallback, MethodNode, Node, ObjectConstructor, ObjectDestructor,
    ObjectNode, ObjectTypeNode, ReferenceTypeNode, VariableNode, VariableTypeNode, ViewNode,
};
pub use node_store::{InsertError, NodeStore, NotFound, OwnedNode, ReplaceError};
pub use reference::Reference;
pub use type_check::TypeConstraint;
pub use value_source::{DataSourceRead, DataSourceWrite, OnWriteCallback, ValueSource};
