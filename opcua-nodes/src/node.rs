// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`Node`], the sum type over the eight OPC UA node classes (§3), and
//! [`Base`], the fields every class shares.

use std::sync::Arc;

use opcua_types::{
    node_class::{AccessLevel, AttributeId, WriteMask},
    node_id::NodeId,
    localized_text::LocalizedText,
    qualified_name::QualifiedName,
    service_types::Argument,
    status_code::StatusCode,
    NodeClass,
};

use crate::{reference::Reference, value_source::ValueSource};

/// Fields common to every node class.
#[derive(Debug, Clone)]
pub struct Base {
    /// The node's identifier.
    pub node_id: NodeId,
    /// The node's browse name, unique among its siblings.
    pub browse_name: QualifiedName,
    /// Human readable display name.
    pub display_name: LocalizedText,
    /// Optional human readable description.
    pub description: Option<LocalizedText>,
    /// Attributes ordinary users may write.
    pub write_mask: WriteMask,
    /// Attributes the current user may write; must be a subset of `write_mask` (I4).
    pub user_write_mask: WriteMask,
    /// Outgoing (and mirrored incoming) edges, in insertion order.
    pub references: Vec<Reference>,
}

impl Base {
    /// Construct a base with no description and empty write masks.
    pub fn new(node_id: NodeId, browse_name: impl Into<QualifiedName>, display_name: impl Into<LocalizedText>) -> Self {
        Self {
            node_id,
            browse_name: browse_name.into(),
            display_name: display_name.into(),
            description: None,
            write_mask: WriteMask::empty(),
            user_write_mask: WriteMask::empty(),
            references: Vec::new(),
        }
    }
}

/// Lifecycle hooks an `ObjectType` may carry, invoked when an instance of it
/// is created/destroyed via AddNodes/DeleteNodes instantiation.
pub type ObjectConstructor = Arc<dyn Fn(&NodeId) + Send + Sync>;
/// See [`ObjectConstructor`].
pub type ObjectDestructor = Arc<dyn Fn(&NodeId) + Send + Sync>;

/// Native callback invoked by the Call service; not wire-serialisable.
pub type MethodCallback =
    Arc<dyn Fn(&NodeId, &[opcua_types::Variant]) -> Result<Vec<opcua_types::Variant>, StatusCode> + Send + Sync>;

/// An `Object` node.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Common fields.
    pub base: Base,
    /// Which kinds of events this node can generate, as seen by an event-subscribing client.
    pub event_notifier: u8,
}

/// A `Variable` node.
#[derive(Clone)]
pub struct VariableNode {
    /// Common fields.
    pub base: Base,
    /// The variable's declared data type.
    pub data_type: NodeId,
    /// The variable's declared value rank.
    pub value_rank: i32,
    /// The variable's declared array dimensions.
    pub array_dimensions: Option<Vec<u32>>,
    /// Bits controlling read/write of the current/historical value.
    pub access_level: AccessLevel,
    /// Bits controlling read/write for the current user; subset of `access_level` (I4).
    pub user_access_level: AccessLevel,
    /// Minimum interval the server guarantees between samples of this variable.
    pub minimum_sampling_interval: f64,
    /// Whether history is being collected for this variable.
    pub historizing: bool,
    /// How the current value is produced.
    pub value: ValueSource,
}

impl std::fmt::Debug for VariableNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableNode")
            .field("base", &self.base)
            .field("data_type", &self.data_type)
            .field("value_rank", &self.value_rank)
            .field("array_dimensions", &self.array_dimensions)
            .field("access_level", &self.access_level)
            .field("user_access_level", &self.user_access_level)
            .field("minimum_sampling_interval", &self.minimum_sampling_interval)
            .field("historizing", &self.historizing)
            .field("value", &self.value)
            .finish()
    }
}

/// A `Method` node.
#[derive(Clone)]
pub struct MethodNode {
    /// Common fields.
    pub base: Base,
    /// Whether the method can be called at all.
    pub executable: bool,
    /// Whether the current user may call it; implies `executable` (I4).
    pub user_executable: bool,
    /// The native implementation, invoked by the Call service. `None` for a
    /// method that exists only as address-space metadata (e.g. mirrored from
    /// a type, never directly callable).
    pub callback: Option<MethodCallback>,
    /// `true` if this method should be dispatched asynchronously (§4.8, §9).
    pub is_async: bool,
    /// Formal input arguments, conceptually the method's `InputArguments`
    /// property. Kept inline rather than as a separate property child node
    /// since `Variant` has no carrier for a structured `Argument[]` value.
    pub input_arguments: Vec<Argument>,
    /// Formal output arguments (`OutputArguments`); the Call service sizes
    /// its output array from this.
    pub output_arguments: Vec<Argument>,
}

impl std::fmt::Debug for MethodNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodNode")
            .field("base", &self.base)
            .field("executable", &self.executable)
            .field("user_executable", &self.user_executable)
            .field("is_async", &self.is_async)
            .finish()
    }
}

/// An `ObjectType` node.
#[derive(Clone)]
pub struct ObjectTypeNode {
    /// Common fields.
    pub base: Base,
    /// Whether this type may be instantiated directly.
    pub is_abstract: bool,
    /// Invoked after a new instance is wired into the address space.
    pub constructor: Option<ObjectConstructor>,
    /// Invoked before an instance is removed from the address space.
    pub destructor: Option<ObjectDestructor>,
}

impl std::fmt::Debug for ObjectTypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTypeNode")
            .field("base", &self.base)
            .field("is_abstract", &self.is_abstract)
            .finish()
    }
}

/// A `VariableType` node.
#[derive(Clone)]
pub struct VariableTypeNode {
    /// Common fields.
    pub base: Base,
    /// The default data type of instances of this type.
    pub data_type: NodeId,
    /// The default value rank of instances.
    pub value_rank: i32,
    /// The default array dimensions of instances.
    pub array_dimensions: Option<Vec<u32>>,
    /// Bits describing how instances' `Value` attribute may be accessed.
    pub access_level: AccessLevel,
    /// Bits describing how the current user may access instances.
    pub user_access_level: AccessLevel,
    /// Minimum sampling interval instances should honour.
    pub minimum_sampling_interval: f64,
    /// Whether instances historize by default.
    pub historizing: bool,
    /// The type's own default value.
    pub value: ValueSource,
    /// Whether this type may be instantiated directly.
    pub is_abstract: bool,
}

impl std::fmt::Debug for VariableTypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableTypeNode")
            .field("base", &self.base)
            .field("data_type", &self.data_type)
            .field("is_abstract", &self.is_abstract)
            .finish()
    }
}

/// A `ReferenceType` node.
#[derive(Debug, Clone)]
pub struct ReferenceTypeNode {
    /// Common fields.
    pub base: Base,
    /// Whether this reference type may be used directly (vs. only via a subtype).
    pub is_abstract: bool,
    /// Whether forward and inverse traversal mean the same thing.
    pub symmetric: bool,
    /// Name to use when displaying the inverse direction of this reference type.
    pub inverse_name: Option<LocalizedText>,
}

/// A `DataType` node.
#[derive(Debug, Clone)]
pub struct DataTypeNode {
    /// Common fields.
    pub base: Base,
    /// Whether this data type may be used directly as a concrete value's type.
    pub is_abstract: bool,
}

/// A `View` node.
#[derive(Debug, Clone)]
pub struct ViewNode {
    /// Common fields.
    pub base: Base,
    /// Advisory: `true` if the subgraph reachable from this view has no cycles.
    pub contains_no_loops: bool,
    /// Which kinds of events this view can surface.
    pub event_notifier: u8,
}

/// A node in the address space, tagged by its `NodeClass`. See the design
/// note on modelling polymorphism as a sum type rather than embedded-struct
/// casts: attribute access becomes an exhaustive match instead of an
/// "unreachable default" branch.
#[derive(Debug, Clone)]
pub enum Node {
    /// `Object`.
    Object(Box<ObjectNode>),
    /// `Variable`.
    Variable(Box<VariableNode>),
    /// `Method`.
    Method(Box<MethodNode>),
    /// `ObjectType`.
    ObjectType(Box<ObjectTypeNode>),
    /// `VariableType`.
    VariableType(Box<VariableTypeNode>),
    /// `ReferenceType`.
    ReferenceType(Box<ReferenceTypeNode>),
    /// `DataType`.
    DataType(Box<DataTypeNode>),
    /// `View`.
    View(Box<ViewNode>),
}

impl Node {
    /// Borrow the common fields, regardless of node class.
    pub fn base(&self) -> &Base {
        match self {
            Node::Object(n) => &n.base,
            Node::Variable(n) => &n.base,
            Node::Method(n) => &n.base,
            Node::ObjectType(n) => &n.base,
            Node::VariableType(n) => &n.base,
            Node::ReferenceType(n) => &n.base,
            Node::DataType(n) => &n.base,
            Node::View(n) => &n.base,
        }
    }

    /// Mutably borrow the common fields, regardless of node class.
    pub fn base_mut(&mut self) -> &mut Base {
        match self {
            Node::Object(n) => &mut n.base,
            Node::Variable(n) => &mut n.base,
            Node::Method(n) => &mut n.base,
            Node::ObjectType(n) => &mut n.base,
            Node::VariableType(n) => &mut n.base,
            Node::ReferenceType(n) => &mut n.base,
            Node::DataType(n) => &mut n.base,
            Node::View(n) => &mut n.base,
        }
    }

    /// The node's id.
    pub fn node_id(&self) -> &NodeId {
        &self.base().node_id
    }

    /// The node's class.
    pub fn node_class(&self) -> NodeClass {
        match self {
            Node::Object(_) => NodeClass::Object,
            Node::Variable(_) => NodeClass::Variable,
            Node::Method(_) => NodeClass::Method,
            Node::ObjectType(_) => NodeClass::ObjectType,
            Node::VariableType(_) => NodeClass::VariableType,
            Node::ReferenceType(_) => NodeClass::ReferenceType,
            Node::DataType(_) => NodeClass::DataType,
            Node::View(_) => NodeClass::View,
        }
    }

    /// Read a generic (class-independent) attribute. Returns `None` when
    /// `attribute_id` is not one of the common attributes or is not
    /// applicable to this node's class; the caller then tries class-specific
    /// attributes, and finally `BadAttributeIdInvalid` if neither matches.
    pub fn get_generic_attribute(&self, attribute_id: AttributeId) -> Option<opcua_types::Variant> {
        use opcua_types::Variant;
        let base = self.base();
        Some(match attribute_id {
            AttributeId::NodeId => Variant::NodeId(Box::new(base.node_id.clone())),
            AttributeId::NodeClass => Variant::Int32(self.node_class() as i32),
            AttributeId::BrowseName => Variant::QualifiedName(Box::new(base.browse_name.clone())),
            AttributeId::DisplayName => Variant::LocalizedText(Box::new(base.display_name.clone())),
            AttributeId::Description => Variant::LocalizedText(Box::new(base.description.clone()?)),
            AttributeId::WriteMask => Variant::UInt32(base.write_mask.bits()),
            AttributeId::UserWriteMask => Variant::UInt32(base.user_write_mask.bits()),
            _ => return None,
        })
    }
}
