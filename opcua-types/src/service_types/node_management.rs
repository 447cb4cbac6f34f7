// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for AddNodes, DeleteNodes, AddReferences and
//! DeleteReferences (§4.6).

use crate::{
    localized_text::LocalizedText,
    node_class::{AccessLevel, WriteMask},
    node_id::NodeId,
    qualified_name::QualifiedName,
    status_code::StatusCode,
    variant::Variant,
};

use super::headers::{RequestHeader, ResponseHeader};

/// Common fields every node class carries, used when materialising a node
/// from an `AddNodesItem`'s attribute blob.
#[derive(Debug, Clone, Default)]
pub struct GenericAttributes {
    /// Display name.
    pub display_name: LocalizedText,
    /// Description.
    pub description: LocalizedText,
    /// `WriteMask`.
    pub write_mask: WriteMask,
    /// `UserWriteMask`, must be a subset of `write_mask` (I4).
    pub user_write_mask: WriteMask,
}

/// Per-class attribute payload for AddNodes, mirroring the `NodeAttributes`
/// union in the OPC UA information model.
#[derive(Debug, Clone)]
pub enum NodeAttributes {
    /// `ObjectAttributes`.
    Object {
        /// Common fields.
        generic: GenericAttributes,
        /// `EventNotifier` mask.
        event_notifier: u8,
    },
    /// `VariableAttributes`.
    Variable {
        /// Common fields.
        generic: GenericAttributes,
        /// Initial value.
        value: Variant,
        /// Declared data type.
        data_type: NodeId,
        /// Declared value rank.
        value_rank: i32,
        /// Declared array dimensions.
        array_dimensions: Vec<u32>,
        /// `AccessLevel`.
        access_level: AccessLevel,
        /// `UserAccessLevel`, must be a subset of `access_level` (I4).
        user_access_level: AccessLevel,
        /// Minimum sampling interval the server may impose.
        minimum_sampling_interval: f64,
        /// `Historizing` flag.
        historizing: bool,
    },
    /// `MethodAttributes`.
    Method {
        /// Common fields.
        generic: GenericAttributes,
        /// `Executable` flag.
        executable: bool,
        /// `UserExecutable`, must imply `executable` (I4).
        user_executable: bool,
    },
    /// `ObjectTypeAttributes`.
    ObjectType {
        /// Common fields.
        generic: GenericAttributes,
        /// `IsAbstract` flag.
        is_abstract: bool,
    },
    /// `VariableTypeAttributes`.
    VariableType {
        /// Common fields.
        generic: GenericAttributes,
        /// Default value.
        value: Variant,
        /// Declared data type.
        data_type: NodeId,
        /// Declared value rank.
        value_rank: i32,
        /// Declared array dimensions.
        array_dimensions: Vec<u32>,
        /// `IsAbstract` flag.
        is_abstract: bool,
    },
    /// `ReferenceTypeAttributes`.
    ReferenceType {
        /// Common fields.
        generic: GenericAttributes,
        /// `IsAbstract` flag.
        is_abstract: bool,
        /// `Symmetric` flag.
        symmetric: bool,
        /// `InverseName`.
        inverse_name: LocalizedText,
    },
    /// `DataTypeAttributes`.
    DataType {
        /// Common fields.
        generic: GenericAttributes,
        /// `IsAbstract` flag.
        is_abstract: bool,
    },
    /// `ViewAttributes`.
    View {
        /// Common fields.
        generic: GenericAttributes,
        /// `ContainsNoLoops` flag.
        contains_no_loops: bool,
        /// `EventNotifier` mask.
        event_notifier: u8,
    },
}

impl NodeAttributes {
    /// Borrow the common fields shared by every variant.
    pub fn generic(&self) -> &GenericAttributes {
        match self {
            NodeAttributes::Object { generic, .. }
            | NodeAttributes::Variable { generic, .. }
            | NodeAttributes::Method { generic, .. }
            | NodeAttributes::ObjectType { generic, .. }
            | NodeAttributes::VariableType { generic, .. }
            | NodeAttributes::ReferenceType { generic, .. }
            | NodeAttributes::DataType { generic, .. }
            | NodeAttributes::View { generic, .. } => generic,
        }
    }

    /// The `NodeClass` this attribute payload is for.
    pub fn node_class(&self) -> crate::node_class::NodeClass {
        use crate::node_class::NodeClass;
        match self {
            NodeAttributes::Object { .. } => NodeClass::Object,
            NodeAttributes::Variable { .. } => NodeClass::Variable,
            NodeAttributes::Method { .. } => NodeClass::Method,
            NodeAttributes::ObjectType { .. } => NodeClass::ObjectType,
            NodeAttributes::VariableType { .. } => NodeClass::VariableType,
            NodeAttributes::ReferenceType { .. } => NodeClass::ReferenceType,
            NodeAttributes::DataType { .. } => NodeClass::DataType,
            NodeAttributes::View { .. } => NodeClass::View,
        }
    }
}

/// One node to add, as carried in an `AddNodesRequest`.
#[derive(Debug, Clone)]
pub struct AddNodesItem {
    /// The parent node the new node is wired under.
    pub parent_node_id: crate::expanded_node_id::ExpandedNodeId,
    /// The reference type connecting the parent to the new node.
    pub reference_type_id: NodeId,
    /// The requested node id; null to auto-allocate a numeric id in the
    /// given namespace.
    pub requested_new_node_id: NodeId,
    /// The new node's browse name.
    pub browse_name: QualifiedName,
    /// The new node's attributes.
    pub node_attributes: NodeAttributes,
    /// For Object/Variable nodes, the type to instantiate from; null
    /// defaults to `BaseObjectType`/`BaseDataVariableType`.
    pub type_definition: crate::expanded_node_id::ExpandedNodeId,
}

/// Result of adding one node.
#[derive(Debug, Clone)]
pub struct AddNodesResult {
    /// `Good` or an identity/type/parent-reference error.
    pub status_code: StatusCode,
    /// The id the node was actually stored under.
    pub added_node_id: NodeId,
}

/// Parameters of an AddNodes service call.
#[derive(Debug, Clone)]
pub struct AddNodesRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The nodes to add.
    pub nodes_to_add: Vec<AddNodesItem>,
}

/// Result of an AddNodes service call.
#[derive(Debug, Clone)]
pub struct AddNodesResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `nodes_to_add`.
    pub results: Vec<AddNodesResult>,
}

/// One node to delete, as carried in a `DeleteNodesRequest`.
#[derive(Debug, Clone)]
pub struct DeleteNodesItem {
    /// The node to delete.
    pub node_id: NodeId,
    /// If set, also delete references that targeted this node from other nodes.
    pub delete_target_references: bool,
}

/// Parameters of a DeleteNodes service call.
#[derive(Debug, Clone)]
pub struct DeleteNodesRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The nodes to delete.
    pub nodes_to_delete: Vec<DeleteNodesItem>,
}

/// Result of a DeleteNodes service call.
#[derive(Debug, Clone)]
pub struct DeleteNodesResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `nodes_to_delete`.
    pub results: Vec<StatusCode>,
}

/// One reference to add, as carried in an `AddReferencesRequest`.
#[derive(Debug, Clone)]
pub struct AddReferencesItem {
    /// The source node.
    pub source_node_id: NodeId,
    /// The reference type connecting source to target.
    pub reference_type_id: NodeId,
    /// `true` if this reference is forward from the source.
    pub is_forward: bool,
    /// Non-empty only for references to nodes on another server; rejected
    /// with `BadNotImplemented` (open question, §9).
    pub target_server_uri: crate::string::UAString,
    /// The target node.
    pub target_node_id: crate::expanded_node_id::ExpandedNodeId,
    /// The target's node class, used to validate `HasSubType` wiring.
    pub target_node_class: crate::node_class::NodeClass,
}

/// Parameters of an AddReferences service call.
#[derive(Debug, Clone)]
pub struct AddReferencesRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The references to add.
    pub references_to_add: Vec<AddReferencesItem>,
}

/// Result of an AddReferences service call.
#[derive(Debug, Clone)]
pub struct AddReferencesResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `references_to_add`.
    pub results: Vec<StatusCode>,
}

/// One reference to delete, as carried in a `DeleteReferencesRequest`.
#[derive(Debug, Clone)]
pub struct DeleteReferencesItem {
    /// The source node.
    pub source_node_id: NodeId,
    /// The reference type connecting source to target.
    pub reference_type_id: NodeId,
    /// `true` if the reference is forward from the source.
    pub is_forward: bool,
    /// The target node.
    pub target_node_id: crate::expanded_node_id::ExpandedNodeId,
    /// If set, also delete the matching inverse reference on the target.
    pub delete_bidirectional: bool,
}

/// Parameters of a DeleteReferences service call.
#[derive(Debug, Clone)]
pub struct DeleteReferencesRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The references to delete.
    pub references_to_delete: Vec<DeleteReferencesItem>,
}

/// Result of a DeleteReferences service call.
#[derive(Debug, Clone)]
pub struct DeleteReferencesResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `references_to_delete`.
    pub results: Vec<StatusCode>,
}
