// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for Browse, BrowseNext and
//! TranslateBrowsePathsToNodeIds (§4.7).

use bitflags::bitflags;

use crate::{
    localized_text::LocalizedText, node_class::NodeClass, node_id::NodeId,
    qualified_name::QualifiedName, status_code::StatusCode,
};

use super::headers::{ContinuationPointId, RequestHeader, ResponseHeader};

/// Which direction of references a Browse should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseDirection {
    /// Follow only forward (non-inverse) references.
    Forward,
    /// Follow only inverse references.
    Inverse,
    /// Follow both directions.
    Both,
}

bitflags! {
    /// Bit mask of node classes to include in a Browse result. `0` means "all classes".
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeClassMask: u32 {
        /// Match `Object` nodes.
        const OBJECT = 1;
        /// Match `Variable` nodes.
        const VARIABLE = 2;
        /// Match `Method` nodes.
        const METHOD = 4;
        /// Match `ObjectType` nodes.
        const OBJECT_TYPE = 8;
        /// Match `VariableType` nodes.
        const VARIABLE_TYPE = 16;
        /// Match `ReferenceType` nodes.
        const REFERENCE_TYPE = 32;
        /// Match `DataType` nodes.
        const DATA_TYPE = 64;
        /// Match `View` nodes.
        const VIEW = 128;
    }
}

impl NodeClassMask {
    /// `true` if this mask matches everything (the wire value `0`) or
    /// explicitly includes `class`.
    pub fn matches(&self, class: NodeClass) -> bool {
        if self.is_empty() {
            return true;
        }
        let bit = match class {
            NodeClass::Unspecified => return true,
            NodeClass::Object => NodeClassMask::OBJECT,
            NodeClass::Variable => NodeClassMask::VARIABLE,
            NodeClass::Method => NodeClassMask::METHOD,
            NodeClass::ObjectType => NodeClassMask::OBJECT_TYPE,
            NodeClass::VariableType => NodeClassMask::VARIABLE_TYPE,
            NodeClass::ReferenceType => NodeClassMask::REFERENCE_TYPE,
            NodeClass::DataType => NodeClassMask::DATA_TYPE,
            NodeClass::View => NodeClassMask::VIEW,
        };
        self.contains(bit)
    }
}

bitflags! {
    /// Which optional fields of a `ReferenceDescription` to fill in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BrowseResultMask: u32 {
        /// Include `reference_type_id`.
        const REFERENCE_TYPE_ID = 1;
        /// Include `is_forward`.
        const IS_FORWARD = 2;
        /// Include `node_class`.
        const NODE_CLASS = 4;
        /// Include `browse_name`.
        const BROWSE_NAME = 8;
        /// Include `display_name`.
        const DISPLAY_NAME = 16;
        /// Include `type_definition`.
        const TYPE_DEFINITION = 32;
        /// Every optional field.
        const ALL = 63;
    }
}

/// One node to browse, as carried in a `BrowseRequest`.
#[derive(Debug, Clone)]
pub struct BrowseDescription {
    /// The node whose references are to be listed.
    pub node_id: NodeId,
    /// Which direction to follow.
    pub browse_direction: BrowseDirection,
    /// Restrict to this reference type (and, if `include_subtypes`, its
    /// subtypes); null matches every reference type.
    pub reference_type_id: NodeId,
    /// If set, also match subtypes of `reference_type_id`.
    pub include_subtypes: bool,
    /// Restrict to nodes of these classes.
    pub node_class_mask: NodeClassMask,
    /// Which `ReferenceDescription` fields to fill in.
    pub result_mask: BrowseResultMask,
}

/// One outgoing or incoming reference surfaced by Browse.
#[derive(Debug, Clone)]
pub struct ReferenceDescription {
    /// The reference type of this edge.
    pub reference_type_id: NodeId,
    /// `true` if this is a forward (non-inverse) reference from the browsed node.
    pub is_forward: bool,
    /// The id of the node at the other end of the reference.
    pub node_id: crate::expanded_node_id::ExpandedNodeId,
    /// The target's browse name, if requested.
    pub browse_name: Option<QualifiedName>,
    /// The target's display name, if requested.
    pub display_name: Option<LocalizedText>,
    /// The target's node class, if requested.
    pub node_class: Option<NodeClass>,
    /// The target's `HasTypeDefinition` target, if requested and applicable.
    pub type_definition: Option<crate::expanded_node_id::ExpandedNodeId>,
}

/// Result of browsing one `BrowseDescription`.
#[derive(Debug, Clone)]
pub struct BrowseResult {
    /// `Good` unless the browse description itself was invalid.
    pub status_code: StatusCode,
    /// Opaque bookmark to continue a paged result with BrowseNext, empty
    /// when the whole result set was returned.
    pub continuation_point: ContinuationPointId,
    /// The references found, up to `requestedMaxReferencesPerNode`.
    pub references: Vec<ReferenceDescription>,
}

/// Parameters of a Browse service call.
#[derive(Debug, Clone)]
pub struct BrowseRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// View to browse within; unused (full address space) when null.
    pub view: NodeId,
    /// Caps the number of references returned per node before a
    /// continuation point is produced; `0` means unbounded.
    pub requested_max_references_per_node: u32,
    /// The nodes to browse.
    pub nodes_to_browse: Vec<BrowseDescription>,
}

/// Result of a Browse service call.
#[derive(Debug, Clone)]
pub struct BrowseResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `nodes_to_browse`.
    pub results: Vec<BrowseResult>,
}

/// Parameters of a BrowseNext service call.
#[derive(Debug, Clone)]
pub struct BrowseNextRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// If set, release the continuation points instead of continuing them.
    pub release_continuation_points: bool,
    /// The continuation points to resume (or release).
    pub continuation_points: Vec<ContinuationPointId>,
}

/// Result of a BrowseNext service call.
#[derive(Debug, Clone)]
pub struct BrowseNextResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `continuation_points`.
    pub results: Vec<BrowseResult>,
}

/// One hop of a `BrowsePath`: which reference type to follow and which
/// target browse name to match.
#[derive(Debug, Clone)]
pub struct RelativePathElement {
    /// The reference type to follow.
    pub reference_type_id: NodeId,
    /// If set, also follow subtypes of `reference_type_id`.
    pub include_subtypes: bool,
    /// If set, follow the reference backwards (from target to source).
    pub is_inverse: bool,
    /// The browse name the target of the reference must have.
    pub target_name: QualifiedName,
}

/// A starting node plus a sequence of hops to resolve to a target `NodeId`.
#[derive(Debug, Clone)]
pub struct BrowsePath {
    /// Starting node.
    pub starting_node: NodeId,
    /// Hops to follow from the starting node.
    pub relative_path: Vec<RelativePathElement>,
}

/// One `NodeId` (and remaining unmatched path, for partial matches across
/// server boundaries — unused by this core, always empty) found by walking a
/// `BrowsePath`.
#[derive(Debug, Clone)]
pub struct BrowsePathTarget {
    /// The resolved node.
    pub target_id: crate::expanded_node_id::ExpandedNodeId,
    /// Always `u32::MAX` in this core: remaining-path continuation across
    /// server boundaries is not implemented.
    pub remaining_path_index: u32,
}

/// Result of resolving one `BrowsePath`.
#[derive(Debug, Clone)]
pub struct BrowsePathResult {
    /// `Good`, `BadBrowseNameInvalid` (an element's target name was empty) or
    /// `BadNoMatch` (no node matched the path).
    pub status_code: StatusCode,
    /// The nodes the path resolved to (usually at most one).
    pub targets: Vec<BrowsePathTarget>,
}

/// Parameters of a TranslateBrowsePathsToNodeIds service call.
#[derive(Debug, Clone)]
pub struct TranslateBrowsePathsToNodeIdsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The paths to resolve.
    pub browse_paths: Vec<BrowsePath>,
}

/// Result of a TranslateBrowsePathsToNodeIds service call.
#[derive(Debug, Clone)]
pub struct TranslateBrowsePathsToNodeIdsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `browse_paths`.
    pub results: Vec<BrowsePathResult>,
}
