// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! View services (§4.7): Browse, BrowseNext, TranslateBrowsePathsToNodeIds.
//!
//! Browse pages its result through the owning [`Session`]'s ContinuationPoint
//! table (P7): once `requested_max_references_per_node` references have been
//! gathered for a node, the rest are stashed under a fresh id and
//! `BrowseNext` hands them out a page at a time.

use opcua_nodes::{hierarchy, Node, NodeStore};
use opcua_types::{
    constants::object_id,
    qualified_name::QualifiedName,
    service_types::{
        BrowseDescription, BrowseDirection, BrowseNextRequest, BrowseNextResponse, BrowsePath,
        BrowsePathResult, BrowsePathTarget, BrowseRequest, BrowseResponse, BrowseResult,
        BrowseResultMask, ReferenceDescription, RelativePathElement, ResponseHeader,
        TranslateBrowsePathsToNodeIdsRequest, TranslateBrowsePathsToNodeIdsResponse,
    },
    ByteString, ExpandedNodeId, NodeId, StatusCode,
};

use crate::session::{ContinuationPoint, Session};

/// The `Browse` service.
pub fn browse(store: &NodeStore, session: &Session, request: BrowseRequest) -> BrowseResponse {
    let max_per_node = request.requested_max_references_per_node as usize;
    let results = request
        .nodes_to_browse
        .into_iter()
        .map(|item| browse_one(store, session, max_per_node, item))
        .collect();
    BrowseResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn browse_one(
    store: &NodeStore,
    session: &Session,
    max_per_node: usize,
    description: BrowseDescription,
) -> BrowseResult {
    let Some(mut refs) = store.iter_references(&description.node_id) else {
        return BrowseResult {
            status_code: StatusCode::BadNodeIdUnknown,
            continuation_point: ByteString::null(),
            references: Vec::new(),
        };
    };

    let matches_direction = |is_inverse: bool| match description.browse_direction {
        BrowseDirection::Forward => !is_inverse,
        BrowseDirection::Inverse => is_inverse,
        BrowseDirection::Both => true,
    };
    let matches_reference_type = |reference_type_id: &NodeId| {
        if description.reference_type_id.is_null() {
            return true;
        }
        if description.include_subtypes {
            hierarchy::is_subtype_or_same(store, reference_type_id, &description.reference_type_id)
        } else {
            reference_type_id == &description.reference_type_id
        }
    };

    refs.retain(|r| matches_direction(r.is_inverse) && matches_reference_type(&r.reference_type_id));
    refs.retain(|r| {
        let Some(class) = hierarchy::target_node_class(store, &r.target_id) else {
            return true;
        };
        description.node_class_mask.matches(class)
    });

    let descriptions: Vec<ReferenceDescription> = refs
        .into_iter()
        .map(|r| describe_reference(store, &r, description.result_mask))
        .collect();

    if max_per_node == 0 || descriptions.len() <= max_per_node {
        return BrowseResult {
            status_code: StatusCode::Good,
            continuation_point: ByteString::null(),
            references: descriptions,
        };
    }

    if session.continuation_point_count() >= session.max_continuation_points() {
        return BrowseResult {
            status_code: StatusCode::BadNoContinuationPoints,
            continuation_point: ByteString::null(),
            references: Vec::new(),
        };
    }

    let (page, remaining) = descriptions.split_at(max_per_node);
    let id = ByteString::from(uuid::Uuid::new_v4().as_bytes().to_vec());
    session.store_continuation_point(
        id.clone(),
        ContinuationPoint {
            remaining: remaining.to_vec(),
        },
    );
    BrowseResult {
        status_code: StatusCode::Good,
        continuation_point: id,
        references: page.to_vec(),
    }
}

fn describe_reference(
    store: &NodeStore,
    r: &opcua_nodes::Reference,
    mask: BrowseResultMask,
) -> ReferenceDescription {
    use BrowseResultMask as Mask;

    let target_info = if r.target_id.is_local() {
        store.with_node(&r.target_id.node_id, |n| {
            (
                n.node_class(),
                n.base().browse_name.clone(),
                n.base().display_name.clone(),
                type_definition_of(store, &r.target_id.node_id),
            )
        })
    } else {
        None
    };

    ReferenceDescription {
        reference_type_id: if mask.contains(Mask::REFERENCE_TYPE_ID) {
            r.reference_type_id.clone()
        } else {
            NodeId::null()
        },
        is_forward: mask.contains(Mask::IS_FORWARD) && !r.is_inverse,
        node_id: r.target_id.clone(),
        browse_name: if mask.contains(Mask::BROWSE_NAME) {
            target_info.as_ref().map(|(_, name, _, _)| name.clone())
        } else {
            None
        },
        display_name: if mask.contains(Mask::DISPLAY_NAME) {
            target_info.as_ref().map(|(_, _, display, _)| display.clone())
        } else {
            None
        },
        node_class: if mask.contains(Mask::NODE_CLASS) {
            target_info.as_ref().map(|(class, ..)| *class)
        } else {
            None
        },
        type_definition: if mask.contains(Mask::TYPE_DEFINITION) {
            target_info.and_then(|(_, _, _, type_def)| type_def)
        } else {
            None
        },
    }
}

fn type_definition_of(store: &NodeStore, node_id: &NodeId) -> Option<ExpandedNodeId> {
    let has_type_definition = NodeId::new(0, object_id::HAS_TYPE_DEFINITION);
    let refs = store.iter_references(node_id)?;
    refs.into_iter()
        .find(|r| !r.is_inverse && r.reference_type_id == has_type_definition)
        .map(|r| r.target_id)
}

/// The `BrowseNext` service.
pub fn browse_next(session: &Session, request: BrowseNextRequest) -> BrowseNextResponse {
    let results = request
        .continuation_points
        .into_iter()
        .map(|id| browse_next_one(session, request.release_continuation_points, id))
        .collect();
    BrowseNextResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn browse_next_one(session: &Session, release: bool, id: ByteString) -> BrowseResult {
    if release {
        session.release_continuation_point(&id);
        return BrowseResult {
            status_code: StatusCode::Good,
            continuation_point: ByteString::null(),
            references: Vec::new(),
        };
    }
    let Some(point) = session.take_continuation_point(&id) else {
        return BrowseResult {
            status_code: StatusCode::BadNoContinuationPoints,
            continuation_point: ByteString::null(),
            references: Vec::new(),
        };
    };
    BrowseResult {
        status_code: StatusCode::Good,
        continuation_point: ByteString::null(),
        references: point.remaining,
    }
}

/// The `TranslateBrowsePathsToNodeIds` service.
pub fn translate_browse_paths_to_node_ids(
    store: &NodeStore,
    request: TranslateBrowsePathsToNodeIdsRequest,
) -> TranslateBrowsePathsToNodeIdsResponse {
    let results = request
        .browse_paths
        .into_iter()
        .map(|path| translate_one_path(store, path))
        .collect();
    TranslateBrowsePathsToNodeIdsResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn translate_one_path(store: &NodeStore, path: BrowsePath) -> BrowsePathResult {
    if !store.contains(&path.starting_node) {
        return BrowsePathResult {
            status_code: StatusCode::BadNodeIdUnknown,
            targets: Vec::new(),
        };
    }

    let mut current = vec![path.starting_node];
    for element in &path.relative_path {
        if element.target_name.name.is_empty() {
            return BrowsePathResult {
                status_code: StatusCode::BadBrowseNameInvalid,
                targets: Vec::new(),
            };
        }
        let mut next = Vec::new();
        for node_id in &current {
            next.extend(follow_hop(store, node_id, element));
        }
        next.sort_by(|a: &NodeId, b: &NodeId| format!("{a}").cmp(&format!("{b}")));
        next.dedup();
        current = next;
        if current.is_empty() {
            break;
        }
    }

    if current.is_empty() {
        return BrowsePathResult {
            status_code: StatusCode::BadNoMatch,
            targets: Vec::new(),
        };
    }

    BrowsePathResult {
        status_code: StatusCode::Good,
        targets: current
            .into_iter()
            .map(|id| BrowsePathTarget {
                target_id: ExpandedNodeId::from(id),
                remaining_path_index: u32::MAX,
            })
            .collect(),
    }
}

fn follow_hop(
    store: &NodeStore,
    node_id: &NodeId,
    element: &RelativePathElement,
) -> Vec<NodeId> {
    let Some(refs) = store.iter_references(node_id) else {
        return Vec::new();
    };
    refs.into_iter()
        .filter(|r| r.is_inverse == element.is_inverse)
        .filter(|r| {
            if element.include_subtypes {
                hierarchy::is_subtype_or_same(store, &r.reference_type_id, &element.reference_type_id)
            } else {
                r.reference_type_id == element.reference_type_id
            }
        })
        .filter(|r| r.target_id.is_local())
        .filter_map(|r| {
            let matches_name = store.with_node(&r.target_id.node_id, |n| {
                n.base().browse_name == element.target_name
            });
            matches_name.unwrap_or(false).then(|| r.target_id.node_id.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use opcua_nodes::{Base, ObjectNode};
    use opcua_types::service_types::{NodeClassMask, RequestHeader};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn store_with_tree() -> (NodeStore, NodeId, NodeId) {
        let store = NodeStore::new();
        let organizes = NodeId::new(0, object_id::ORGANIZES);
        store
            .insert(Node::ReferenceType(Box::new(opcua_nodes::ReferenceTypeNode {
                base: Base::new(organizes.clone(), "Organizes", "Organizes"),
                is_abstract: false,
                symmetric: false,
                inverse_name: None,
            })))
            .unwrap();
        let root = NodeId::new(0, 85u32);
        store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(root.clone(), "Objects", "Objects"),
                event_notifier: 0,
            })))
            .unwrap();
        let child = NodeId::new(1, 1u32);
        store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(child.clone(), "Child", "Child"),
                event_notifier: 0,
            })))
            .unwrap();
        store.add_reference_pair(&root, &organizes, &child).unwrap();
        (store, root, child)
    }

    fn session() -> Arc<Session> {
        let manager = crate::session::SessionManager::new();
        let limits = crate::config::Limits::default();
        manager.create("t".into(), 0.0, &limits, now())
    }

    use std::sync::Arc;

    #[test]
    fn browse_forward_returns_child() {
        let (store, root, child) = store_with_tree();
        let session = session();
        let request = BrowseRequest {
            request_header: RequestHeader::default(),
            view: NodeId::null(),
            requested_max_references_per_node: 0,
            nodes_to_browse: vec![BrowseDescription {
                node_id: root,
                browse_direction: BrowseDirection::Forward,
                reference_type_id: NodeId::null(),
                include_subtypes: true,
                node_class_mask: NodeClassMask::empty(),
                result_mask: BrowseResultMask::ALL,
            }],
        };
        let response = browse(&store, &session, request);
        assert_eq!(response.results[0].status_code, StatusCode::Good);
        assert_eq!(response.results[0].references.len(), 1);
        assert_eq!(response.results[0].references[0].node_id.node_id, child);
    }

    #[test]
    fn browse_pages_through_continuation_point() {
        let (store, root, _child) = store_with_tree();
        let session = session();
        let second = NodeId::new(1, 2u32);
        store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(second.clone(), "Second", "Second"),
                event_notifier: 0,
            })))
            .unwrap();
        store
            .add_reference_pair(&root, &NodeId::new(0, object_id::ORGANIZES), &second)
            .unwrap();

        let request = BrowseRequest {
            request_header: RequestHeader::default(),
            view: NodeId::null(),
            requested_max_references_per_node: 1,
            nodes_to_browse: vec![BrowseDescription {
                node_id: root,
                browse_direction: BrowseDirection::Forward,
                reference_type_id: NodeId::null(),
                include_subtypes: true,
                node_class_mask: NodeClassMask::empty(),
                result_mask: BrowseResultMask::ALL,
            }],
        };
        let response = browse(&store, &session, request);
        assert_eq!(response.results[0].references.len(), 1);
        let cp = response.results[0].continuation_point.clone();
        assert!(!cp.is_null());

        let next_request = BrowseNextRequest {
            request_header: RequestHeader::default(),
            release_continuation_points: false,
            continuation_points: vec![cp],
        };
        let next_response = browse_next(&session, next_request);
        assert_eq!(next_response.results[0].references.len(), 1);
    }

    #[test]
    fn translate_browse_path_resolves_child() {
        let (store, root, child) = store_with_tree();
        let request = TranslateBrowsePathsToNodeIdsRequest {
            request_header: RequestHeader::default(),
            browse_paths: vec![BrowsePath {
                starting_node: root,
                relative_path: vec![RelativePathElement {
                    reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                    include_subtypes: true,
                    is_inverse: false,
                    target_name: QualifiedName::from("Child"),
                }],
            }],
        };
        let response = translate_browse_paths_to_node_ids(&store, request);
        assert_eq!(response.results[0].status_code, StatusCode::Good);
        assert_eq!(response.results[0].targets[0].target_id.node_id, child);
    }
}
