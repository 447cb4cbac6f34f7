// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Node-management services (§4.6): AddNodes, DeleteNodes, AddReferences,
//! DeleteReferences.
//!
//! AddNodes runs in two phases: [`materialize_node`] builds and inserts the
//! node from its attribute blob, then [`finish_add_node`] validates the
//! parent/type wiring and instantiates mandatory children. A failure in the
//! second phase rolls back the insert from the first, since by then the node
//! is live in the store but not yet reachable from anything.

use log::warn;
use opcua_nodes::{
    hierarchy, Base, DataTypeNode, MethodNode, Node, NodeStore, ObjectNode, ObjectTypeNode,
    ReferenceTypeNode, ValueSource, VariableNode, VariableTypeNode, ViewNode,
};
use opcua_types::{
    constants::object_id,
    node_class::AccessLevel,
    qualified_name::QualifiedName,
    service_types::{
        AddNodesItem, AddNodesRequest, AddNodesResponse, AddNodesResult, AddReferencesItem,
        AddReferencesRequest, AddReferencesResponse, DeleteNodesItem, DeleteNodesRequest,
        DeleteNodesResponse, DeleteReferencesItem, DeleteReferencesRequest,
        DeleteReferencesResponse, NodeAttributes, ResponseHeader,
    },
    DataValue, ExpandedNodeId, NodeClass, NodeId, StatusCode,
};

/// The `AddNodes` service.
pub fn add_nodes(store: &NodeStore, request: AddNodesRequest) -> AddNodesResponse {
    let results = request
        .nodes_to_add
        .into_iter()
        .map(|item| add_one_node(store, item))
        .collect();
    AddNodesResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn add_one_node(store: &NodeStore, item: AddNodesItem) -> AddNodesResult {
    let node_class = item.node_attributes.node_class();
    let node = materialize_node(item.requested_new_node_id, item.browse_name, item.node_attributes);
    if let Err(status) = check_initial_value_type(store, &node) {
        return AddNodesResult {
            status_code: status,
            added_node_id: NodeId::null(),
        };
    }
    let node_id = match store.insert(node) {
        Ok(id) => id,
        Err(opcua_nodes::InsertError::NodeIdExists) => {
            return AddNodesResult {
                status_code: StatusCode::BadNodeIdExists,
                added_node_id: NodeId::null(),
            };
        }
    };

    match finish_add_node(
        store,
        &node_id,
        node_class,
        &item.parent_node_id,
        &item.reference_type_id,
        &item.type_definition,
    ) {
        Ok(()) => AddNodesResult {
            status_code: StatusCode::Good,
            added_node_id: node_id,
        },
        Err(status) => {
            delete_node_bidirectional(store, &node_id);
            AddNodesResult {
                status_code: status,
                added_node_id: NodeId::null(),
            }
        }
    }
}

/// Build a [`Node`] of the right class from an `AddNodesItem`'s attribute
/// blob, copying the common fields onto [`Base`].
fn materialize_node(node_id: NodeId, browse_name: QualifiedName, attrs: NodeAttributes) -> Node {
    let generic = attrs.generic().clone();
    let mut base = Base::new(node_id, browse_name, generic.display_name);
    base.description = if generic.description.is_null() {
        None
    } else {
        Some(generic.description)
    };
    base.write_mask = generic.write_mask;
    base.user_write_mask = generic.user_write_mask;

    match attrs {
        NodeAttributes::Object { event_notifier, .. } => {
            Node::Object(Box::new(ObjectNode { base, event_notifier }))
        }
        NodeAttributes::Variable {
            value,
            data_type,
            value_rank,
            array_dimensions,
            access_level,
            user_access_level,
            minimum_sampling_interval,
            historizing,
            ..
        } => Node::Variable(Box::new(VariableNode {
            base,
            data_type,
            value_rank,
            array_dimensions: if array_dimensions.is_empty() {
                None
            } else {
                Some(array_dimensions)
            },
            access_level,
            user_access_level,
            minimum_sampling_interval,
            historizing,
            value: ValueSource::new(DataValue::new_now(value)),
        })),
        NodeAttributes::Method {
            executable,
            user_executable,
            ..
        } => Node::Method(Box::new(MethodNode {
            base,
            executable,
            user_executable,
            callback: None,
            is_async: false,
            input_arguments: Vec::new(),
            output_arguments: Vec::new(),
        })),
        NodeAttributes::ObjectType { is_abstract, .. } => Node::ObjectType(Box::new(ObjectTypeNode {
            base,
            is_abstract,
            constructor: None,
            destructor: None,
        })),
        NodeAttributes::VariableType {
            value,
            data_type,
            value_rank,
            array_dimensions,
            is_abstract,
            ..
        } => Node::VariableType(Box::new(VariableTypeNode {
            base,
            data_type,
            value_rank,
            array_dimensions: if array_dimensions.is_empty() {
                None
            } else {
                Some(array_dimensions)
            },
            access_level: AccessLevel::CURRENT_READ,
            user_access_level: AccessLevel::CURRENT_READ,
            minimum_sampling_interval: 0.0,
            historizing: false,
            value: ValueSource::new(DataValue::new_now(value)),
            is_abstract,
        })),
        NodeAttributes::ReferenceType {
            is_abstract,
            symmetric,
            inverse_name,
            ..
        } => Node::ReferenceType(Box::new(ReferenceTypeNode {
            base,
            is_abstract,
            symmetric,
            inverse_name: if inverse_name.is_null() {
                None
            } else {
                Some(inverse_name)
            },
        })),
        NodeAttributes::DataType { is_abstract, .. } => {
            Node::DataType(Box::new(DataTypeNode { base, is_abstract }))
        }
        NodeAttributes::View {
            contains_no_loops,
            event_notifier,
            ..
        } => Node::View(Box::new(ViewNode {
            base,
            contains_no_loops,
            event_notifier,
        })),
    }
}

/// §4.3/I3: type-check a freshly materialized Variable/VariableType's initial
/// value against its own declared `dataType`/`valueRank`/`arrayDimensions`,
/// before the node is inserted — a mismatch must leave no residual node in
/// the store (§8 scenario 4). A no-op for every other node class.
fn check_initial_value_type(store: &NodeStore, node: &Node) -> Result<(), StatusCode> {
    let (data_type, value_rank, array_dimensions, value) = match node {
        Node::Variable(v) => (&v.data_type, v.value_rank, v.array_dimensions.clone(), &v.value),
        Node::VariableType(v) => (&v.data_type, v.value_rank, v.array_dimensions.clone(), &v.value),
        _ => return Ok(()),
    };
    let opcua_nodes::ValueSource::Value { value: initial, .. } = value else {
        return Ok(());
    };
    let Some(variant) = &initial.value else {
        return Ok(());
    };
    let constraint = opcua_nodes::type_check::TypeConstraint {
        data_type: data_type.clone(),
        value_rank,
        array_dimensions: array_dimensions.unwrap_or_default(),
    };
    opcua_nodes::type_check::type_check_value(store, &constraint, variant, None).map(|_| ())
}

/// Validate the parent reference and instantiate from `type_definition`
/// (§4.6 phase 2).
fn finish_add_node(
    store: &NodeStore,
    node_id: &NodeId,
    node_class: NodeClass,
    parent_node_id: &ExpandedNodeId,
    reference_type_id: &NodeId,
    type_definition: &ExpandedNodeId,
) -> Result<(), StatusCode> {
    if !parent_node_id.is_local() || parent_node_id.is_null() {
        return Err(StatusCode::BadParentNodeIdInvalid);
    }
    let parent_id = &parent_node_id.node_id;
    if !store.contains(parent_id) {
        return Err(StatusCode::BadParentNodeIdInvalid);
    }

    let ref_type_class = store
        .with_node(reference_type_id, |n| n.node_class())
        .ok_or(StatusCode::BadReferenceTypeIdInvalid)?;
    if ref_type_class != NodeClass::ReferenceType {
        return Err(StatusCode::BadReferenceTypeIdInvalid);
    }
    let ref_is_abstract = store
        .with_node(reference_type_id, |n| match n {
            Node::ReferenceType(r) => r.is_abstract,
            _ => true,
        })
        .unwrap_or(true);
    if ref_is_abstract {
        return Err(StatusCode::BadReferenceTypeIdInvalid);
    }

    let is_type_node = matches!(
        node_class,
        NodeClass::ObjectType | NodeClass::VariableType | NodeClass::ReferenceType | NodeClass::DataType
    );
    if is_type_node {
        let has_subtype = NodeId::new(0, object_id::HAS_SUBTYPE);
        if reference_type_id != &has_subtype {
            return Err(StatusCode::BadReferenceTypeIdInvalid);
        }
        let parent_class = store
            .with_node(parent_id, |n| n.node_class())
            .ok_or(StatusCode::BadParentNodeIdInvalid)?;
        if parent_class != node_class {
            return Err(StatusCode::BadParentNodeIdInvalid);
        }
    } else {
        let has_child = NodeId::new(0, object_id::HAS_CHILD);
        let organizes = NodeId::new(0, object_id::ORGANIZES);
        let hierarchical = hierarchy::is_subtype_or_same(store, reference_type_id, &has_child)
            || hierarchy::is_subtype_or_same(store, reference_type_id, &organizes);
        if !hierarchical {
            return Err(StatusCode::BadReferenceTypeIdInvalid);
        }
    }

    if matches!(node_class, NodeClass::Object | NodeClass::Variable) {
        let default_type = if node_class == NodeClass::Object {
            NodeId::new(0, object_id::BASE_OBJECT_TYPE)
        } else {
            NodeId::new(0, object_id::BASE_DATA_VARIABLE_TYPE)
        };
        let type_id = if type_definition.is_null() {
            default_type
        } else if type_definition.is_local() {
            type_definition.node_id.clone()
        } else {
            return Err(StatusCode::BadTypeDefinitionInvalid);
        };
        if !store.contains(&type_id) {
            return Err(StatusCode::BadTypeDefinitionInvalid);
        }
        let has_type_definition = NodeId::new(0, object_id::HAS_TYPE_DEFINITION);
        store
            .add_reference_pair(node_id, &has_type_definition, &type_id)
            .map_err(|_| StatusCode::BadTypeDefinitionInvalid)?;

        instantiate_mandatory_children(store, &type_id, node_id)?;
    }

    store
        .add_reference_pair(parent_id, reference_type_id, node_id)
        .map_err(|_| StatusCode::BadParentNodeIdInvalid)?;

    if node_class == NodeClass::Variable {
        repair_variable_access_level(store, node_id);
    }

    Ok(())
}

/// OR `CURRENT_READ` into a freshly instantiated Variable's `accessLevel` if
/// the attribute blob left it unreadable (§4.6: "logged").
fn repair_variable_access_level(store: &NodeStore, node_id: &NodeId) {
    loop {
        let Some(mut owned) = store.get_copy(node_id) else {
            return;
        };
        let Node::Variable(v) = owned.node_mut() else {
            return;
        };
        if v.access_level.contains(AccessLevel::CURRENT_READ) {
            return;
        }
        v.access_level |= AccessLevel::CURRENT_READ;
        warn!("AddNodes: {node_id} had no CURRENT_READ access level, repairing it");
        match store.replace(owned) {
            Ok(()) => return,
            Err(opcua_nodes::ReplaceError::Stale) => continue,
            Err(opcua_nodes::ReplaceError::NotFound) => return,
        }
    }
}

/// Walk `type_id` and its supertype chain, copying (or linking) every
/// `Mandatory` child onto `instance_id` (§4.6 phase 2).
fn instantiate_mandatory_children(
    store: &NodeStore,
    type_id: &NodeId,
    instance_id: &NodeId,
) -> Result<(), StatusCode> {
    for template_type in hierarchy::get_type_hierarchy(store, type_id) {
        copy_mandatory_children(store, &template_type, instance_id)?;
    }
    Ok(())
}

fn copy_mandatory_children(
    store: &NodeStore,
    template_id: &NodeId,
    instance_id: &NodeId,
) -> Result<(), StatusCode> {
    let Some(refs) = store.iter_references(template_id) else {
        return Ok(());
    };
    let has_component = NodeId::new(0, object_id::HAS_COMPONENT);
    let has_property = NodeId::new(0, object_id::HAS_PROPERTY);

    for r in refs.iter().filter(|r| !r.is_inverse) {
        let is_child_ref = hierarchy::is_subtype_or_same(store, &r.reference_type_id, &has_component)
            || hierarchy::is_subtype_or_same(store, &r.reference_type_id, &has_property);
        if !is_child_ref || !r.target_id.is_local() {
            continue;
        }
        let child_id = r.target_id.node_id.clone();
        if !is_mandatory(store, &child_id) {
            continue;
        }
        let Some(child_browse_name) = store.with_node(&child_id, |n| n.base().browse_name.clone()) else {
            continue;
        };
        if find_child_by_browse_name(store, instance_id, &child_browse_name).is_some() {
            // Already wired (e.g. by an explicit sibling AddNodes call): merge.
            continue;
        }
        let Some(child_node) = store.with_node(&child_id, |n| n.clone()) else {
            continue;
        };
        match &child_node {
            Node::Method(_) => {
                store
                    .add_reference_pair(instance_id, &r.reference_type_id, &child_id)
                    .map_err(|_| StatusCode::BadUnexpectedError)?;
            }
            Node::Object(_) | Node::Variable(_) => {
                let mut cloned = child_node;
                cloned.base_mut().node_id = NodeId::null();
                cloned.base_mut().references.clear();
                let new_id = store.insert(cloned).map_err(|_| StatusCode::BadUnexpectedError)?;
                store
                    .add_reference_pair(instance_id, &r.reference_type_id, &new_id)
                    .map_err(|_| StatusCode::BadUnexpectedError)?;
                copy_mandatory_children(store, &child_id, &new_id)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_mandatory(store: &NodeStore, node_id: &NodeId) -> bool {
    let Some(refs) = store.iter_references(node_id) else {
        return false;
    };
    let has_modelling_rule = NodeId::new(0, object_id::HAS_MODELLING_RULE);
    let mandatory = NodeId::new(0, object_id::MODELLING_RULE_MANDATORY);
    refs.iter().any(|r| {
        !r.is_inverse && r.reference_type_id == has_modelling_rule && r.target_id.node_id == mandatory
    })
}

fn find_child_by_browse_name(
    store: &NodeStore,
    instance_id: &NodeId,
    name: &QualifiedName,
) -> Option<NodeId> {
    let refs = store.iter_references(instance_id)?;
    refs.iter().filter(|r| !r.is_inverse).find_map(|r| {
        if !r.target_id.is_local() {
            return None;
        }
        store
            .with_node(&r.target_id.node_id, |n| {
                (n.base().browse_name == *name).then(|| n.node_id().clone())
            })
            .flatten()
    })
}

/// Remove every reference `node_id` holds (mirroring the other endpoint too)
/// and then the node itself. Used both by `DeleteNodes` and by AddNodes
/// rolling back a failed phase 2.
fn delete_node_bidirectional(store: &NodeStore, node_id: &NodeId) {
    if let Some(refs) = store.iter_references(node_id) {
        for r in refs {
            let is_forward = !r.is_inverse;
            store.remove_reference_pair(node_id, &r.reference_type_id, is_forward, &r.target_id, true);
        }
    }
    let _ = store.remove(node_id);
}

/// The `DeleteNodes` service.
pub fn delete_nodes(store: &NodeStore, request: DeleteNodesRequest) -> DeleteNodesResponse {
    let results = request
        .nodes_to_delete
        .into_iter()
        .map(|item| delete_one_node(store, item))
        .collect();
    DeleteNodesResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn delete_one_node(store: &NodeStore, item: DeleteNodesItem) -> StatusCode {
    let Some(owned) = store.get_copy(&item.node_id) else {
        return StatusCode::BadNodeIdUnknown;
    };
    if let Node::Object(_) = &*owned {
        invoke_destructor(store, &item.node_id);
    }
    // `delete_target_references` is always honoured: every reference this
    // core creates is mirrored on both endpoints (I2), so removing the
    // node's own list already tears down everything pointing at it.
    let _ = item.delete_target_references;
    delete_node_bidirectional(store, &item.node_id);
    StatusCode::Good
}

/// Call the owning ObjectType's destructor, if any, before an Object
/// instance is torn down.
fn invoke_destructor(store: &NodeStore, object_id: &NodeId) {
    let has_type_definition = NodeId::new(0, object_id::HAS_TYPE_DEFINITION);
    let Some(refs) = store.iter_references(object_id) else {
        return;
    };
    let Some(type_ref) = refs
        .iter()
        .find(|r| !r.is_inverse && r.reference_type_id == has_type_definition)
    else {
        return;
    };
    if !type_ref.target_id.is_local() {
        return;
    }
    let destructor = store.with_node(&type_ref.target_id.node_id, |n| match n {
        Node::ObjectType(t) => t.destructor.clone(),
        _ => None,
    });
    if let Some(Some(destructor)) = destructor {
        destructor(object_id);
    }
}

/// The `AddReferences` service.
pub fn add_references(store: &NodeStore, request: AddReferencesRequest) -> AddReferencesResponse {
    let results = request
        .references_to_add
        .into_iter()
        .map(|item| add_one_reference(store, item))
        .collect();
    AddReferencesResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn add_one_reference(store: &NodeStore, item: AddReferencesItem) -> StatusCode {
    if !item.target_server_uri.is_empty() {
        return StatusCode::BadNotImplemented;
    }
    if !item.target_node_id.is_local() {
        return StatusCode::BadNotImplemented;
    }
    if !store.contains(&item.source_node_id) {
        return StatusCode::BadNodeIdUnknown;
    }
    if !store.contains(&item.target_node_id.node_id) {
        return StatusCode::BadNodeIdUnknown;
    }
    let ref_type_class = store.with_node(&item.reference_type_id, |n| n.node_class());
    if ref_type_class != Some(NodeClass::ReferenceType) {
        return StatusCode::BadReferenceTypeIdInvalid;
    }

    let has_subtype = NodeId::new(0, object_id::HAS_SUBTYPE);
    if item.reference_type_id == has_subtype {
        let actual_class = hierarchy::target_node_class(store, &item.target_node_id);
        if actual_class != Some(item.target_node_class) {
            return StatusCode::BadNodeClassInvalid;
        }
    }

    let (source, target) = if item.is_forward {
        (item.source_node_id.clone(), item.target_node_id.node_id.clone())
    } else {
        (item.target_node_id.node_id.clone(), item.source_node_id.clone())
    };
    match store.add_reference_pair(&source, &item.reference_type_id, &target) {
        Ok(()) => StatusCode::Good,
        Err(opcua_nodes::NotFound) => StatusCode::BadNodeIdUnknown,
    }
}

/// The `DeleteReferences` service.
pub fn delete_references(store: &NodeStore, request: DeleteReferencesRequest) -> DeleteReferencesResponse {
    let results = request
        .references_to_delete
        .into_iter()
        .map(|item| delete_one_reference(store, item))
        .collect();
    DeleteReferencesResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

fn delete_one_reference(store: &NodeStore, item: DeleteReferencesItem) -> StatusCode {
    if !store.contains(&item.source_node_id) {
        return StatusCode::BadNodeIdUnknown;
    }
    store.remove_reference_pair(
        &item.source_node_id,
        &item.reference_type_id,
        item.is_forward,
        &item.target_node_id,
        item.delete_bidirectional,
    );
    StatusCode::Good
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_types::service_types::{GenericAttributes, RequestHeader};
    use opcua_types::{LocalizedText, Variant};

    fn folder_type(store: &NodeStore) -> NodeId {
        store
            .insert(Node::ObjectType(Box::new(ObjectTypeNode {
                base: Base::new(NodeId::new(0, object_id::BASE_OBJECT_TYPE), "BaseObjectType", "BaseObjectType"),
                is_abstract: false,
                constructor: None,
                destructor: None,
            })))
            .unwrap();
        store
            .insert(Node::ObjectType(Box::new(ObjectTypeNode {
                base: Base::new(
                    NodeId::new(0, object_id::BASE_DATA_VARIABLE_TYPE),
                    "BaseDataVariableType",
                    "BaseDataVariableType",
                ),
                is_abstract: false,
                constructor: None,
                destructor: None,
            })))
            .unwrap();
        let organizes = NodeId::new(0, object_id::ORGANIZES);
        store
            .insert(Node::ReferenceType(Box::new(ReferenceTypeNode {
                base: Base::new(organizes.clone(), "Organizes", "Organizes"),
                is_abstract: false,
                symmetric: false,
                inverse_name: Some(LocalizedText::from("OrganizedBy")),
            })))
            .unwrap();
        let has_type_definition = NodeId::new(0, object_id::HAS_TYPE_DEFINITION);
        store
            .insert(Node::ReferenceType(Box::new(ReferenceTypeNode {
                base: Base::new(has_type_definition, "HasTypeDefinition", "HasTypeDefinition"),
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
        root
    }

    #[test]
    fn add_nodes_assigns_numeric_id_and_wires_parent() {
        let store = NodeStore::new();
        let root = folder_type(&store);
        let request = AddNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_add: vec![AddNodesItem {
                parent_node_id: ExpandedNodeId::from(root.clone()),
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                requested_new_node_id: NodeId::null(),
                browse_name: QualifiedName::from("MyObject"),
                node_attributes: NodeAttributes::Object {
                    generic: GenericAttributes {
                        display_name: LocalizedText::from("MyObject"),
                        ..Default::default()
                    },
                    event_notifier: 0,
                },
                type_definition: ExpandedNodeId::from(NodeId::null()),
            }],
        };
        let response = add_nodes(&store, request);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].status_code, StatusCode::Good);
        let new_id = response.results[0].added_node_id.clone();
        assert!(store.contains(&new_id));
        let parent_refs = store.iter_references(&root).unwrap();
        assert!(parent_refs.iter().any(|r| !r.is_inverse && r.target_id.node_id == new_id));
    }

    #[test]
    fn add_nodes_rejects_type_mismatched_initial_value_and_leaves_no_residual_node() {
        let store = NodeStore::new();
        let root = folder_type(&store);
        let refs_before = store.iter_references(&root).unwrap().len();
        let request = AddNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_add: vec![AddNodesItem {
                parent_node_id: ExpandedNodeId::from(root.clone()),
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                requested_new_node_id: NodeId::null(),
                browse_name: QualifiedName::from("BadValue"),
                node_attributes: NodeAttributes::Variable {
                    generic: GenericAttributes {
                        display_name: LocalizedText::from("BadValue"),
                        ..Default::default()
                    },
                    value: Variant::String("hi".into()),
                    data_type: NodeId::new(0, object_id::INT32),
                    value_rank: -1,
                    array_dimensions: vec![],
                    access_level: AccessLevel::CURRENT_READ,
                    user_access_level: AccessLevel::CURRENT_READ,
                    minimum_sampling_interval: 0.0,
                    historizing: false,
                },
                type_definition: ExpandedNodeId::from(NodeId::null()),
            }],
        };
        let response = add_nodes(&store, request);
        assert_eq!(response.results[0].status_code, StatusCode::BadTypeMismatch);
        assert!(response.results[0].added_node_id.is_null());
        // No residual node: the root's reference list gained no new child.
        assert_eq!(store.iter_references(&root).unwrap().len(), refs_before);
    }

    #[test]
    fn add_nodes_accepts_matching_initial_value() {
        let store = NodeStore::new();
        let root = folder_type(&store);
        let request = AddNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_add: vec![AddNodesItem {
                parent_node_id: ExpandedNodeId::from(root),
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                requested_new_node_id: NodeId::null(),
                browse_name: QualifiedName::from("GoodValue"),
                node_attributes: NodeAttributes::Variable {
                    generic: GenericAttributes {
                        display_name: LocalizedText::from("GoodValue"),
                        ..Default::default()
                    },
                    value: Variant::Int32(7),
                    data_type: NodeId::new(0, object_id::INT32),
                    value_rank: -1,
                    array_dimensions: vec![],
                    access_level: AccessLevel::CURRENT_READ,
                    user_access_level: AccessLevel::CURRENT_READ,
                    minimum_sampling_interval: 0.0,
                    historizing: false,
                },
                type_definition: ExpandedNodeId::from(NodeId::null()),
            }],
        };
        let response = add_nodes(&store, request);
        assert_eq!(response.results[0].status_code, StatusCode::Good);
        let new_id = response.results[0].added_node_id.clone();
        assert!(store.contains(&new_id));
    }

    #[test]
    fn add_nodes_rejects_unknown_parent() {
        let store = NodeStore::new();
        folder_type(&store);
        let request = AddNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_add: vec![AddNodesItem {
                parent_node_id: ExpandedNodeId::from(NodeId::new(0, 999u32)),
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                requested_new_node_id: NodeId::null(),
                browse_name: QualifiedName::from("Orphan"),
                node_attributes: NodeAttributes::Object {
                    generic: GenericAttributes::default(),
                    event_notifier: 0,
                },
                type_definition: ExpandedNodeId::from(NodeId::null()),
            }],
        };
        let response = add_nodes(&store, request);
        assert_eq!(response.results[0].status_code, StatusCode::BadParentNodeIdInvalid);
        assert!(response.results[0].added_node_id.is_null());
    }

    #[test]
    fn delete_nodes_removes_node_and_parent_reference() {
        let store = NodeStore::new();
        let root = folder_type(&store);
        let add_request = AddNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_add: vec![AddNodesItem {
                parent_node_id: ExpandedNodeId::from(root.clone()),
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                requested_new_node_id: NodeId::null(),
                browse_name: QualifiedName::from("Gone"),
                node_attributes: NodeAttributes::Object {
                    generic: GenericAttributes::default(),
                    event_notifier: 0,
                },
                type_definition: ExpandedNodeId::from(NodeId::null()),
            }],
        };
        let new_id = add_nodes(&store, add_request).results[0].added_node_id.clone();

        let delete_request = DeleteNodesRequest {
            request_header: RequestHeader::default(),
            nodes_to_delete: vec![DeleteNodesItem {
                node_id: new_id.clone(),
                delete_target_references: true,
            }],
        };
        let response = delete_nodes(&store, delete_request);
        assert_eq!(response.results[0], StatusCode::Good);
        assert!(!store.contains(&new_id));
        let parent_refs = store.iter_references(&root).unwrap();
        assert!(!parent_refs.iter().any(|r| r.target_id.node_id == new_id));
    }

    #[test]
    fn add_references_rejects_non_empty_target_server_uri() {
        let store = NodeStore::new();
        let root = folder_type(&store);
        let variable_id = NodeId::new(1, 7u32);
        store
            .insert(Node::Variable(Box::new(VariableNode {
                base: Base::new(variable_id.clone(), "V", "V"),
                data_type: NodeId::new(0, object_id::INT32),
                value_rank: -1,
                array_dimensions: None,
                access_level: AccessLevel::CURRENT_READ,
                user_access_level: AccessLevel::CURRENT_READ,
                minimum_sampling_interval: 0.0,
                historizing: false,
                value: ValueSource::new(DataValue::new_now(Variant::Int32(1))),
            })))
            .unwrap();
        let request = AddReferencesRequest {
            request_header: RequestHeader::default(),
            references_to_add: vec![AddReferencesItem {
                source_node_id: root,
                reference_type_id: NodeId::new(0, object_id::ORGANIZES),
                is_forward: true,
                target_server_uri: "opc.tcp://other-server".into(),
                target_node_id: ExpandedNodeId::from(variable_id),
                target_node_class: NodeClass::Variable,
            }],
        };
        let response = add_references(&store, request);
        assert_eq!(response.results[0], StatusCode::BadNotImplemented);
    }
}
