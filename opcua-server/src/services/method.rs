// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The `Call` service (§4.8).
//!
//! `InputArguments`/`OutputArguments` are kept inline on [`MethodNode`]
//! rather than as separate `HasProperty` child nodes carrying a structured
//! `Argument[]` value, since [`Variant`] has no carrier for one (§9, open
//! question). Everything else — the object/method wiring check, the
//! functional-group indirection, per-argument typecheck with coercion — still
//! follows §4.8 exactly.

use opcua_nodes::{hierarchy, type_check, Node, NodeStore};
use opcua_types::{
    constants::object_id,
    service_types::{Argument, CallMethodRequest, CallMethodResult, CallRequest, CallResponse, ResponseHeader},
    NodeClass, NodeId, StatusCode, Variant,
};

/// The `Call` service. Methods flagged `is_async` run on the blocking pool so
/// a slow native implementation cannot stall the dispatch loop; the result is
/// still folded into the same `CallResponse` once it completes (§4.8, §9: the
/// manual-coroutine completion queue of the original becomes a plain awaited
/// task here).
pub async fn call(store: &NodeStore, request: CallRequest) -> CallResponse {
    let mut results = Vec::with_capacity(request.methods_to_call.len());
    for item in request.methods_to_call {
        results.push(call_one(store, item).await);
    }
    CallResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

async fn call_one(store: &NodeStore, item: CallMethodRequest) -> CallMethodResult {
    let method = match store.with_node(&item.method_id, |n| match n {
        Node::Method(m) => Some((*m).clone()),
        _ => None,
    }) {
        Some(Some(m)) => m,
        _ => return CallMethodResult::failure(StatusCode::BadMethodInvalid),
    };
    if !method.executable || !method.user_executable {
        return CallMethodResult::failure(StatusCode::BadNotExecutable);
    }

    let object_class = store.with_node(&item.object_id, |n| n.node_class());
    match object_class {
        Some(NodeClass::Object) | Some(NodeClass::ObjectType) => {}
        _ => return CallMethodResult::failure(StatusCode::BadNodeIdUnknown),
    }

    if !object_owns_method(store, &item.object_id, &item.method_id) {
        return CallMethodResult::failure(StatusCode::BadMethodInvalid);
    }

    let (status, input_argument_results) = check_input_arguments(store, &method.input_arguments, &item.input_arguments);
    if status != StatusCode::Good {
        return CallMethodResult {
            status_code: status,
            input_argument_results,
            input_argument_diagnostic_infos: Vec::new(),
            output_arguments: Vec::new(),
        };
    }

    let Some(callback) = method.callback.clone() else {
        return CallMethodResult::failure(StatusCode::BadNotExecutable);
    };
    let object_id = item.object_id.clone();
    let coerced_inputs = item.input_arguments.clone();

    let outcome = if method.is_async {
        let result = tokio::task::spawn_blocking(move || callback(&object_id, &coerced_inputs)).await;
        match result {
            Ok(r) => r,
            Err(_) => Err(StatusCode::BadUnexpectedError),
        }
    } else {
        callback(&object_id, &coerced_inputs)
    };

    match outcome {
        Ok(outputs) => CallMethodResult {
            status_code: StatusCode::Good,
            input_argument_results: Vec::new(),
            input_argument_diagnostic_infos: Vec::new(),
            output_arguments: outputs,
        },
        Err(status) => CallMethodResult::failure(status),
    }
}

/// §4.8: the object must reach the method via a `HasComponent`-subtype
/// forward reference, or (the "functional group" indirection) via some
/// parent of the object whose type is `FunctionalGroupType` and which
/// `Organizes`-subtype-reaches the method.
fn object_owns_method(store: &NodeStore, object_id: &NodeId, method_id: &NodeId) -> bool {
    let has_component = NodeId::new(0, object_id::HAS_COMPONENT);
    if has_forward_reference_to(store, object_id, &has_component, method_id) {
        return true;
    }

    let organizes = NodeId::new(0, object_id::ORGANIZES);
    let has_type_definition = NodeId::new(0, object_id::HAS_TYPE_DEFINITION);
    let functional_group_type = NodeId::new(0, object_id::DI_FUNCTIONAL_GROUP_TYPE);

    let Some(refs) = store.iter_references(object_id) else {
        return false;
    };
    for r in refs.iter().filter(|r| r.is_inverse) {
        // Inverse edges are the parents that reference this object forward.
        if !r.target_id.is_local() {
            continue;
        }
        let parent_id = &r.target_id.node_id;
        let is_functional_group = store
            .iter_references(parent_id)
            .unwrap_or_default()
            .iter()
            .any(|pr| {
                !pr.is_inverse
                    && pr.reference_type_id == has_type_definition
                    && pr.target_id.is_local()
                    && hierarchy::is_subtype_or_same(store, &pr.target_id.node_id, &functional_group_type)
            });
        if is_functional_group && has_forward_reference_to(store, parent_id, &organizes, method_id) {
            return true;
        }
    }
    false
}

fn has_forward_reference_to(
    store: &NodeStore,
    source: &NodeId,
    reference_type_id: &NodeId,
    target: &NodeId,
) -> bool {
    let Some(refs) = store.iter_references(source) else {
        return false;
    };
    refs.iter().any(|r| {
        !r.is_inverse
            && hierarchy::is_subtype_or_same(store, &r.reference_type_id, reference_type_id)
            && r.target_id.is_local()
            && &r.target_id.node_id == target
    })
}

/// §4.8: validate argument count (scalar counts as length 1) then typecheck
/// each argument against its formal declaration, attempting coercion.
/// Returns the overall status plus a per-argument status vector, populated
/// only when the overall status is `BadInvalidArgument`.
fn check_input_arguments(
    store: &NodeStore,
    formal: &[Argument],
    actual: &[Variant],
) -> (StatusCode, Vec<StatusCode>) {
    if actual.len() < formal.len() {
        return (StatusCode::BadArgumentsMissing, Vec::new());
    }
    if actual.len() > formal.len() {
        return (StatusCode::BadTooManyArguments, Vec::new());
    }

    let mut per_argument = Vec::with_capacity(formal.len());
    let mut any_bad = false;
    for (arg, value) in formal.iter().zip(actual.iter()) {
        let constraint = type_check::TypeConstraint {
            data_type: arg.data_type.clone(),
            value_rank: arg.value_rank,
            array_dimensions: arg.array_dimensions.clone(),
        };
        // A scalar value satisfies a declared array arg of length 1 (§4.8:
        // "scalar treated as length 1").
        let normalized;
        let effective_value = if constraint.value_rank >= 1 && value.value_rank() == -1 {
            normalized = Variant::from_scalars(
                value.scalar_type_id().unwrap_or(opcua_types::VariantScalarTypeId::Boolean),
                vec![value.clone()],
            );
            &normalized
        } else {
            value
        };
        match type_check::type_check_value(store, &constraint, effective_value, None) {
            Ok(_) => per_argument.push(StatusCode::Good),
            Err(status) => {
                per_argument.push(status);
                any_bad = true;
            }
        }
    }

    if any_bad {
        (StatusCode::BadInvalidArgument, per_argument)
    } else {
        (StatusCode::Good, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_nodes::{Base, MethodNode, ObjectNode, ReferenceTypeNode};
    use opcua_types::service_types::RequestHeader;
    use opcua_types::{LocalizedText, UAString};
    use std::sync::Arc;

    fn store_with_method() -> (NodeStore, NodeId, NodeId) {
        let store = NodeStore::new();
        let has_component = NodeId::new(0, object_id::HAS_COMPONENT);
        store
            .insert(Node::ReferenceType(Box::new(ReferenceTypeNode {
                base: Base::new(has_component.clone(), "HasComponent", "HasComponent"),
                is_abstract: false,
                symmetric: false,
                inverse_name: Some(LocalizedText::from("ComponentOf")),
            })))
            .unwrap();

        let object_id = NodeId::new(1, 1u32);
        store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(object_id.clone(), "Device", "Device"),
                event_notifier: 0,
            })))
            .unwrap();

        let method_id = NodeId::new(1, 2u32);
        let callback: opcua_nodes::MethodCallback = Arc::new(|_object, inputs| {
            let Some(Variant::Int32(x)) = inputs.first() else {
                return Err(StatusCode::BadInvalidArgument);
            };
            Ok(vec![Variant::Int32(x * 2)])
        });
        store
            .insert(Node::Method(Box::new(MethodNode {
                base: Base::new(method_id.clone(), "Double", "Double"),
                executable: true,
                user_executable: true,
                callback: Some(callback),
                is_async: false,
                input_arguments: vec![Argument {
                    name: UAString::from("x"),
                    data_type: NodeId::new(0, object_id::INT32),
                    value_rank: -1,
                    array_dimensions: Vec::new(),
                    description: LocalizedText::default(),
                }],
                output_arguments: vec![Argument {
                    name: UAString::from("result"),
                    data_type: NodeId::new(0, object_id::INT32),
                    value_rank: -1,
                    array_dimensions: Vec::new(),
                    description: LocalizedText::default(),
                }],
            })))
            .unwrap();
        store.add_reference_pair(&object_id, &has_component, &method_id).unwrap();
        (store, object_id, method_id)
    }

    #[tokio::test]
    async fn call_invokes_callback_and_returns_output() {
        let (store, object_id, method_id) = store_with_method();
        let request = CallRequest {
            request_header: RequestHeader::default(),
            methods_to_call: vec![CallMethodRequest {
                object_id,
                method_id,
                input_arguments: vec![Variant::Int32(21)],
            }],
        };
        let response = call(&store, request).await;
        assert_eq!(response.results[0].status_code, StatusCode::Good);
        assert_eq!(response.results[0].output_arguments, vec![Variant::Int32(42)]);
    }

    #[tokio::test]
    async fn call_rejects_unowned_method() {
        let (store, _object_id, method_id) = store_with_method();
        let stray_object = NodeId::new(1, 99u32);
        store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(stray_object.clone(), "Other", "Other"),
                event_notifier: 0,
            })))
            .unwrap();
        let request = CallRequest {
            request_header: RequestHeader::default(),
            methods_to_call: vec![CallMethodRequest {
                object_id: stray_object,
                method_id,
                input_arguments: vec![Variant::Int32(1)],
            }],
        };
        let response = call(&store, request).await;
        assert_eq!(response.results[0].status_code, StatusCode::BadMethodInvalid);
    }

    #[tokio::test]
    async fn call_reports_too_few_arguments() {
        let (store, object_id, method_id) = store_with_method();
        let request = CallRequest {
            request_header: RequestHeader::default(),
            methods_to_call: vec![CallMethodRequest {
                object_id,
                method_id,
                input_arguments: Vec::new(),
            }],
        };
        let response = call(&store, request).await;
        assert_eq!(response.results[0].status_code, StatusCode::BadArgumentsMissing);
    }
}
