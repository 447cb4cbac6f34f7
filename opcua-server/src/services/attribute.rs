// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Attribute services (§4.4, §4.5): Read and Write, plus `read_value` and
//! `write_value`, the single code paths the subscription engine's sampler
//! reuses so a MonitoredItem observes exactly what a Read would return.

use chrono::{DateTime, Utc};
use opcua_nodes::{Node, NodeStore};
use opcua_types::service_types::{ReadRequest, ReadResponse, WriteRequest, WriteResponse};
use opcua_types::{
    node_class::{AccessLevel, AttributeId, WriteMask},
    DataValue, NodeId, NumericRange, StatusCode, TimestampsToReturn, Variant,
};

use crate::services::attribute::node_attrs::class_specific_attribute;

const DEFAULT_BINARY_ENCODING: &str = "Default Binary";

/// Read one attribute of one node, applying access-level checks, DataSource
/// dispatch, NumericRange slicing and timestamp policy (§4.4). Used by both
/// the Read service and MonitoredItem sampling.
pub fn read_value(
    store: &NodeStore,
    node_id: &NodeId,
    attribute_id: AttributeId,
    index_range: &NumericRange,
    data_encoding: Option<&str>,
    timestamps_to_return: TimestampsToReturn,
    max_age: f64,
    now: DateTime<Utc>,
) -> DataValue {
    if let Some(encoding) = data_encoding {
        if !encoding.is_empty() && encoding != DEFAULT_BINARY_ENCODING {
            return DataValue::from_status(StatusCode::BadDataEncodingInvalid);
        }
    }
    if attribute_id != AttributeId::Value && !index_range.dimensions().is_empty() {
        return DataValue::from_status(StatusCode::BadIndexRangeInvalid);
    }

    let Some(owned) = store.get_copy(node_id) else {
        return DataValue::from_status(StatusCode::BadNodeIdUnknown);
    };
    let node: &Node = &owned;

    if attribute_id == AttributeId::Value {
        let mut value = match read_value_attribute(node, index_range, timestamps_to_return, max_age) {
            Ok(v) => v,
            Err(status) => return DataValue::from_status(status),
        };
        value.apply_timestamps(timestamps_to_return, now);
        return value;
    }

    let variant = node
        .get_generic_attribute(attribute_id)
        .or_else(|| class_specific_attribute(node, attribute_id));
    match variant {
        Some(v) => {
            let mut dv = DataValue::new_now(v);
            dv.apply_timestamps(timestamps_to_return, now);
            dv
        }
        None => DataValue::from_status(StatusCode::BadAttributeIdInvalid),
    }
}

fn read_value_attribute(
    node: &Node,
    index_range: &NumericRange,
    timestamps_to_return: TimestampsToReturn,
    max_age: f64,
) -> Result<DataValue, StatusCode> {
    let variable = match node {
        Node::Variable(v) => v,
        Node::VariableType(_) => return Err(StatusCode::BadAttributeIdInvalid),
        _ => return Err(StatusCode::BadAttributeIdInvalid),
    };
    if !variable.access_level.contains(AccessLevel::CURRENT_READ)
        || !variable.user_access_level.contains(AccessLevel::CURRENT_READ)
    {
        return Err(StatusCode::BadUserAccessDenied);
    }
    let mut value = match &variable.value {
        opcua_nodes::ValueSource::DataSource { read, .. } => {
            read(timestamps_to_return, index_range, max_age)
        }
        opcua_nodes::ValueSource::Value { value, .. } => value.clone(),
    };
    if !index_range.dimensions().is_empty() {
        if let Some(v) = value.value.take() {
            match v.range_of(index_range) {
                Ok(sliced) => value.value = Some(sliced),
                Err(status) => return Err(status),
            }
        } else {
            return Err(StatusCode::BadIndexRangeNoData);
        }
    }
    Ok(value)
}

/// Write one attribute of one node (§4.5). Returns the `StatusCode` to place
/// in the matching `WriteResponse` slot.
pub fn write_value(
    store: &NodeStore,
    node_id: &NodeId,
    attribute_id: AttributeId,
    index_range: &NumericRange,
    value: &DataValue,
) -> StatusCode {
    // Retried on a stale-witness `replace` rather than surfaced to the
    // client: a concurrent writer elsewhere in the store is not the
    // client's problem to handle (§5's copy-on-write concurrency story).
    loop {
        let Some(mut owned) = store.get_copy(node_id) else {
            return StatusCode::BadNodeIdUnknown;
        };

        // Value writes on an ordinary Variable are gated by AccessLevel,
        // checked inside `write_value_attribute`; only a VariableType's
        // Value needs the `VALUE_FOR_VARIABLE_TYPE` writeMask bit (§4.5).
        let is_variable_type_value =
            attribute_id == AttributeId::Value && matches!(&*owned, Node::VariableType(_));
        let required_mask = if is_variable_type_value {
            WriteMask::VALUE_FOR_VARIABLE_TYPE
        } else if attribute_id == AttributeId::Value {
            WriteMask::empty()
        } else {
            write_mask_for(attribute_id)
        };
        if !owned.base().user_write_mask.contains(required_mask) {
            return StatusCode::BadUserAccessDenied;
        }
        if is_variable_type_value {
            return StatusCode::BadAttributeIdInvalid;
        }

        let status = match attribute_id {
            AttributeId::Value => write_value_attribute(store, owned.node_mut(), index_range, value),
            AttributeId::DisplayName => {
                let Some(Variant::LocalizedText(text)) = value.value.clone() else {
                    return StatusCode::BadTypeMismatch;
                };
                owned.node_mut().base_mut().display_name = *text;
                Ok(())
            }
            AttributeId::Description => {
                let Some(Variant::LocalizedText(text)) = value.value.clone() else {
                    return StatusCode::BadTypeMismatch;
                };
                owned.node_mut().base_mut().description = Some(*text);
                Ok(())
            }
            _ => Err(StatusCode::BadNotWritable),
        };
        if let Err(status) = status {
            return status;
        }

        match store.replace(owned) {
            Ok(()) => return StatusCode::Good,
            Err(opcua_nodes::ReplaceError::Stale) => continue,
            Err(opcua_nodes::ReplaceError::NotFound) => return StatusCode::BadNodeIdUnknown,
        }
    }
}

fn write_value_attribute(
    store: &NodeStore,
    node: &mut Node,
    index_range: &NumericRange,
    value: &DataValue,
) -> Result<(), StatusCode> {
    let variable = match node {
        Node::Variable(v) => v,
        _ => return Err(StatusCode::BadAttributeIdInvalid),
    };
    if !variable.access_level.contains(AccessLevel::CURRENT_WRITE)
        || !variable.user_access_level.contains(AccessLevel::CURRENT_WRITE)
    {
        return Err(StatusCode::BadUserAccessDenied);
    }
    let new_value = value.value.clone().ok_or(StatusCode::BadTypeMismatch)?;

    // §4.3/I3: a Value write is type-checked against the Variable's declared
    // dataType/valueRank/arrayDimensions before it is committed.
    let constraint = opcua_nodes::type_check::TypeConstraint {
        data_type: variable.data_type.clone(),
        value_rank: variable.value_rank,
        array_dimensions: variable.array_dimensions.clone().unwrap_or_default(),
    };
    let range = if index_range.dimensions().is_empty() { None } else { Some(index_range) };
    let new_value = opcua_nodes::type_check::type_check_value(store, &constraint, &new_value, range)?;

    match &mut variable.value {
        opcua_nodes::ValueSource::DataSource { write, .. } => {
            let writer = write.clone().ok_or(StatusCode::BadNotWritable)?;
            writer(value)?;
        }
        opcua_nodes::ValueSource::Value { value: stored, on_write } => {
            let written = if index_range.dimensions().is_empty() {
                new_value.clone()
            } else {
                let current = stored.value.clone().ok_or(StatusCode::BadIndexRangeNoData)?;
                current.set_range_copy(index_range, &new_value)?
            };
            stored.value = Some(written.clone());
            stored.status = value.status;
            stored.source_timestamp = value.source_timestamp;
            stored.source_picoseconds = value.source_picoseconds;
            if let Some(cb) = on_write.clone() {
                cb(&written);
            }
        }
    }
    Ok(())
}

fn write_mask_for(attribute_id: AttributeId) -> WriteMask {
    match attribute_id {
        AttributeId::DisplayName => WriteMask::DISPLAY_NAME,
        AttributeId::Description => WriteMask::DESCRIPTION,
        AttributeId::Value => WriteMask::VALUE_FOR_VARIABLE_TYPE,
        _ => WriteMask::empty(),
    }
}

/// The `Read` service.
pub fn read(store: &NodeStore, request: ReadRequest, now: DateTime<Utc>) -> ReadResponse {
    use opcua_types::service_types::ResponseHeader;
    let results = request
        .nodes_to_read
        .iter()
        .map(|item| {
            let index_range = match item.parsed_index_range() {
                Ok(Some(r)) => r,
                Ok(None) => NumericRange::default(),
                Err(status) => return DataValue::from_status(status),
            };
            read_value(
                store,
                &item.node_id,
                item.attribute_id,
                &index_range,
                item.data_encoding.value(),
                request.timestamps_to_return,
                request.max_age,
                now,
            )
        })
        .collect();
    ReadResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

/// The `Write` service.
pub fn write(store: &NodeStore, request: WriteRequest) -> WriteResponse {
    use opcua_types::service_types::ResponseHeader;
    let results = request
        .nodes_to_write
        .iter()
        .map(|item| {
            let index_range = match item.parsed_index_range() {
                Ok(Some(r)) => r,
                Ok(None) => NumericRange::default(),
                Err(status) => return status,
            };
            write_value(store, &item.node_id, item.attribute_id, &index_range, &item.value)
        })
        .collect();
    WriteResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        results,
    }
}

mod node_attrs {
    use opcua_nodes::Node;
    use opcua_types::{node_class::AttributeId, Variant};

    /// Attributes whose meaning depends on node class, tried after
    /// [`Node::get_generic_attribute`] comes back empty.
    pub fn class_specific_attribute(node: &Node, attribute_id: AttributeId) -> Option<Variant> {
        match (node, attribute_id) {
            (Node::Variable(v), AttributeId::DataType) => Some(Variant::NodeId(Box::new(v.data_type.clone()))),
            (Node::Variable(v), AttributeId::ValueRank) => Some(Variant::Int32(v.value_rank)),
            (Node::Variable(v), AttributeId::ArrayDimensions) => {
                let dims = v.array_dimensions.clone().unwrap_or_default();
                Some(Variant::from_scalars(
                    opcua_types::VariantScalarTypeId::UInt32,
                    dims.into_iter().map(Variant::UInt32).collect(),
                ))
            }
            (Node::Variable(v), AttributeId::AccessLevel) => Some(Variant::Byte(v.access_level.bits())),
            (Node::Variable(v), AttributeId::UserAccessLevel) => Some(Variant::Byte(v.user_access_level.bits())),
            (Node::Variable(v), AttributeId::MinimumSamplingInterval) => {
                Some(Variant::Double(v.minimum_sampling_interval))
            }
            (Node::Variable(v), AttributeId::Historizing) => Some(Variant::Boolean(v.historizing)),
            (Node::VariableType(v), AttributeId::DataType) => Some(Variant::NodeId(Box::new(v.data_type.clone()))),
            (Node::VariableType(v), AttributeId::ValueRank) => Some(Variant::Int32(v.value_rank)),
            (Node::VariableType(v), AttributeId::IsAbstract) => Some(Variant::Boolean(v.is_abstract)),
            (Node::ObjectType(t), AttributeId::IsAbstract) => Some(Variant::Boolean(t.is_abstract)),
            (Node::DataType(t), AttributeId::IsAbstract) => Some(Variant::Boolean(t.is_abstract)),
            (Node::ReferenceType(t), AttributeId::IsAbstract) => Some(Variant::Boolean(t.is_abstract)),
            (Node::ReferenceType(t), AttributeId::Symmetric) => Some(Variant::Boolean(t.symmetric)),
            (Node::ReferenceType(t), AttributeId::InverseName) => {
                t.inverse_name.clone().map(|n| Variant::LocalizedText(Box::new(n)))
            }
            (Node::Object(o), AttributeId::EventNotifier) => Some(Variant::Byte(o.event_notifier)),
            (Node::View(v), AttributeId::EventNotifier) => Some(Variant::Byte(v.event_notifier)),
            (Node::View(v), AttributeId::ContainsNoLoops) => Some(Variant::Boolean(v.contains_no_loops)),
            (Node::Method(m), AttributeId::Executable) => Some(Variant::Boolean(m.executable)),
            (Node::Method(m), AttributeId::UserExecutable) => Some(Variant::Boolean(m.user_executable)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_nodes::{Base, VariableNode};
    use opcua_types::node_class::AccessLevel;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn store_with_variable(value: Variant) -> (NodeStore, NodeId) {
        let store = NodeStore::new();
        let node_id = NodeId::new(1, 42u32);
        let node = opcua_nodes::Node::Variable(Box::new(VariableNode {
            base: Base::new(node_id.clone(), "test", "test"),
            data_type: NodeId::new(0, opcua_types::constants::object_id::INT32),
            value_rank: -1,
            array_dimensions: None,
            access_level: AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE,
            user_access_level: AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE,
            minimum_sampling_interval: 0.0,
            historizing: false,
            value: opcua_nodes::ValueSource::new(DataValue::new_now(value)),
        }));
        store.insert(node).unwrap();
        (store, node_id)
    }

    #[test]
    fn read_value_attribute_applies_timestamp_policy() {
        let (store, node_id) = store_with_variable(Variant::Int32(7));
        let dv = read_value(
            &store,
            &node_id,
            AttributeId::Value,
            &NumericRange::default(),
            None,
            TimestampsToReturn::Both,
            0.0,
            now(),
        );
        assert_eq!(dv.value, Some(Variant::Int32(7)));
        assert_eq!(dv.server_timestamp, Some(now()));
    }

    #[test]
    fn read_denied_without_access_level() {
        let store = NodeStore::new();
        let node_id = NodeId::new(1, 99u32);
        let node = opcua_nodes::Node::Variable(Box::new(VariableNode {
            base: Base::new(node_id.clone(), "locked", "locked"),
            data_type: NodeId::new(0, opcua_types::constants::object_id::INT32),
            value_rank: -1,
            array_dimensions: None,
            access_level: AccessLevel::empty(),
            user_access_level: AccessLevel::empty(),
            minimum_sampling_interval: 0.0,
            historizing: false,
            value: opcua_nodes::ValueSource::new(DataValue::new_now(Variant::Int32(1))),
        }));
        store.insert(node).unwrap();
        let dv = read_value(
            &store,
            &node_id,
            AttributeId::Value,
            &NumericRange::default(),
            None,
            TimestampsToReturn::Both,
            0.0,
            now(),
        );
        assert_eq!(dv.status(), StatusCode::BadUserAccessDenied);
    }

    #[test]
    fn write_value_then_read_back() {
        let (store, node_id) = store_with_variable(Variant::Int32(1));
        let status = write_value(
            &store,
            &node_id,
            AttributeId::Value,
            &NumericRange::default(),
            &DataValue::new_now(Variant::Int32(2)),
        );
        assert_eq!(status, StatusCode::Good);
        let dv = read_value(
            &store,
            &node_id,
            AttributeId::Value,
            &NumericRange::default(),
            None,
            TimestampsToReturn::Neither,
            0.0,
            now(),
        );
        assert_eq!(dv.value, Some(Variant::Int32(2)));
    }
}
