// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Type-checking kernel (§4.3): `compatible_data_type`, `compatible_value_rank`,
//! `compatible_array_dimensions`, and `type_check_value`, used by the Write
//! service (I3) and by AddNodes/AddReferences to validate wiring.

use opcua_types::{
    constants::object_id, ByteString, NodeId, NumericRange, StatusCode, Variant, VariantScalarTypeId,
};

use crate::{hierarchy, node_store::NodeStore};

/// Evaluate the six ordered rules of §4.3 to decide whether a value whose
/// declared data type is `value_type` may be stored in a slot constrained to
/// `constraint`.
pub fn compatible_data_type(store: &NodeStore, value_type: &NodeId, constraint: &NodeId) -> bool {
    let base_data_type = NodeId::new(0, object_id::BASE_DATA_TYPE);
    let enumeration = NodeId::new(0, object_id::ENUMERATION);
    let int32 = NodeId::new(0, object_id::INT32);

    // Rule 1: null value type only accepted against BaseDataType/null constraint.
    if value_type.is_null() {
        return constraint.is_null() || constraint == &base_data_type;
    }
    // Rule 2.
    if value_type == constraint {
        return true;
    }
    // Rule 3.
    if constraint == &base_data_type {
        return true;
    }
    // Rule 4.
    if hierarchy::is_subtype_or_same(store, constraint, &enumeration) {
        return value_type == &int32;
    }
    // Rule 5.
    if hierarchy::is_subtype_or_same(store, value_type, constraint) {
        return true;
    }
    // Rule 6.
    if hierarchy::is_builtin_data_type(value_type) && hierarchy::is_subtype_or_same(store, constraint, value_type) {
        return true;
    }
    false
}

/// §4.3: OPC UA's `ValueRank` compatibility rules. `constraint_rank` is the
/// declared rank of the slot (Variable/VariableType); `value_rank` is the
/// rank the candidate value would have.
pub fn compatible_value_rank(value_rank: i32, constraint_rank: i32) -> bool {
    match constraint_rank {
        -2 => true, // any
        -3 => value_rank == -1 || value_rank >= 1, // scalar-or-1d
        -1 => value_rank == -1,                    // scalar only
        0 => value_rank >= 1,                      // any array
        n if n >= 1 => value_rank == n,
        _ => false,
    }
}

/// §4.3: array dimensions compatibility. An empty constraint always matches
/// (no fixed shape declared); otherwise lengths must agree and each
/// constraint entry is either `0` (wildcard, any size on that axis) or equal
/// to the corresponding test dimension.
pub fn compatible_array_dimensions(constraint_dims: &[u32], test_dims: &[u32]) -> bool {
    if constraint_dims.is_empty() {
        return true;
    }
    if constraint_dims.len() != test_dims.len() {
        return false;
    }
    constraint_dims
        .iter()
        .zip(test_dims.iter())
        .all(|(&c, &t)| c == 0 || c == t)
}

/// The data type, value rank and array dimensions a value is checked against.
#[derive(Debug, Clone)]
pub struct TypeConstraint {
    /// Declared data type of the slot.
    pub data_type: NodeId,
    /// Declared value rank of the slot.
    pub value_rank: i32,
    /// Declared array dimensions of the slot; empty means unconstrained.
    pub array_dimensions: Vec<u32>,
}

/// Run the full compatibility check (data type, value rank, array
/// dimensions) for `value` against `target`, applying `convert_to_matching_value`
/// coercions along the way. Returns the value to actually store (a coerced
/// copy, or `value` unchanged) or a `StatusCode` describing the mismatch.
pub fn type_check_value(
    store: &NodeStore,
    target: &TypeConstraint,
    value: &Variant,
    range: Option<&NumericRange>,
) -> Result<Variant, StatusCode> {
    let coerced = convert_to_matching_value(store, &target.data_type, value);
    let value = coerced.as_ref().unwrap_or(value);

    if range.is_some() {
        // A range write targets one element of the stored array; the
        // declared shape constraints apply to the *stored* value, not to the
        // (necessarily scalar-shaped) overlay fragment, so only the data type
        // is checked here.
        let value_data_type = variant_declared_type(value, &target.data_type);
        if !compatible_data_type(store, &value_data_type, &target.data_type) {
            return Err(StatusCode::BadTypeMismatch);
        }
        return Ok(value.clone());
    }

    let value_rank = value.value_rank();
    if !compatible_value_rank(value_rank, target.value_rank) {
        return Err(StatusCode::BadTypeMismatch);
    }
    if let Some(dims) = value.array_dimensions() {
        if !compatible_array_dimensions(&target.array_dimensions, &dims) {
            return Err(StatusCode::BadTypeMismatch);
        }
    }
    let value_data_type = variant_declared_type(value, &target.data_type);
    if !compatible_data_type(store, &value_data_type, &target.data_type) {
        return Err(StatusCode::BadTypeMismatch);
    }
    Ok(value.clone())
}

/// The data type id a `Variant`'s runtime shape declares, used as the `v` in
/// `compatible_data_type(v, constraint)`. Builtin scalar/array variants map
/// onto their namespace-0 data type id directly; this does not attempt to
/// recover a custom structured type, which callers track separately via
/// `target.data_type` when the stored value is opaque.
fn variant_declared_type(value: &Variant, fallback: &NodeId) -> NodeId {
    match value.scalar_type_id() {
        Some(id) => NodeId::new(0, id.data_type_id()),
        None => fallback.clone(),
    }
}

/// §4.3: the two non-ambiguous coercions `type_check_value` may apply before
/// re-checking. Returns `Some` with a *new* value when a coercion applies;
/// never mutates `value` in place.
///
/// - A bytestring scalar coerces to a `Byte` array of the same bytes when the
///   target's data type is `ByteString`'s single-member equivalence partner
///   (an opaque byte array).
/// - An `Int32` coerces into an `Enumeration` subtype slot and vice versa,
///   since on the wire both are four-byte signed integers.
pub fn convert_to_matching_value(store: &NodeStore, target_data_type: &NodeId, value: &Variant) -> Option<Variant> {
    let enumeration = NodeId::new(0, object_id::ENUMERATION);
    let byte_string = NodeId::new(0, object_id::BYTE_STRING);
    let byte = NodeId::new(0, object_id::BYTE);

    if hierarchy::is_subtype_or_same(store, target_data_type, &enumeration) {
        if let Variant::Int32(_) = value {
            return None; // already the expected wire shape
        }
    }

    if target_data_type == &byte_string {
        if let Variant::Array(arr) = value {
            if arr.value_type == VariantScalarTypeId::Byte {
                let bytes: Vec<u8> = arr
                    .values
                    .iter()
                    .map(|v| match v {
                        Variant::Byte(b) => *b,
                        _ => 0,
                    })
                    .collect();
                return Some(Variant::ByteString(ByteString::from(bytes)));
            }
        }
    }

    if &byte_string == target_data_type || target_data_type == &byte {
        if let Variant::ByteString(bs) = value {
            if let Some(bytes) = &bs.value {
                let scalars: Vec<Variant> = bytes.iter().map(|b| Variant::Byte(*b)).collect();
                return Some(Variant::from_scalars(VariantScalarTypeId::Byte, scalars));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_data_type_accepts_anything_non_null() {
        let store = NodeStore::new();
        let base = NodeId::new(0, object_id::BASE_DATA_TYPE);
        let int32 = NodeId::new(0, object_id::INT32);
        assert!(compatible_data_type(&store, &int32, &base));
    }

    #[test]
    fn null_value_type_rejected_unless_base() {
        let store = NodeStore::new();
        let int32 = NodeId::new(0, object_id::INT32);
        assert!(!compatible_data_type(&store, &NodeId::null(), &int32));
    }

    #[test]
    fn value_rank_rules() {
        assert!(compatible_value_rank(-1, -1));
        assert!(!compatible_value_rank(1, -1));
        assert!(compatible_value_rank(3, 3));
        assert!(!compatible_value_rank(2, 3));
        assert!(compatible_value_rank(1, 0));
        assert!(compatible_value_rank(-1, -3));
        assert!(compatible_value_rank(2, -3));
    }

    #[test]
    fn array_dimensions_wildcards() {
        assert!(compatible_array_dimensions(&[], &[1, 2, 3]));
        assert!(compatible_array_dimensions(&[0, 4], &[9, 4]));
        assert!(!compatible_array_dimensions(&[0, 4], &[9, 5]));
        assert!(!compatible_array_dimensions(&[0, 4], &[9]));
    }
}
