// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`Variant`], the dynamically typed value carried by `DataValue`s, method
//! arguments and most everything else that crosses the attribute services.

use std::fmt;

use crate::{
    byte_string::ByteString, expanded_node_id::ExpandedNodeId, guid::Guid,
    localized_text::LocalizedText, node_id::NodeId, qualified_name::QualifiedName,
    status_code::StatusCode, string::UAString,
};

/// The scalar type carried by a [`Variant`], independent of whether the
/// variant holds a scalar or an array of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VariantScalarTypeId {
    /// Boolean.
    Boolean = 1,
    /// Signed byte.
    SByte = 2,
    /// Unsigned byte.
    Byte = 3,
    /// Signed 16 bit integer.
    Int16 = 4,
    /// Unsigned 16 bit integer.
    UInt16 = 5,
    /// Signed 32 bit integer.
    Int32 = 6,
    /// Unsigned 32 bit integer.
    UInt32 = 7,
    /// Signed 64 bit integer.
    Int64 = 8,
    /// Unsigned 64 bit integer.
    UInt64 = 9,
    /// 32 bit floating point number.
    Float = 10,
    /// 64 bit floating point number.
    Double = 11,
    /// String.
    String = 12,
    /// DateTime.
    DateTime = 13,
    /// Guid.
    Guid = 14,
    /// ByteString.
    ByteString = 15,
    /// XmlElement.
    XmlElement = 16,
    /// NodeId.
    NodeId = 17,
    /// ExpandedNodeId.
    ExpandedNodeId = 18,
    /// StatusCode.
    StatusCode = 19,
    /// QualifiedName.
    QualifiedName = 20,
    /// LocalizedText.
    LocalizedText = 21,
    /// ExtensionObject, an opaque structured value this core does not interpret.
    ExtensionObject = 22,
    /// DataValue, nested inside another Variant.
    DataValue = 23,
    /// A nested Variant.
    Variant = 24,
    /// DiagnosticInfo.
    DiagnosticInfo = 25,
}

impl fmt::Display for VariantScalarTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl VariantScalarTypeId {
    /// The `NodeId` of the built-in data type this scalar type id corresponds to.
    pub fn data_type_id(&self) -> NodeId {
        NodeId::new(0, *self as u32)
    }

    /// `true` for the numeric scalar types, used by deadband filters which
    /// require a numeric value to compute a difference.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            VariantScalarTypeId::SByte
                | VariantScalarTypeId::Byte
                | VariantScalarTypeId::Int16
                | VariantScalarTypeId::UInt16
                | VariantScalarTypeId::Int32
                | VariantScalarTypeId::UInt32
                | VariantScalarTypeId::Int64
                | VariantScalarTypeId::UInt64
                | VariantScalarTypeId::Float
                | VariantScalarTypeId::Double
        )
    }

    /// Convert a numeric scalar to `f64`, for deadband comparisons. `None` for
    /// non-numeric types.
    pub fn as_f64(&self, variant: &Variant) -> Option<f64> {
        match variant {
            Variant::SByte(v) => Some(*v as f64),
            Variant::Byte(v) => Some(*v as f64),
            Variant::Int16(v) => Some(*v as f64),
            Variant::UInt16(v) => Some(*v as f64),
            Variant::Int32(v) => Some(*v as f64),
            Variant::UInt32(v) => Some(*v as f64),
            Variant::Int64(v) => Some(*v as f64),
            Variant::UInt64(v) => Some(*v as f64),
            Variant::Float(v) => Some(*v as f64),
            Variant::Double(v) => Some(*v),
            _ => None,
        }
    }
}

/// The type of a [`Variant`]'s payload: empty, a scalar, or an array with
/// optional `arrayDimensions`.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantTypeId {
    /// The variant carries no value.
    Empty,
    /// A single value of the given scalar type.
    Scalar(VariantScalarTypeId),
    /// A flattened array of the given scalar type, with optional dimensions
    /// (`None` means a flat 1-D array).
    Array(VariantScalarTypeId, Option<Vec<u32>>),
}

/// A dynamically typed value: empty, a scalar of one of the built-in types,
/// or an n-dimensional array of one of them (represented as a flat `Vec` plus
/// an `arrayDimensions` side-table, matching the wire representation).
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// No value.
    Empty,
    /// Boolean scalar.
    Boolean(bool),
    /// Signed byte scalar.
    SByte(i8),
    /// Unsigned byte scalar.
    Byte(u8),
    /// Signed 16 bit integer scalar.
    Int16(i16),
    /// Unsigned 16 bit integer scalar.
    UInt16(u16),
    /// Signed 32 bit integer scalar.
    Int32(i32),
    /// Unsigned 32 bit integer scalar.
    UInt32(u32),
    /// Signed 64 bit integer scalar.
    Int64(i64),
    /// Unsigned 64 bit integer scalar.
    UInt64(u64),
    /// 32 bit float scalar.
    Float(f32),
    /// 64 bit float scalar.
    Double(f64),
    /// String scalar.
    String(UAString),
    /// DateTime scalar, milliseconds-resolution Unix-epoch-relative instant.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Guid scalar.
    Guid(Box<Guid>),
    /// ByteString scalar.
    ByteString(ByteString),
    /// NodeId scalar.
    NodeId(Box<NodeId>),
    /// ExpandedNodeId scalar.
    ExpandedNodeId(Box<ExpandedNodeId>),
    /// StatusCode scalar.
    StatusCode(StatusCode),
    /// QualifiedName scalar.
    QualifiedName(Box<QualifiedName>),
    /// LocalizedText scalar.
    LocalizedText(Box<LocalizedText>),
    /// An array of scalar values of a single type, with the dimensions the
    /// array was declared with (`None` for a plain 1-D array).
    Array(Box<VariantArray>),
}

/// The payload of an array-typed [`Variant`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariantArray {
    /// The common scalar type of every element.
    pub value_type: VariantScalarTypeId,
    /// The flattened element values, each a scalar variant of `value_type`.
    pub values: Vec<Variant>,
    /// Declared dimensions, row-major, multiplying out to `values.len()`.
    /// `None` means a plain 1-D array of length `values.len()`.
    pub dimensions: Option<Vec<u32>>,
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Empty
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Boolean(v)
    }
}
impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int32(v)
    }
}
impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Variant::UInt32(v)
    }
}
impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}
impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(UAString::from(v))
    }
}
impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(UAString::from(v))
    }
}
impl From<NodeId> for Variant {
    fn from(v: NodeId) -> Self {
        Variant::NodeId(Box::new(v))
    }
}

impl Variant {
    /// `true` if this variant carries no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// The [`VariantTypeId`] describing this value's shape, or `None` if empty.
    pub fn type_id(&self) -> VariantTypeId {
        match self {
            Variant::Empty => VariantTypeId::Empty,
            Variant::Array(arr) => VariantTypeId::Array(arr.value_type, arr.dimensions.clone()),
            other => VariantTypeId::Scalar(other.scalar_type_id().expect("non-array variant")),
        }
    }

    /// The scalar type id of this value. For arrays, the element type. `None`
    /// only for `Empty`.
    pub fn scalar_type_id(&self) -> Option<VariantScalarTypeId> {
        use VariantScalarTypeId as T;
        Some(match self {
            Variant::Empty => return None,
            Variant::Boolean(_) => T::Boolean,
            Variant::SByte(_) => T::SByte,
            Variant::Byte(_) => T::Byte,
            Variant::Int16(_) => T::Int16,
            Variant::UInt16(_) => T::UInt16,
            Variant::Int32(_) => T::Int32,
            Variant::UInt32(_) => T::UInt32,
            Variant::Int64(_) => T::Int64,
            Variant::UInt64(_) => T::UInt64,
            Variant::Float(_) => T::Float,
            Variant::Double(_) => T::Double,
            Variant::String(_) => T::String,
            Variant::DateTime(_) => T::DateTime,
            Variant::Guid(_) => T::Guid,
            Variant::ByteString(_) => T::ByteString,
            Variant::NodeId(_) => T::NodeId,
            Variant::ExpandedNodeId(_) => T::ExpandedNodeId,
            Variant::StatusCode(_) => T::StatusCode,
            Variant::QualifiedName(_) => T::QualifiedName,
            Variant::LocalizedText(_) => T::LocalizedText,
            Variant::Array(arr) => arr.value_type,
        })
    }

    /// `true` if this value is an array (of any dimensionality).
    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_))
    }

    /// The `NodeId` of the data type of this value's runtime type, used by
    /// the type-checking kernel when no static `dataType` constraint is known.
    pub fn data_type(&self) -> Option<NodeId> {
        self.scalar_type_id().map(|t| t.data_type_id())
    }

    /// The `arrayDimensions` of this value, if it is an array with declared
    /// dimensions beyond a flat 1-D shape.
    pub fn array_dimensions(&self) -> Option<&[u32]> {
        match self {
            Variant::Array(arr) => arr.dimensions.as_deref(),
            _ => None,
        }
    }

    /// The value rank implied by this variant's shape: -1 for scalars, the
    /// dimension count for arrays (0 meaning "1-D, rank unspecified").
    pub fn value_rank(&self) -> i32 {
        match self {
            Variant::Empty => -1,
            Variant::Array(arr) => match &arr.dimensions {
                Some(dims) => dims.len() as i32,
                None => 1,
            },
            _ => -1,
        }
    }

    /// Construct a 1-D array variant from homogeneous scalars. Panics if the
    /// scalars are not all the same type or any is itself an array — callers
    /// build arrays only from already-validated scalar vectors.
    pub fn from_scalars(value_type: VariantScalarTypeId, values: Vec<Variant>) -> Variant {
        debug_assert!(values
            .iter()
            .all(|v| v.scalar_type_id() == Some(value_type)));
        Variant::Array(Box::new(VariantArray {
            value_type,
            values,
            dimensions: None,
        }))
    }

    /// Return a copy of this variant with `range` selecting a sub-array of
    /// the first dimension. Scalars are treated as a length-1 array so that
    /// `0` or `0:0` selects them unchanged.
    pub fn range_of(&self, range: &crate::numeric_range::NumericRange) -> Result<Variant, StatusCode> {
        match self {
            Variant::Array(arr) => {
                let slice = range.slice(&arr.values)?;
                Ok(Variant::Array(Box::new(VariantArray {
                    value_type: arr.value_type,
                    values: slice.to_vec(),
                    dimensions: None,
                })))
            }
            Variant::Empty => Err(StatusCode::BadIndexRangeNoData),
            scalar => {
                let as_vec = vec![scalar.clone()];
                let slice = range.slice(&as_vec)?;
                Ok(slice[0].clone())
            }
        }
    }

    /// Overlay `update` onto a copy of this value at `range`'s first
    /// dimension, used by partial Value writes. The replaced region must have
    /// the same length as `update`'s array (or be length 1 for a scalar write).
    pub fn set_range_copy(
        &self,
        range: &crate::numeric_range::NumericRange,
        update: &Variant,
    ) -> Result<Variant, StatusCode> {
        let Variant::Array(arr) = self else {
            return Err(StatusCode::BadIndexRangeInvalid);
        };
        let dim = range
            .dimensions()
            .first()
            .ok_or(StatusCode::BadIndexRangeInvalid)?;
        let (start, end) = match dim {
            crate::numeric_range::NumericRangeDimension::Index(i) => (*i as usize, *i as usize),
            crate::numeric_range::NumericRangeDimension::Range(min, max) => {
                (*min as usize, *max as usize)
            }
        };
        if end >= arr.values.len() {
            return Err(StatusCode::BadIndexRangeNoData);
        }
        let replacement: Vec<Variant> = match update {
            Variant::Array(u) => u.values.clone(),
            scalar => vec![scalar.clone()],
        };
        if replacement.len() != end - start + 1 {
            return Err(StatusCode::BadIndexRangeInvalid);
        }
        let mut values = arr.values.clone();
        values[start..=end].clone_from_slice(&replacement);
        Ok(Variant::Array(Box::new(VariantArray {
            value_type: arr.value_type,
            values,
            dimensions: arr.dimensions.clone(),
        })))
    }
}
