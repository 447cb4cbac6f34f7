// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for the Read and Write services (§4.4, §4.5).

use crate::{
    data_value::{DataValue, TimestampsToReturn},
    node_class::AttributeId,
    node_id::NodeId,
    numeric_range::NumericRange,
    status_code::StatusCode,
    string::UAString,
};

/// The `QualifiedName` of the `Default Binary` data encoding, the only
/// encoding this core accepts in a `ReadValueId`/`WriteValue`.
pub const DEFAULT_BINARY_ENCODING: &str = "Default Binary";

/// One attribute to read, as carried in a `ReadRequest`.
#[derive(Debug, Clone)]
pub struct ReadValueId {
    /// The node the attribute belongs to.
    pub node_id: NodeId,
    /// Which attribute to read.
    pub attribute_id: AttributeId,
    /// Selects a sub-range of an array-valued `Value` attribute. Must be
    /// null for every attribute other than `Value`.
    pub index_range: UAString,
    /// Requested data encoding; only `Default Binary` (or null, meaning the
    /// same) is supported.
    pub data_encoding: UAString,
}

impl ReadValueId {
    /// Construct a plain attribute read with no index range.
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: UAString::null(),
            data_encoding: UAString::null(),
        }
    }

    /// Parse `index_range`, if present.
    pub fn parsed_index_range(&self) -> Result<Option<NumericRange>, StatusCode> {
        match self.index_range.value() {
            None | Some("") => Ok(None),
            Some(s) => s.parse::<NumericRange>().map(Some),
        }
    }

    /// `true` if the requested encoding is acceptable (null or `Default Binary`).
    pub fn encoding_ok(&self) -> bool {
        matches!(self.data_encoding.value(), None | Some("") | Some(DEFAULT_BINARY_ENCODING))
    }
}

/// Parameters of a Read service call.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Request header.
    pub request_header: crate::service_types::RequestHeader,
    /// Maximum age, in milliseconds, of a cached value the server may return
    /// instead of invoking a data source; `0` means always current.
    pub max_age: f64,
    /// Which timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// The attributes to read.
    pub nodes_to_read: Vec<ReadValueId>,
}

/// Result of a Read service call.
#[derive(Debug, Clone)]
pub struct ReadResponse {
    /// Response header.
    pub response_header: crate::service_types::ResponseHeader,
    /// One result per entry in `nodes_to_read`, in the same order.
    pub results: Vec<DataValue>,
}

/// One attribute value to write, as carried in a `WriteRequest`.
#[derive(Debug, Clone)]
pub struct WriteValue {
    /// The node the attribute belongs to.
    pub node_id: NodeId,
    /// Which attribute to write.
    pub attribute_id: AttributeId,
    /// Selects a sub-range of an array-valued `Value` attribute to overlay.
    pub index_range: UAString,
    /// The value to write (only `value.value` and, for `Value` writes,
    /// `value.status`/timestamps are meaningful).
    pub value: DataValue,
}

impl WriteValue {
    /// Parse `index_range`, if present.
    pub fn parsed_index_range(&self) -> Result<Option<NumericRange>, StatusCode> {
        match self.index_range.value() {
            None | Some("") => Ok(None),
            Some(s) => s.parse::<NumericRange>().map(Some),
        }
    }
}

/// Parameters of a Write service call.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Request header.
    pub request_header: crate::service_types::RequestHeader,
    /// The attribute values to write.
    pub nodes_to_write: Vec<WriteValue>,
}

/// Result of a Write service call.
#[derive(Debug, Clone)]
pub struct WriteResponse {
    /// Response header.
    pub response_header: crate::service_types::ResponseHeader,
    /// One status per entry in `nodes_to_write`, in the same order.
    pub results: Vec<StatusCode>,
}
