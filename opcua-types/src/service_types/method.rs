// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types for the Call service (§4.8), plus the `Argument`
//! structure describing a Method's `InputArguments`/`OutputArguments`.

use crate::{
    data_value::DataValue, localized_text::LocalizedText, node_id::NodeId,
    status_code::StatusCode, string::UAString, variant::Variant,
};

use super::headers::{RequestHeader, ResponseHeader};

/// Describes one formal argument of a Method, as carried (as an array) in
/// its `InputArguments`/`OutputArguments` property.
#[derive(Debug, Clone)]
pub struct Argument {
    /// The argument's name.
    pub name: UAString,
    /// The argument's declared data type.
    pub data_type: NodeId,
    /// The argument's declared value rank.
    pub value_rank: i32,
    /// The argument's declared array dimensions.
    pub array_dimensions: Vec<u32>,
    /// Human readable description.
    pub description: LocalizedText,
}

/// One method invocation, as carried in a `CallRequest`.
#[derive(Debug, Clone)]
pub struct CallMethodRequest {
    /// The object (or object type) the method is called on.
    pub object_id: NodeId,
    /// The method to call.
    pub method_id: NodeId,
    /// The input argument values, positionally matching `InputArguments`.
    pub input_arguments: Vec<Variant>,
}

/// Result of one method invocation.
#[derive(Debug, Clone)]
pub struct CallMethodResult {
    /// `Good`, or an overall failure status such as `BadMethodInvalid`,
    /// `BadArgumentsMissing`, `BadTooManyArguments` or `BadInvalidArgument`.
    pub status_code: StatusCode,
    /// Per-input-argument status, populated when `status_code` is
    /// `BadInvalidArgument`.
    pub input_argument_results: Vec<StatusCode>,
    /// Diagnostic info per input argument; unused by this core.
    pub input_argument_diagnostic_infos: Vec<()>,
    /// The output values, sized by `OutputArguments` (empty if absent).
    pub output_arguments: Vec<Variant>,
}

impl CallMethodResult {
    /// A result carrying only an overall failure status.
    pub fn failure(status_code: StatusCode) -> Self {
        Self {
            status_code,
            input_argument_results: Vec::new(),
            input_argument_diagnostic_infos: Vec::new(),
            output_arguments: Vec::new(),
        }
    }
}

/// Parameters of a Call service call.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The methods to invoke.
    pub methods_to_call: Vec<CallMethodRequest>,
}

/// Result of a Call service call.
#[derive(Debug, Clone)]
pub struct CallResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `methods_to_call`.
    pub results: Vec<CallMethodResult>,
}

/// A value read back from the node store for use as an attribute wrapper
/// around method I/O, used internally when fetching `InputArguments`.
pub type ArgumentListValue = DataValue;
