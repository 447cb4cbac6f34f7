// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Foundational data types shared by every other crate in the workspace:
//! identifiers ([`NodeId`], [`ExpandedNodeId`]), the [`Variant`]/[`DataValue`]
//! value model, and the [`StatusCode`] result type. Nothing in this crate
//! knows how to put bytes on a wire; that is the job of an external codec
//! layered on top of these types.

pub mod byte_string;
pub mod constants;
pub mod data_value;
pub mod errors;
pub mod expanded_node_id;
pub mod guid;
pub mod localized_text;
pub mod node_class;
pub mod node_id;
pub mod numeric_range;
pub mod qualified_name;
pub mod service_types;
pub mod status_code;
pub mod string;
pub mod variant;

pub use byte_string::ByteString;
pub use data_value::{DataValue, TimestampsToReturn};
pub use errors::{EncodingResult, Error};
pub use expanded_node_id::ExpandedNodeId;
pub use guid::Guid;
pub use localized_text::LocalizedText;
pub use node_class::{AttributeId, NodeClass};
pub use node_id::{Identifier, NodeId};
pub use numeric_range::NumericRange;
pub use qualified_name::QualifiedName;
pub use status_code::StatusCode;
pub use string::UAString;
pub use variant::{Variant, VariantScalarTypeId};
