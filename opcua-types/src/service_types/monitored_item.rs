// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response types and filter structures for the MonitoredItem
//! services (§4.12).

use crate::{
    data_value::TimestampsToReturn, node_class::AttributeId, node_id::NodeId,
    status_code::StatusCode, string::UAString, variant::Variant,
};

use super::headers::{RequestHeader, ResponseHeader};

/// Which mode a MonitoredItem is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringMode {
    /// Sampling is suspended; no notifications are produced.
    Disabled,
    /// Samples are taken but not queued for reporting.
    Sampling,
    /// Samples are taken and queued for reporting to the client.
    Reporting,
}

/// Which combination of status/value/timestamp changes triggers a data-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChangeTrigger {
    /// Trigger only on a status change.
    Status,
    /// Trigger on status or value change.
    StatusValue,
    /// Trigger on status, value, or source timestamp change.
    StatusValueTimestamp,
}

impl Default for DataChangeTrigger {
    fn default() -> Self {
        DataChangeTrigger::StatusValue
    }
}

/// The deadband applied on top of the trigger to suppress noisy value changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeadbandType {
    /// No deadband; every trigger-qualifying change is reported.
    None,
    /// Absolute difference in engineering units.
    Absolute(f64),
    /// Percentage of the variable's `EURange`.
    Percent(f64),
}

impl Default for DeadbandType {
    fn default() -> Self {
        DeadbandType::None
    }
}

/// Data-change filter parameters, installed on a MonitoredItem watching a
/// non-event attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DataChangeFilter {
    /// The trigger condition.
    pub trigger: DataChangeTrigger,
    /// The deadband suppressing small changes.
    pub deadband_type: DeadbandType,
}

/// A clause selecting one field of an event to report.
#[derive(Debug, Clone)]
pub struct SimpleAttributeOperand {
    /// The type of event the path is relative to.
    pub type_definition_id: NodeId,
    /// The browse-name path from the event's type to the field.
    pub browse_path: Vec<crate::qualified_name::QualifiedName>,
    /// The attribute of the final node to read (usually `Value`).
    pub attribute_id: AttributeId,
}

/// A where-clause operator and its operands, part of a `ContentFilter`.
#[derive(Debug, Clone)]
pub enum ContentFilterOperand {
    /// A literal value.
    Literal(Variant),
    /// A reference to one of the event's selected fields.
    Attribute(SimpleAttributeOperand),
}

/// One element of a `ContentFilter`'s where-clause.
#[derive(Debug, Clone)]
pub enum ContentFilterElement {
    /// Logical AND of two operands, each either a literal or a nested element index.
    And(Box<ContentFilterOperand>, Box<ContentFilterOperand>),
    /// Logical OR of two operands.
    Or(Box<ContentFilterOperand>, Box<ContentFilterOperand>),
    /// Equality comparison.
    Equals(Box<ContentFilterOperand>, Box<ContentFilterOperand>),
    /// `true` iff the operand's type is of the given type or a subtype.
    OfType(NodeId),
}

/// Event filter: which fields to extract (`select_clauses`) and which events
/// to accept (`where_clause`).
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Fields to copy from a matching event into its `EventFieldList`.
    pub select_clauses: Vec<SimpleAttributeOperand>,
    /// Elements of the where-clause; the first element is evaluated as the root.
    pub where_clause: Vec<ContentFilterElement>,
}

impl Default for SimpleAttributeOperand {
    fn default() -> Self {
        Self {
            type_definition_id: NodeId::null(),
            browse_path: Vec::new(),
            attribute_id: AttributeId::Value,
        }
    }
}

/// The filter installed on a MonitoredItem: a data-change filter for
/// ordinary attributes, or an event filter for an `EventNotifier` attribute.
#[derive(Debug, Clone)]
pub enum MonitoringFilter {
    /// Data-change filter.
    DataChange(DataChangeFilter),
    /// Event filter.
    Event(EventFilter),
}

impl Default for MonitoringFilter {
    fn default() -> Self {
        MonitoringFilter::DataChange(DataChangeFilter::default())
    }
}

/// Requested sampling/queueing parameters for one MonitoredItem.
#[derive(Debug, Clone)]
pub struct MonitoringParameters {
    /// Client-chosen correlation handle echoed back in every notification.
    pub client_handle: u32,
    /// Requested sampling interval in milliseconds; `-1` means "as fast as publishing".
    pub sampling_interval: f64,
    /// Requested filter.
    pub filter: MonitoringFilter,
    /// Requested notification queue depth.
    pub queue_size: u32,
    /// `true` to discard the oldest queued notification on overflow, `false`
    /// to discard the newest (and keep the new sample) instead.
    pub discard_oldest: bool,
}

/// One item to monitor, as carried in a `CreateMonitoredItemsRequest`.
#[derive(Debug, Clone)]
pub struct MonitoredItemCreateRequest {
    /// The attribute to monitor.
    pub item_to_monitor: super::attribute::ReadValueId,
    /// The mode to create the item in.
    pub monitoring_mode: MonitoringMode,
    /// Requested parameters.
    pub requested_parameters: MonitoringParameters,
}

/// Result of creating one MonitoredItem.
#[derive(Debug, Clone)]
pub struct MonitoredItemCreateResult {
    /// `Good` or a creation failure status.
    pub status_code: StatusCode,
    /// Server-assigned id for this item.
    pub monitored_item_id: u32,
    /// The sampling interval actually applied, after clamping.
    pub revised_sampling_interval: f64,
    /// The queue size actually applied, after clamping.
    pub revised_queue_size: u32,
}

/// Parameters of a CreateMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct CreateMonitoredItemsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// Which timestamps to return in notifications from these items.
    pub timestamps_to_return: TimestampsToReturn,
    /// The items to create.
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

/// Result of a CreateMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct CreateMonitoredItemsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `items_to_create`.
    pub results: Vec<MonitoredItemCreateResult>,
}

/// One item to modify, as carried in a `ModifyMonitoredItemsRequest`.
#[derive(Debug, Clone)]
pub struct MonitoredItemModifyRequest {
    /// The item to modify.
    pub monitored_item_id: u32,
    /// The new parameters to apply.
    pub requested_parameters: MonitoringParameters,
}

/// Parameters of a ModifyMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct ModifyMonitoredItemsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// Which timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// The items to modify.
    pub items_to_modify: Vec<MonitoredItemModifyRequest>,
}

/// Result of a ModifyMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct ModifyMonitoredItemsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per entry in `items_to_modify`.
    pub results: Vec<MonitoredItemCreateResult>,
}

/// Parameters of a SetMonitoringMode service call.
#[derive(Debug, Clone)]
pub struct SetMonitoringModeRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// The mode to transition to.
    pub monitoring_mode: MonitoringMode,
    /// The items to transition.
    pub monitored_item_ids: Vec<u32>,
}

/// Result of a SetMonitoringMode service call.
#[derive(Debug, Clone)]
pub struct SetMonitoringModeResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `monitored_item_ids`.
    pub results: Vec<StatusCode>,
}

/// Parameters of a DeleteMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct DeleteMonitoredItemsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The owning subscription.
    pub subscription_id: u32,
    /// The items to delete.
    pub monitored_item_ids: Vec<u32>,
}

/// Result of a DeleteMonitoredItems service call.
#[derive(Debug, Clone)]
pub struct DeleteMonitoredItemsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `monitored_item_ids`.
    pub results: Vec<StatusCode>,
}

/// One field extracted by an `EventFilter`'s select clauses.
#[derive(Debug, Clone, Default)]
pub struct EventFieldList {
    /// Client handle of the MonitoredItem this event was delivered to.
    pub client_handle: u32,
    /// The extracted field values, positional with `EventFilter::select_clauses`.
    pub event_fields: Vec<Variant>,
}

/// An unused placeholder acknowledging that `index_range` may restrict which
/// elements of an array-valued event field changed; this core reports whole
/// values only.
pub type EventFieldIndexRange = UAString;
