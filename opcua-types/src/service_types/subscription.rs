// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Request/response and notification types for the Subscription services
//! (§4.11).

use crate::{data_value::DataValue, status_code::StatusCode};

use super::{
    headers::{RequestHeader, ResponseHeader},
    monitored_item::EventFieldList,
};

/// Parameters of a CreateSubscription service call.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Requested publishing interval, milliseconds.
    pub requested_publishing_interval: f64,
    /// Requested lifetime count, in multiples of the publishing interval.
    pub requested_lifetime_count: u32,
    /// Requested keep-alive count, in multiples of the publishing interval.
    pub requested_max_keep_alive_count: u32,
    /// Maximum notifications to batch into one Publish response; `0` = unbounded.
    pub max_notifications_per_publish: u32,
    /// Whether publishing starts enabled.
    pub publishing_enabled: bool,
    /// Relative priority used to order Publish servicing across subscriptions
    /// sharing a session; higher values serviced first.
    pub priority: u8,
}

/// Result of a CreateSubscription service call.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Server-assigned subscription id.
    pub subscription_id: u32,
    /// The publishing interval actually applied.
    pub revised_publishing_interval: f64,
    /// The lifetime count actually applied.
    pub revised_lifetime_count: u32,
    /// The keep-alive count actually applied.
    pub revised_max_keep_alive_count: u32,
}

/// Parameters of a ModifySubscription service call.
#[derive(Debug, Clone)]
pub struct ModifySubscriptionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The subscription to modify.
    pub subscription_id: u32,
    /// Requested publishing interval, milliseconds.
    pub requested_publishing_interval: f64,
    /// Requested lifetime count.
    pub requested_lifetime_count: u32,
    /// Requested keep-alive count.
    pub requested_max_keep_alive_count: u32,
    /// Maximum notifications to batch per Publish response.
    pub max_notifications_per_publish: u32,
    /// Relative priority.
    pub priority: u8,
}

/// Result of a ModifySubscription service call.
#[derive(Debug, Clone)]
pub struct ModifySubscriptionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// The publishing interval actually applied.
    pub revised_publishing_interval: f64,
    /// The lifetime count actually applied.
    pub revised_lifetime_count: u32,
    /// The keep-alive count actually applied.
    pub revised_max_keep_alive_count: u32,
}

/// Parameters of a SetPublishingMode service call.
#[derive(Debug, Clone)]
pub struct SetPublishingModeRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// New publishing-enabled state.
    pub publishing_enabled: bool,
    /// The subscriptions to change.
    pub subscription_ids: Vec<u32>,
}

/// Result of a SetPublishingMode service call.
#[derive(Debug, Clone)]
pub struct SetPublishingModeResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `subscription_ids`.
    pub results: Vec<StatusCode>,
}

/// Parameters of a DeleteSubscriptions service call.
#[derive(Debug, Clone)]
pub struct DeleteSubscriptionsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The subscriptions to delete.
    pub subscription_ids: Vec<u32>,
}

/// Result of a DeleteSubscriptions service call.
#[derive(Debug, Clone)]
pub struct DeleteSubscriptionsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per entry in `subscription_ids`.
    pub results: Vec<StatusCode>,
}

/// Identifies one previously sent NotificationMessage as acknowledged, freeing
/// it from the retransmission queue.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionAcknowledgement {
    /// The subscription the sequence number belongs to.
    pub subscription_id: u32,
    /// The acknowledged sequence number.
    pub sequence_number: u32,
}

/// One MonitoredItem's data-change notification, as carried in a
/// `DataChangeNotification`.
#[derive(Debug, Clone)]
pub struct MonitoredItemNotification {
    /// Client handle of the MonitoredItem this sample came from.
    pub client_handle: u32,
    /// The sampled value.
    pub value: DataValue,
    /// `true` if this notification sits at the boundary of a queue overflow
    /// (a sample was dropped to make room for it), mirroring the wire
    /// `InfoBits` overflow bit (§4.12). `Variant` carries no info-bits
    /// side-channel, so it is surfaced here instead.
    pub overflow: bool,
}

/// A batch of data-change notifications for one subscription.
#[derive(Debug, Clone, Default)]
pub struct DataChangeNotification {
    /// The changed values.
    pub monitored_items: Vec<MonitoredItemNotification>,
}

/// A batch of event notifications for one subscription.
#[derive(Debug, Clone, Default)]
pub struct EventNotificationList {
    /// The events, each already reduced to its selected fields.
    pub events: Vec<EventFieldList>,
}

/// Informs the client that a subscription's status changed, most notably on
/// timeout.
#[derive(Debug, Clone)]
pub struct StatusChangeNotification {
    /// The new status, e.g. `BadTimeout`.
    pub status: StatusCode,
}

/// The polymorphic payload of one `NotificationMessage`: this core only ever
/// produces these three kinds.
#[derive(Debug, Clone)]
pub enum NotificationData {
    /// Data-change notifications.
    DataChange(DataChangeNotification),
    /// Event notifications.
    Event(EventNotificationList),
    /// A subscription status change (always `StatusChangeNotification`).
    StatusChange(StatusChangeNotification),
}

/// One message sent to satisfy a PublishRequest: a sequence number plus its
/// notification payloads (possibly empty, for a keep-alive).
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// Monotonically increasing per-subscription sequence number (0 reserved, skipped on wrap).
    pub sequence_number: u32,
    /// Server timestamp this message was created.
    pub publish_time: chrono::DateTime<chrono::Utc>,
    /// The notifications in this message; empty for a pure keep-alive.
    pub notification_data: Vec<NotificationData>,
}

impl NotificationMessage {
    /// A keep-alive message: a sequence number with no notification data.
    pub fn keep_alive(sequence_number: u32, publish_time: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            sequence_number,
            publish_time,
            notification_data: Vec::new(),
        }
    }
}

/// Parameters of a Publish service call.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Acknowledgements of previously received notifications, processed
    /// before this request is queued or answered.
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

/// Per-acknowledgement result of processing a `PublishRequest`'s
/// `subscription_acknowledgements`.
#[derive(Debug, Clone, Copy)]
pub enum AcknowledgementResult {
    /// The sequence number was found and removed from the retransmission queue.
    Ok,
    /// No such sequence number was outstanding.
    Unknown,
}

/// Result of a Publish service call.
#[derive(Debug, Clone)]
pub struct PublishResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// The subscription this response is for.
    pub subscription_id: u32,
    /// Sequence numbers still outstanding (unacknowledged) on this subscription.
    pub available_sequence_numbers: Vec<u32>,
    /// `true` if more notifications are already queued and ready to send
    /// without waiting for another PublishRequest (`GoodMoreData` semantics).
    pub more_notifications: bool,
    /// The message itself.
    pub notification_message: NotificationMessage,
    /// Per-entry result of `subscription_acknowledgements`.
    pub results: Vec<StatusCode>,
}

/// Parameters of a Republish service call.
#[derive(Debug, Clone)]
pub struct RepublishRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// The subscription to republish from.
    pub subscription_id: u32,
    /// The sequence number to retrieve from the retransmission queue.
    pub retransmit_sequence_number: u32,
}

/// Result of a Republish service call.
#[derive(Debug, Clone)]
pub struct RepublishResponse {
    /// Response header: `service_result` carries `BadMessageNotAvailable` on miss.
    pub response_header: ResponseHeader,
    /// The retransmitted message, byte-identical in content to the original send.
    pub notification_message: NotificationMessage,
}

/// A value produced for a method call that is invoked asynchronously; see
/// §4.8 and the design note on coroutine-like async methods.
#[derive(Debug, Clone)]
pub struct AsyncMethodCompletion {
    /// The request id the original Call belonged to.
    pub request_id: u32,
    /// The index of this method within its `CallRequest`.
    pub index: usize,
    /// The completed result.
    pub result: super::method::CallMethodResult,
}

impl MonitoredItemNotification {
    /// Construct a notification carrying `value` for `client_handle`, with no overflow.
    pub fn new(client_handle: u32, value: DataValue) -> Self {
        Self {
            client_handle,
            value,
            overflow: false,
        }
    }
}
