// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The Subscription engine (§4.11): the Normal/KeepAlive/Late state machine,
//! the retransmission queue, and the CreateSubscription/.../Publish/
//! Republish service handlers. MonitoredItem creation and sampling live in
//! [`monitored_item`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use hashbrown::{HashMap, HashSet};
use opcua_nodes::NodeStore;
use opcua_types::{
    service_types::{
        CreateMonitoredItemsRequest, CreateMonitoredItemsResponse, CreateSubscriptionRequest,
        CreateSubscriptionResponse, DataChangeNotification, DeleteMonitoredItemsRequest,
        DeleteMonitoredItemsResponse, DeleteSubscriptionsRequest, DeleteSubscriptionsResponse,
        ModifyMonitoredItemsRequest, ModifyMonitoredItemsResponse, ModifySubscriptionRequest,
        ModifySubscriptionResponse, MonitoredItemCreateResult, MonitoringMode, NotificationData,
        NotificationMessage, PublishRequest, PublishResponse, RepublishRequest, RepublishResponse,
        ResponseHeader, SetMonitoringModeRequest, SetMonitoringModeResponse, SetPublishingModeRequest,
        SetPublishingModeResponse, StatusChangeNotification,
    },
    Guid, NodeId, StatusCode,
};
use parking_lot::Mutex;

use crate::config::Limits;
use crate::session::{PendingPublish, Session, SessionManager};

pub mod event;
pub mod monitored_item;

use event::Event;
use monitored_item::MonitoredItem;

/// Which regime a subscription's publish timing is currently in (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionState {
    /// Notifications are paired with PublishRequests as soon as both exist.
    Normal,
    /// The last publishing cycle sent an empty keep-alive.
    KeepAlive,
    /// A publishing cycle had something to say but no PublishRequest was waiting.
    Late,
}

/// One active subscription.
pub struct Subscription {
    /// Server-assigned id.
    pub id: u32,
    session_guid: Guid,
    /// Revised publishing interval, ms.
    pub publishing_interval: f64,
    /// Revised lifetime count.
    pub lifetime_count: u32,
    /// Revised keep-alive count.
    pub max_keep_alive_count: u32,
    /// Cap on notifications batched into one Publish response (`0` = unbounded).
    pub max_notifications_per_publish: u32,
    /// Whether this subscription currently publishes.
    pub publishing_enabled: bool,
    /// Relative servicing priority.
    pub priority: u8,
    current_keep_alive_count: u32,
    current_lifetime_count: u32,
    next_sequence_number: u32,
    monitored_items: HashMap<u32, MonitoredItem>,
    next_item_id: u32,
    retransmission_queue: VecDeque<NotificationMessage>,
    state: SubscriptionState,
}

impl Subscription {
    fn new(id: u32, session_guid: Guid, request: &CreateSubscriptionRequest, limits: &Limits) -> Self {
        let publishing_interval = limits.clamp_interval(request.requested_publishing_interval);
        Self {
            id,
            session_guid,
            publishing_interval,
            lifetime_count: revise_lifetime_count(request.requested_lifetime_count, request.requested_max_keep_alive_count),
            max_keep_alive_count: request.requested_max_keep_alive_count.max(1),
            max_notifications_per_publish: request.max_notifications_per_publish,
            publishing_enabled: request.publishing_enabled,
            priority: request.priority,
            current_keep_alive_count: 0,
            current_lifetime_count: 0,
            next_sequence_number: 1,
            monitored_items: HashMap::new(),
            next_item_id: 1,
            retransmission_queue: VecDeque::new(),
            state: SubscriptionState::Normal,
        }
    }

    fn next_sequence_number(&mut self) -> u32 {
        let n = self.next_sequence_number;
        // §4.11: sequence number 0 is reserved, skipped on wraparound.
        self.next_sequence_number = if n == u32::MAX { 1 } else { n + 1 };
        n
    }

    /// Sample every non-event MonitoredItem once. Called every
    /// `publishing_interval` by the server's publishing loop, which supplies
    /// the current time.
    pub fn sample_at(&mut self, store: &NodeStore, now: DateTime<Utc>) {
        for item in self.monitored_items.values_mut() {
            item.sample(store, now);
        }
    }

    fn has_ready_notifications(&self) -> bool {
        self.monitored_items.values().any(|i| i.has_pending())
    }

    /// Offers `event` to every event MonitoredItem of this subscription whose
    /// `node_id` is in `ancestors` (the set [`event::notifier_ancestors`]
    /// ascended from the event's source node). A match runs the item's
    /// where-clause and, if it passes, enqueues the select-clause fields.
    fn deliver_event(&mut self, store: &NodeStore, ancestors: &HashSet<NodeId>, event: &Event) {
        for item in self.monitored_items.values_mut() {
            if item.monitoring_mode == MonitoringMode::Disabled {
                continue;
            }
            if !ancestors.contains(&item.node_id) {
                continue;
            }
            let Some(filter) = item.event_filter() else {
                continue;
            };
            if let Some(fields) = event::apply_filter(store, filter, event) {
                item.enqueue_event(fields);
            }
        }
    }

    fn build_data_message(&mut self, now: DateTime<Utc>) -> NotificationMessage {
        let mut data_change = DataChangeNotification::default();
        let mut events = Vec::new();
        for item in self.monitored_items.values_mut() {
            data_change.monitored_items.extend(item.take_notifications());
            events.extend(item.take_events());
        }
        let mut notification_data = Vec::new();
        if !data_change.monitored_items.is_empty() {
            notification_data.push(NotificationData::DataChange(data_change));
        }
        if !events.is_empty() {
            notification_data.push(NotificationData::Event(opcua_types::service_types::EventNotificationList { events }));
        }
        NotificationMessage {
            sequence_number: self.next_sequence_number(),
            publish_time: now,
            notification_data,
        }
    }

    /// One publishing cycle with nothing to report: advance the keep-alive
    /// counter. [`SubscriptionManager::publish`] is what actually notices the
    /// counter reaching `max_keep_alive_count` and answers with a keep-alive
    /// message, since only it has a PublishRequest to answer with.
    fn advance_keep_alive(&mut self) {
        self.current_keep_alive_count += 1;
    }

    fn enqueue_retransmission(&mut self, message: NotificationMessage) {
        // A generous but finite bound: §4.11 doesn't size this explicitly: a
        // client is expected to acknowledge roughly as fast as it publishes.
        const MAX_RETRANSMISSION_QUEUE: usize = 100;
        if self.retransmission_queue.len() >= MAX_RETRANSMISSION_QUEUE {
            self.retransmission_queue.pop_front();
        }
        self.retransmission_queue.push_back(message);
    }

    fn acknowledge(&mut self, sequence_number: u32) -> StatusCode {
        let before = self.retransmission_queue.len();
        self.retransmission_queue.retain(|m| m.sequence_number != sequence_number);
        if self.retransmission_queue.len() < before {
            StatusCode::Good
        } else {
            StatusCode::BadSequenceNumberUnknown
        }
    }

    fn available_sequence_numbers(&self) -> Vec<u32> {
        self.retransmission_queue.iter().map(|m| m.sequence_number).collect()
    }

    fn republish(&self, sequence_number: u32) -> Option<NotificationMessage> {
        self.retransmission_queue
            .iter()
            .find(|m| m.sequence_number == sequence_number)
            .cloned()
    }

    /// `true` once `current_lifetime_count` has exceeded `lifetime_count`
    /// consecutive publishing cycles without a PublishRequest to answer
    /// (§4.11: the subscription then closes itself with `BadTimeout`).
    fn is_expired(&self) -> bool {
        self.current_lifetime_count >= self.lifetime_count
    }
}

fn revise_lifetime_count(requested: u32, keep_alive: u32) -> u32 {
    // §C.1 (mirrors the standard's own rule): the lifetime count must be at
    // least 3x the keep-alive count so a subscription survives at least a
    // couple of missed keep-alives before expiring.
    requested.max(keep_alive.max(1) * 3)
}

/// Owns every live subscription across all sessions.
#[derive(Default)]
pub struct SubscriptionManager {
    subscriptions: Mutex<HashMap<u32, Subscription>>,
    next_id: std::sync::atomic::AtomicU32,
}

impl SubscriptionManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_id: std::sync::atomic::AtomicU32::new(1),
        }
    }

    fn alloc_id(&self) -> u32 {
        self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    /// Raises `event` (spec.md: the event emitter traverses
    /// `HasNotifier`/`HasEventSource` up-references from the source node to
    /// reach MonitoredItems on EventNotifier attributes). Ascends once, then
    /// offers the event to every subscription, server-wide, since a
    /// candidate MonitoredItem may belong to any session's subscription.
    pub fn raise_event(&self, store: &NodeStore, event: &Event) {
        let ancestors: HashSet<NodeId> = event::notifier_ancestors(store, &event.source_node).into_iter().collect();
        for subscription in self.subscriptions.lock().values_mut() {
            subscription.deliver_event(store, &ancestors, event);
        }
    }

    /// `CreateSubscription` (§4.11).
    pub fn create_subscription(
        &self,
        session: &Session,
        limits: &Limits,
        request: CreateSubscriptionRequest,
    ) -> CreateSubscriptionResponse {
        let id = self.alloc_id();
        let subscription = Subscription::new(id, session_guid(session), &request, limits);
        let response = CreateSubscriptionResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            subscription_id: id,
            revised_publishing_interval: subscription.publishing_interval,
            revised_lifetime_count: subscription.lifetime_count,
            revised_max_keep_alive_count: subscription.max_keep_alive_count,
        };
        self.subscriptions.lock().insert(id, subscription);
        session.add_subscription(id);
        response
    }

    /// `ModifySubscription` (§4.11).
    pub fn modify_subscription(
        &self,
        session: &Session,
        limits: &Limits,
        request: ModifySubscriptionRequest,
    ) -> ModifySubscriptionResponse {
        let mut subscriptions = self.subscriptions.lock();
        let status = match subscriptions.get_mut(&request.subscription_id) {
            Some(sub) if sub.session_guid == session_guid(session) => {
                sub.publishing_interval = limits.clamp_interval(request.requested_publishing_interval);
                sub.lifetime_count = revise_lifetime_count(request.requested_lifetime_count, request.requested_max_keep_alive_count);
                sub.max_keep_alive_count = request.requested_max_keep_alive_count.max(1);
                sub.max_notifications_per_publish = request.max_notifications_per_publish;
                sub.priority = request.priority;
                sub.current_keep_alive_count = 0;
                sub.current_lifetime_count = 0;
                Ok((sub.publishing_interval, sub.lifetime_count, sub.max_keep_alive_count))
            }
            Some(_) => Err(StatusCode::BadUserAccessDenied),
            None => Err(StatusCode::BadSubscriptionIdInvalid),
        };
        match status {
            Ok((interval, lifetime, keep_alive)) => ModifySubscriptionResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
                revised_publishing_interval: interval,
                revised_lifetime_count: lifetime,
                revised_max_keep_alive_count: keep_alive,
            },
            Err(status) => ModifySubscriptionResponse {
                response_header: ResponseHeader::new(&request.request_header, status),
                revised_publishing_interval: 0.0,
                revised_lifetime_count: 0,
                revised_max_keep_alive_count: 0,
            },
        }
    }

    /// `SetPublishingMode` (§4.11, §C.5: re-enabling resets the keep-alive
    /// counter so the client sees a prompt keep-alive rather than waiting out
    /// whatever count had already accumulated while disabled).
    pub fn set_publishing_mode(&self, session: &Session, request: SetPublishingModeRequest) -> SetPublishingModeResponse {
        let mut subscriptions = self.subscriptions.lock();
        let results = request
            .subscription_ids
            .iter()
            .map(|id| match subscriptions.get_mut(id) {
                Some(sub) if sub.session_guid == session_guid(session) => {
                    sub.publishing_enabled = request.publishing_enabled;
                    if request.publishing_enabled {
                        sub.current_keep_alive_count = 0;
                    }
                    StatusCode::Good
                }
                Some(_) => StatusCode::BadUserAccessDenied,
                None => StatusCode::BadSubscriptionIdInvalid,
            })
            .collect();
        SetPublishingModeResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// `DeleteSubscriptions` (§4.11).
    pub fn delete_subscriptions(&self, session: &Session, request: DeleteSubscriptionsRequest) -> DeleteSubscriptionsResponse {
        let mut subscriptions = self.subscriptions.lock();
        let results = request
            .subscription_ids
            .iter()
            .map(|id| match subscriptions.get(id) {
                Some(sub) if sub.session_guid == session_guid(session) => {
                    let item_count = sub.monitored_items.len() as i64;
                    subscriptions.remove(id);
                    session.remove_subscription(*id);
                    session.diagnostics.adjust_monitored_items(-item_count);
                    StatusCode::Good
                }
                Some(_) => StatusCode::BadUserAccessDenied,
                None => StatusCode::BadSubscriptionIdInvalid,
            })
            .collect();
        DeleteSubscriptionsResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// `CreateMonitoredItems` (§4.12).
    pub fn create_monitored_items(
        &self,
        store: &NodeStore,
        session: &Session,
        limits: &Limits,
        request: CreateMonitoredItemsRequest,
        now: DateTime<Utc>,
    ) -> CreateMonitoredItemsResponse {
        let mut subscriptions = self.subscriptions.lock();
        let Some(sub) = subscriptions
            .get_mut(&request.subscription_id)
            .filter(|s| s.session_guid == session_guid(session))
        else {
            return CreateMonitoredItemsResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::BadSubscriptionIdInvalid),
                results: Vec::new(),
            };
        };
        let mut created = 0i64;
        let results = request
            .items_to_create
            .iter()
            .map(|item| {
                let id = sub.next_item_id;
                match MonitoredItem::create(store, limits, id, item, request.timestamps_to_return, now) {
                    Ok(monitored) => {
                        let revised_sampling_interval = monitored.sampling_interval;
                        let revised_queue_size = monitored.queue_size;
                        sub.next_item_id += 1;
                        sub.monitored_items.insert(id, monitored);
                        created += 1;
                        MonitoredItemCreateResult {
                            status_code: StatusCode::Good,
                            monitored_item_id: id,
                            revised_sampling_interval,
                            revised_queue_size,
                        }
                    }
                    Err(status) => MonitoredItemCreateResult {
                        status_code: status,
                        monitored_item_id: 0,
                        revised_sampling_interval: 0.0,
                        revised_queue_size: 0,
                    },
                }
            })
            .collect();
        session.diagnostics.adjust_monitored_items(created);
        CreateMonitoredItemsResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// `ModifyMonitoredItems` (§4.12).
    pub fn modify_monitored_items(
        &self,
        store: &NodeStore,
        session: &Session,
        limits: &Limits,
        request: ModifyMonitoredItemsRequest,
    ) -> ModifyMonitoredItemsResponse {
        let mut subscriptions = self.subscriptions.lock();
        let Some(sub) = subscriptions
            .get_mut(&request.subscription_id)
            .filter(|s| s.session_guid == session_guid(session))
        else {
            return ModifyMonitoredItemsResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::BadSubscriptionIdInvalid),
                results: Vec::new(),
            };
        };
        let results = request
            .items_to_modify
            .iter()
            .map(|item| match sub.monitored_items.get_mut(&item.monitored_item_id) {
                Some(monitored) => match monitored.modify(store, limits, item, request.timestamps_to_return) {
                    Ok(()) => MonitoredItemCreateResult {
                        status_code: StatusCode::Good,
                        monitored_item_id: item.monitored_item_id,
                        revised_sampling_interval: monitored.sampling_interval,
                        revised_queue_size: monitored.queue_size,
                    },
                    Err(status) => MonitoredItemCreateResult {
                        status_code: status,
                        monitored_item_id: item.monitored_item_id,
                        revised_sampling_interval: 0.0,
                        revised_queue_size: 0,
                    },
                },
                None => MonitoredItemCreateResult {
                    status_code: StatusCode::BadMonitoredItemIdInvalid,
                    monitored_item_id: item.monitored_item_id,
                    revised_sampling_interval: 0.0,
                    revised_queue_size: 0,
                },
            })
            .collect();
        ModifyMonitoredItemsResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// `SetMonitoringMode` (§4.12).
    pub fn set_monitoring_mode(&self, session: &Session, request: SetMonitoringModeRequest) -> SetMonitoringModeResponse {
        let mut subscriptions = self.subscriptions.lock();
        let Some(sub) = subscriptions
            .get_mut(&request.subscription_id)
            .filter(|s| s.session_guid == session_guid(session))
        else {
            return SetMonitoringModeResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::BadSubscriptionIdInvalid),
                results: request.monitored_item_ids.iter().map(|_| StatusCode::BadSubscriptionIdInvalid).collect(),
            };
        };
        let results = request
            .monitored_item_ids
            .iter()
            .map(|id| match sub.monitored_items.get_mut(id) {
                Some(item) => {
                    item.set_monitoring_mode(request.monitoring_mode);
                    StatusCode::Good
                }
                None => StatusCode::BadMonitoredItemIdInvalid,
            })
            .collect();
        SetMonitoringModeResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// `DeleteMonitoredItems` (§4.12).
    pub fn delete_monitored_items(&self, session: &Session, request: DeleteMonitoredItemsRequest) -> DeleteMonitoredItemsResponse {
        let mut subscriptions = self.subscriptions.lock();
        let Some(sub) = subscriptions
            .get_mut(&request.subscription_id)
            .filter(|s| s.session_guid == session_guid(session))
        else {
            return DeleteMonitoredItemsResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::BadSubscriptionIdInvalid),
                results: request.monitored_item_ids.iter().map(|_| StatusCode::BadSubscriptionIdInvalid).collect(),
            };
        };
        let mut removed = 0i64;
        let results = request
            .monitored_item_ids
            .iter()
            .map(|id| {
                if sub.monitored_items.remove(id).is_some() {
                    removed += 1;
                    StatusCode::Good
                } else {
                    StatusCode::BadMonitoredItemIdInvalid
                }
            })
            .collect();
        session.diagnostics.adjust_monitored_items(-removed);
        DeleteMonitoredItemsResponse {
            response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
            results,
        }
    }

    /// One publishing-cycle tick for every subscription owned by `session`
    /// (§4.11): samples MonitoredItems and, for subscriptions with nothing to
    /// report, advances the keep-alive counter. Called by the server's
    /// publishing loop once per subscription's `publishing_interval`; this
    /// core drives all of a session's subscriptions from one call since they
    /// commonly share a clock tick in the retrieved examples' ticker style.
    pub fn tick_session(&self, store: &NodeStore, session: &Session, now: DateTime<Utc>) {
        let mut subscriptions = self.subscriptions.lock();
        for id in session.subscription_ids() {
            if let Some(sub) = subscriptions.get_mut(&id) {
                sub.sample_at(store, now);
                if sub.publishing_enabled && !sub.has_ready_notifications() {
                    sub.advance_keep_alive();
                }
            }
        }
    }

    /// `Publish` (§4.11): apply acknowledgements, then either answer
    /// immediately from a subscription with ready data (or an overdue
    /// keep-alive), or park the request on the session to be answered by a
    /// later publishing cycle.
    pub fn publish(&self, session: &Session, request: PublishRequest, now: DateTime<Utc>) -> Option<PublishResponse> {
        let mut subscriptions = self.subscriptions.lock();
        let ack_results = request
            .subscription_acknowledgements
            .iter()
            .map(|ack| match subscriptions.get_mut(&ack.subscription_id) {
                Some(sub) if sub.session_guid == session_guid(session) => sub.acknowledge(ack.sequence_number),
                _ => StatusCode::BadSubscriptionIdInvalid,
            })
            .collect::<Vec<_>>();

        let mut candidate_ids = session.subscription_ids();
        candidate_ids.sort_by_key(|id| {
            std::cmp::Reverse(subscriptions.get(id).map(|s| s.priority).unwrap_or(0))
        });

        for id in &candidate_ids {
            let Some(sub) = subscriptions.get_mut(id) else { continue };
            if !sub.publishing_enabled {
                continue;
            }
            if sub.has_ready_notifications() {
                let message = sub.build_data_message(now);
                sub.current_keep_alive_count = 0;
                sub.current_lifetime_count = 0;
                sub.state = SubscriptionState::Normal;
                sub.enqueue_retransmission(message.clone());
                let more_notifications = sub.has_ready_notifications();
                return Some(PublishResponse {
                    response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
                    subscription_id: *id,
                    available_sequence_numbers: sub.available_sequence_numbers(),
                    more_notifications,
                    notification_message: message,
                    results: ack_results,
                });
            }
        }
        for id in &candidate_ids {
            let Some(sub) = subscriptions.get_mut(id) else { continue };
            if !sub.publishing_enabled {
                continue;
            }
            if sub.current_keep_alive_count >= sub.max_keep_alive_count {
                sub.current_keep_alive_count = 0;
                sub.state = SubscriptionState::KeepAlive;
                let message = NotificationMessage::keep_alive(sub.next_sequence_number(), now);
                return Some(PublishResponse {
                    response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
                    subscription_id: *id,
                    available_sequence_numbers: sub.available_sequence_numbers(),
                    more_notifications: false,
                    notification_message: message,
                    results: ack_results,
                });
            }
        }
        None
    }

    /// Answer one previously queued [`PendingPublish`] the same way
    /// [`SubscriptionManager::publish`] would have answered it at arrival
    /// time, reusing its already-captured acknowledgements. Called by the
    /// publishing loop once a tick leaves a subscription with data ready.
    pub fn answer_pending(&self, session: &Session, pending: PendingPublish, now: DateTime<Utc>) -> Option<PublishResponse> {
        let request = PublishRequest {
            request_header: opcua_types::service_types::RequestHeader {
                request_handle: pending.request_handle,
                ..Default::default()
            },
            subscription_acknowledgements: pending.subscription_acknowledgements,
        };
        self.publish(session, request, now)
    }

    /// Mark every one of `session`'s subscriptions as having gone one more
    /// publishing cycle without an available PublishRequest (§4.11 Late
    /// state), returning the ids of any that consequently expired along with
    /// the `StatusChangeNotification{BadTimeout}` to deliver before deleting
    /// them.
    pub fn mark_late_and_expire(&self, session: &Session, now: DateTime<Utc>) -> Vec<(u32, NotificationMessage)> {
        let mut subscriptions = self.subscriptions.lock();
        let mut expired = Vec::new();
        for id in session.subscription_ids() {
            if let Some(sub) = subscriptions.get_mut(&id) {
                // §4.11: the lifetime counter advances every callback tick
                // regardless of whether the subscription has anything to
                // report; only the keep-alive counter (tick_session) is
                // gated on notification readiness.
                sub.current_lifetime_count += 1;
                sub.state = SubscriptionState::Late;
                if sub.is_expired() {
                    let message = NotificationMessage {
                        sequence_number: sub.next_sequence_number(),
                        publish_time: now,
                        notification_data: vec![NotificationData::StatusChange(StatusChangeNotification {
                            status: StatusCode::BadTimeout,
                        })],
                    };
                    expired.push((id, message));
                }
            }
        }
        for (id, _) in &expired {
            subscriptions.remove(id);
            session.remove_subscription(*id);
        }
        expired
    }

    /// `Republish` (§4.11).
    pub fn republish(&self, session: &Session, request: RepublishRequest) -> RepublishResponse {
        let subscriptions = self.subscriptions.lock();
        match subscriptions
            .get(&request.subscription_id)
            .filter(|s| s.session_guid == session_guid(session))
            .and_then(|s| s.republish(request.retransmit_sequence_number))
        {
            Some(message) => RepublishResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
                notification_message: message,
            },
            None => RepublishResponse {
                response_header: ResponseHeader::new(&request.request_header, StatusCode::BadMessageNotAvailable),
                notification_message: NotificationMessage::keep_alive(0, request.request_header.timestamp),
            },
        }
    }

    /// Number of MonitoredItems currently installed on `subscription_id`, or
    /// `0` if it doesn't exist; used by tests and diagnostics.
    pub fn monitored_item_count(&self, subscription_id: u32) -> usize {
        self.subscriptions
            .lock()
            .get(&subscription_id)
            .map(|s| s.monitored_items.len())
            .unwrap_or(0)
    }
}

fn session_guid(session: &Session) -> Guid {
    match session.authentication_token.identifier {
        opcua_types::Identifier::Guid(g) => g,
        _ => Guid::default(),
    }
}

/// §C.4: process an incoming `PublishRequest`. Returns the response
/// immediately if a subscription had something ready; otherwise parks the
/// request on the session (`Ok(None)`) for a later publishing cycle to
/// answer, or rejects it outright if the session's publish queue is full.
pub fn handle_publish(
    manager: &SubscriptionManager,
    session: &Session,
    request: PublishRequest,
    now: DateTime<Utc>,
) -> Result<Option<PublishResponse>, StatusCode> {
    if let Some(response) = manager.publish(session, request.clone(), now) {
        return Ok(Some(response));
    }
    let deadline = if request.request_header.timeout_hint > 0 {
        Some(now + chrono::Duration::milliseconds(request.request_header.timeout_hint as i64))
    } else {
        None
    };
    session.enqueue_publish(PendingPublish {
        request_handle: request.request_header.request_handle,
        subscription_acknowledgements: request.subscription_acknowledgements,
        deadline,
    })?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionManager;
    use opcua_types::service_types::{RequestHeader, SubscriptionAcknowledgement};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn new_session() -> std::sync::Arc<Session> {
        let manager = SessionManager::new();
        manager.create("test".to_string(), 60_000.0, &Limits::default(), now())
    }

    fn create_request(publishing_enabled: bool) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            request_header: RequestHeader::default(),
            requested_publishing_interval: 100.0,
            requested_lifetime_count: 3,
            requested_max_keep_alive_count: 2,
            max_notifications_per_publish: 0,
            publishing_enabled,
            priority: 0,
        }
    }

    #[test]
    fn create_subscription_revises_lifetime_to_at_least_triple_keep_alive() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let response = manager.create_subscription(&session, &Limits::default(), create_request(true));
        assert_eq!(response.revised_max_keep_alive_count, 2);
        assert_eq!(response.revised_lifetime_count, 6);
        assert_eq!(session.subscription_ids(), vec![response.subscription_id]);
    }

    #[test]
    fn publish_pairs_ready_notification_with_request() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        {
            let mut subs = manager.subscriptions.lock();
            let sub = subs.get_mut(&created.subscription_id).unwrap();
            sub.monitored_items.insert(
                1,
                monitored_item_with_pending(),
            );
        }
        let request = PublishRequest {
            request_header: RequestHeader::default(),
            subscription_acknowledgements: Vec::new(),
        };
        let response = manager.publish(&session, request, now()).expect("data was ready");
        assert_eq!(response.subscription_id, created.subscription_id);
        assert_eq!(response.notification_message.sequence_number, 1);
        assert_eq!(response.available_sequence_numbers, vec![1]);
    }

    #[test]
    fn publish_with_nothing_ready_returns_none_until_keep_alive_due() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        let request = PublishRequest {
            request_header: RequestHeader::default(),
            subscription_acknowledgements: Vec::new(),
        };
        assert!(manager.publish(&session, request.clone(), now()).is_none());

        {
            let mut subs = manager.subscriptions.lock();
            let sub = subs.get_mut(&created.subscription_id).unwrap();
            sub.current_keep_alive_count = sub.max_keep_alive_count;
        }
        let response = manager.publish(&session, request, now()).expect("keep-alive due");
        assert!(response.notification_message.notification_data.is_empty());
    }

    #[test]
    fn republish_returns_bad_message_not_available_on_miss() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        let response = manager.republish(
            &session,
            RepublishRequest {
                request_header: RequestHeader::default(),
                subscription_id: created.subscription_id,
                retransmit_sequence_number: 99,
            },
        );
        assert_eq!(response.response_header.service_result, StatusCode::BadMessageNotAvailable);
    }

    #[test]
    fn acknowledgement_frees_retransmission_queue_entry() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        {
            let mut subs = manager.subscriptions.lock();
            let sub = subs.get_mut(&created.subscription_id).unwrap();
            sub.monitored_items.insert(1, monitored_item_with_pending());
        }
        let request = PublishRequest {
            request_header: RequestHeader::default(),
            subscription_acknowledgements: Vec::new(),
        };
        let first = manager.publish(&session, request, now()).unwrap();
        assert_eq!(first.available_sequence_numbers, vec![1]);

        let ack_request = PublishRequest {
            request_header: RequestHeader::default(),
            subscription_acknowledgements: vec![SubscriptionAcknowledgement {
                subscription_id: created.subscription_id,
                sequence_number: 1,
            }],
        };
        // Nothing new is ready, so this only processes the acknowledgement
        // and returns None (below keep-alive threshold).
        manager.publish(&session, ack_request, now());
        let subs = manager.subscriptions.lock();
        assert!(subs.get(&created.subscription_id).unwrap().available_sequence_numbers().is_empty());
    }

    #[test]
    fn delete_subscriptions_removes_from_session() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        let response = manager.delete_subscriptions(
            &session,
            DeleteSubscriptionsRequest {
                request_header: RequestHeader::default(),
                subscription_ids: vec![created.subscription_id],
            },
        );
        assert_eq!(response.results, vec![StatusCode::Good]);
        assert!(session.subscription_ids().is_empty());
    }

    #[test]
    fn set_publishing_mode_resets_keep_alive_on_reenable() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        {
            let mut subs = manager.subscriptions.lock();
            subs.get_mut(&created.subscription_id).unwrap().current_keep_alive_count = 1;
        }
        manager.set_publishing_mode(
            &session,
            SetPublishingModeRequest {
                request_header: RequestHeader::default(),
                publishing_enabled: false,
                subscription_ids: vec![created.subscription_id],
            },
        );
        manager.set_publishing_mode(
            &session,
            SetPublishingModeRequest {
                request_header: RequestHeader::default(),
                publishing_enabled: true,
                subscription_ids: vec![created.subscription_id],
            },
        );
        let subs = manager.subscriptions.lock();
        assert_eq!(subs.get(&created.subscription_id).unwrap().current_keep_alive_count, 0);
    }

    fn monitored_item_with_pending() -> MonitoredItem {
        use opcua_nodes::{Base, Node, NodeStore, ValueSource, VariableNode};
        use opcua_types::node_class::AccessLevel;
        use opcua_types::service_types::{MonitoredItemCreateRequest, MonitoringFilter, MonitoringMode, MonitoringParameters, ReadValueId};
        use opcua_types::{DataValue, NodeId, TimestampsToReturn, Variant};

        let store = NodeStore::new();
        let node_id = NodeId::new(1, 50u32);
        store
            .insert(Node::Variable(Box::new(VariableNode {
                base: Base::new(node_id.clone(), "v", "v"),
                data_type: NodeId::new(0, opcua_types::constants::object_id::DOUBLE),
                value_rank: -1,
                array_dimensions: None,
                access_level: AccessLevel::CURRENT_READ,
                user_access_level: AccessLevel::CURRENT_READ,
                minimum_sampling_interval: 0.0,
                historizing: false,
                value: ValueSource::new(DataValue::new_now(Variant::Double(1.0))),
            })))
            .unwrap();
        let request = MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId::new(node_id.clone(), opcua_types::node_class::AttributeId::Value),
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle: 1,
                sampling_interval: 10.0,
                filter: MonitoringFilter::default(),
                queue_size: 2,
                discard_oldest: true,
            },
        };
        let mut item = MonitoredItem::create(&store, &Limits::default(), 1, &request, TimestampsToReturn::Both, now()).unwrap();
        crate::services::attribute::write_value(
            &store,
            &node_id,
            opcua_types::node_class::AttributeId::Value,
            &opcua_types::NumericRange::default(),
            &DataValue::new_now(Variant::Double(2.0)),
        );
        item.sample(&store, now());
        item
    }

    #[test]
    fn raise_event_ascends_notifiers_and_enqueues_matching_fields() {
        use opcua_nodes::{Base, Node, NodeStore, ObjectNode};
        use opcua_types::service_types::{
            ContentFilterElement, ContentFilterOperand, EventFilter, MonitoredItemCreateRequest,
            MonitoringFilter, MonitoringParameters, SimpleAttributeOperand,
        };
        use opcua_types::{constants::object_id, AttributeId, NodeId, QualifiedName, ReadValueId, TimestampsToReturn, Variant};

        let store = NodeStore::new();
        let area = store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(NodeId::new(1, 1u32), "Area", "Area"),
                event_notifier: 0,
            })))
            .unwrap();
        let source = store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(NodeId::new(1, 2u32), "Sensor", "Sensor"),
                event_notifier: 0,
            })))
            .unwrap();
        let has_notifier = NodeId::new(0, object_id::HAS_NOTIFIER);
        store.add_reference_pair(&area, &has_notifier, &source).unwrap();

        let select = SimpleAttributeOperand {
            type_definition_id: NodeId::null(),
            browse_path: vec![QualifiedName::from("Severity")],
            attribute_id: AttributeId::Value,
        };
        let filter = MonitoringFilter::Event(EventFilter {
            select_clauses: vec![select.clone()],
            where_clause: vec![ContentFilterElement::Equals(
                Box::new(ContentFilterOperand::Attribute(select)),
                Box::new(ContentFilterOperand::Literal(Variant::Int32(500))),
            )],
        });
        let request = MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId::new(area.clone(), AttributeId::EventNotifier),
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle: 9,
                sampling_interval: 0.0,
                filter,
                queue_size: 2,
                discard_oldest: true,
            },
        };
        let item = MonitoredItem::create(&store, &Limits::default(), 1, &request, TimestampsToReturn::Both, now()).unwrap();

        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        manager.subscriptions.lock().get_mut(&created.subscription_id).unwrap().monitored_items.insert(item.id, item);

        let event = Event::new(source, NodeId::new(0, 2041)).with_field("Severity", Variant::Int32(500));
        manager.raise_event(&store, &event);

        let mut subs = manager.subscriptions.lock();
        let sub = subs.get_mut(&created.subscription_id).unwrap();
        let delivered = sub.monitored_items.values_mut().next().unwrap().take_events();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event_fields, vec![Variant::Int32(500)]);
    }

    #[test]
    fn raise_event_skips_monitored_items_outside_the_notifier_ascent() {
        use opcua_nodes::{Base, Node, NodeStore, ObjectNode};
        use opcua_types::service_types::{
            EventFilter, MonitoredItemCreateRequest, MonitoringFilter, MonitoringParameters,
        };
        use opcua_types::{AttributeId, NodeId, ReadValueId, TimestampsToReturn, Variant};

        let store = NodeStore::new();
        let unrelated = store
            .insert(Node::Object(Box::new(ObjectNode {
                base: Base::new(NodeId::new(1, 3u32), "Other", "Other"),
                event_notifier: 0,
            })))
            .unwrap();
        let source = NodeId::new(1, 99u32);

        let request = MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId::new(unrelated, AttributeId::EventNotifier),
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle: 9,
                sampling_interval: 0.0,
                filter: MonitoringFilter::Event(EventFilter { select_clauses: vec![], where_clause: vec![] }),
                queue_size: 2,
                discard_oldest: true,
            },
        };
        let item = MonitoredItem::create(&store, &Limits::default(), 1, &request, TimestampsToReturn::Both, now()).unwrap();

        let session = new_session();
        let manager = SubscriptionManager::new();
        let created = manager.create_subscription(&session, &Limits::default(), create_request(true));
        manager.subscriptions.lock().get_mut(&created.subscription_id).unwrap().monitored_items.insert(item.id, item);

        manager.raise_event(&store, &Event::new(source, NodeId::new(0, 2041)));

        let mut subs = manager.subscriptions.lock();
        let sub = subs.get_mut(&created.subscription_id).unwrap();
        assert!(sub.monitored_items.values_mut().next().unwrap().take_events().is_empty());
    }

    #[test]
    fn subscription_with_no_monitored_items_times_out_on_lifetime_starvation() {
        let session = new_session();
        let manager = SubscriptionManager::new();
        let request = CreateSubscriptionRequest {
            request_header: RequestHeader::default(),
            requested_publishing_interval: 100.0,
            requested_lifetime_count: 3,
            requested_max_keep_alive_count: 1,
            max_notifications_per_publish: 0,
            publishing_enabled: true,
            priority: 0,
        };
        let created = manager.create_subscription(&session, &Limits::default(), request);
        assert_eq!(created.revised_lifetime_count, 3);

        // No PublishRequests ever arrive; the publishing loop still ticks the
        // subscription, which has zero MonitoredItems and therefore never has
        // ready notifications.
        let mut expired = Vec::new();
        let mut when = now();
        for _ in 0..3 {
            when += chrono::Duration::milliseconds(100);
            expired = manager.mark_late_and_expire(&session, when);
        }

        assert_eq!(expired.len(), 1);
        let (id, message) = &expired[0];
        assert_eq!(*id, created.subscription_id);
        assert_eq!(
            message.notification_data,
            vec![NotificationData::StatusChange(StatusChangeNotification { status: StatusCode::BadTimeout })]
        );
        assert!(session.subscription_ids().is_empty());
        assert!(manager.subscriptions.lock().get(&created.subscription_id).is_none());
    }
}
