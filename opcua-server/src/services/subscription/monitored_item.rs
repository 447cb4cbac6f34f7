// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The MonitoredItem engine (§4.12): creation validation, sampling, deadband,
//! and the per-item notification queue.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use opcua_nodes::{Node, NodeStore};
use opcua_types::{
    constants::object_id,
    node_class::AttributeId,
    qualified_name::QualifiedName,
    service_types::{
        DataChangeFilter, DataChangeTrigger, DeadbandType, EventFieldList, EventFilter,
        MonitoredItemCreateRequest, MonitoredItemModifyRequest, MonitoredItemNotification,
        MonitoringFilter, MonitoringMode, MonitoringParameters,
    },
    DataValue, NodeId, NumericRange, StatusCode, TimestampsToReturn, Variant,
};

use crate::config::Limits;
use crate::services::attribute;

/// Statuses a value may carry on creation without aborting it (§4.12): the
/// healthy band plus a whitelist of transient-unreadable codes.
fn status_allows_creation(status: StatusCode) -> bool {
    if status.is_good() || status.is_uncertain() {
        return true;
    }
    matches!(
        status,
        StatusCode::BadWaitingForInitialData
            | StatusCode::BadResourceUnavailable
            | StatusCode::BadCommunicationError
            | StatusCode::BadUserAccessDenied
            | StatusCode::BadNotReadable
            | StatusCode::BadIndexRangeNoData
    )
}

/// One server-side MonitoredItem: the subscribed attribute, its installed
/// filter, and the notification queue awaiting the next Publish.
#[derive(Debug, Clone)]
pub struct MonitoredItem {
    /// Server-assigned id, unique within the subscription.
    pub id: u32,
    /// Client-chosen correlation handle, echoed in every notification.
    pub client_handle: u32,
    /// The node being monitored.
    pub node_id: NodeId,
    /// The attribute being monitored.
    pub attribute_id: AttributeId,
    index_range: NumericRange,
    /// Current mode.
    pub monitoring_mode: MonitoringMode,
    /// Revised sampling interval, after clamping (§4.12).
    pub sampling_interval: f64,
    /// Revised queue size, after clamping.
    pub queue_size: u32,
    /// Whether to discard the oldest queued notification on overflow.
    pub discard_oldest: bool,
    timestamps_to_return: TimestampsToReturn,
    filter: MonitoringFilter,
    last_sampled: Option<DataValue>,
    queue: VecDeque<MonitoredItemNotification>,
    event_queue: VecDeque<EventFieldList>,
}

impl MonitoredItem {
    /// Create a MonitoredItem, performing the validating read, clamping, and
    /// filter installation described in §4.12. `id`/`client_handle` are
    /// assigned by the caller (the subscription owns id allocation).
    pub fn create(
        store: &NodeStore,
        limits: &Limits,
        id: u32,
        request: &MonitoredItemCreateRequest,
        timestamps_to_return: TimestampsToReturn,
        now: DateTime<Utc>,
    ) -> Result<Self, StatusCode> {
        let item_to_monitor = &request.item_to_monitor;
        let index_range = item_to_monitor.parsed_index_range()?.unwrap_or_default();

        let initial = attribute::read_value(
            store,
            &item_to_monitor.node_id,
            item_to_monitor.attribute_id,
            &index_range,
            item_to_monitor.data_encoding.value(),
            timestamps_to_return,
            0.0,
            now,
        );
        if !status_allows_creation(initial.status()) {
            return Err(initial.status());
        }

        let is_event = item_to_monitor.attribute_id == AttributeId::EventNotifier;
        let sampling_interval = if is_event {
            limits.default_event_sampling_interval_ms
        } else {
            let mut clamped = limits.clamp_interval(request.requested_parameters.sampling_interval);
            if item_to_monitor.attribute_id == AttributeId::Value {
                if let Some(min) = store.with_node(&item_to_monitor.node_id, |n| match n {
                    Node::Variable(v) => Some(v.minimum_sampling_interval),
                    _ => None,
                }).flatten() {
                    clamped = clamped.max(min);
                }
            }
            clamped
        };
        let queue_size = limits.clamp_queue_size(request.requested_parameters.queue_size);

        let filter = install_filter(store, &item_to_monitor.node_id, is_event, &request.requested_parameters)?;

        Ok(Self {
            id,
            client_handle: request.requested_parameters.client_handle,
            node_id: item_to_monitor.node_id.clone(),
            attribute_id: item_to_monitor.attribute_id,
            index_range,
            monitoring_mode: request.monitoring_mode,
            sampling_interval,
            queue_size,
            discard_oldest: request.requested_parameters.discard_oldest,
            timestamps_to_return,
            filter,
            last_sampled: None,
            queue: VecDeque::new(),
            event_queue: VecDeque::new(),
        })
    }

    /// Apply a ModifyMonitoredItems request's parameters (§4.12: same
    /// clamping and filter rules as creation, re-applied in place).
    pub fn modify(
        &mut self,
        store: &NodeStore,
        limits: &Limits,
        request: &MonitoredItemModifyRequest,
        timestamps_to_return: TimestampsToReturn,
    ) -> Result<(), StatusCode> {
        let is_event = self.attribute_id == AttributeId::EventNotifier;
        let filter = install_filter(store, &self.node_id, is_event, &request.requested_parameters)?;
        let sampling_interval = if is_event {
            limits.default_event_sampling_interval_ms
        } else {
            let mut clamped = limits.clamp_interval(request.requested_parameters.sampling_interval);
            if self.attribute_id == AttributeId::Value {
                if let Some(min) = store.with_node(&self.node_id, |n| match n {
                    Node::Variable(v) => Some(v.minimum_sampling_interval),
                    _ => None,
                }).flatten() {
                    clamped = clamped.max(min);
                }
            }
            clamped
        };
        self.sampling_interval = sampling_interval;
        self.queue_size = limits.clamp_queue_size(request.requested_parameters.queue_size);
        self.discard_oldest = request.requested_parameters.discard_oldest;
        self.client_handle = request.requested_parameters.client_handle;
        self.filter = filter;
        self.timestamps_to_return = timestamps_to_return;
        Ok(())
    }

    /// Transition to a new MonitoringMode (§4.12): disabling or moving to
    /// `Sampling` drops queued notifications and resets the deadband
    /// baseline; moving to `Reporting` just resumes delivery.
    pub fn set_monitoring_mode(&mut self, mode: MonitoringMode) {
        if mode != MonitoringMode::Reporting {
            self.queue.clear();
            self.event_queue.clear();
            self.last_sampled = None;
        }
        self.monitoring_mode = mode;
    }

    /// Sample the monitored attribute once, enqueueing a notification if the
    /// trigger/deadband rules call for one. A no-op for EventNotifier items
    /// (events arrive via [`MonitoredItem::enqueue_event`] instead) and for
    /// `Disabled` items.
    pub fn sample(&mut self, store: &NodeStore, now: DateTime<Utc>) {
        if self.monitoring_mode == MonitoringMode::Disabled || self.attribute_id == AttributeId::EventNotifier {
            return;
        }
        let value = attribute::read_value(
            store,
            &self.node_id,
            self.attribute_id,
            &self.index_range,
            None,
            self.timestamps_to_return,
            0.0,
            now,
        );
        if !self.passes_trigger(&value) || !self.passes_deadband(store, &value) {
            self.last_sampled = Some(value);
            return;
        }
        self.last_sampled = Some(value.clone());
        if self.monitoring_mode == MonitoringMode::Reporting {
            self.push_notification(MonitoredItemNotification::new(self.client_handle, value));
        }
    }

    /// Enqueue one already-matched event field list (the event path's where-
    /// clause/select-clause evaluation happens in [`super::event`]).
    pub fn enqueue_event(&mut self, fields: Vec<Variant>) {
        if self.monitoring_mode != MonitoringMode::Reporting {
            return;
        }
        let list = EventFieldList {
            client_handle: self.client_handle,
            event_fields: fields,
        };
        if self.event_queue.len() as u32 >= self.queue_size.max(1) {
            if self.discard_oldest {
                self.event_queue.pop_front();
            } else {
                return;
            }
        }
        self.event_queue.push_back(list);
    }

    fn push_notification(&mut self, mut notification: MonitoredItemNotification) {
        if self.queue.len() as u32 >= self.queue_size.max(1) {
            if self.discard_oldest {
                self.queue.pop_front();
                notification.overflow = true;
            } else {
                if let Some(last) = self.queue.back_mut() {
                    last.overflow = true;
                }
                return;
            }
        }
        self.queue.push_back(notification);
    }

    /// Drain and return every queued data-change notification.
    pub fn take_notifications(&mut self) -> Vec<MonitoredItemNotification> {
        self.queue.drain(..).collect()
    }

    /// Drain and return every queued event notification.
    pub fn take_events(&mut self) -> Vec<EventFieldList> {
        self.event_queue.drain(..).collect()
    }

    /// `true` if either queue currently holds something to publish.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty() || !self.event_queue.is_empty()
    }

    /// The installed event filter, for the event path's ascent to decide
    /// whether this item is a candidate and to run its where/select clauses
    /// against. `None` for a data-change item.
    pub fn event_filter(&self) -> Option<&EventFilter> {
        match &self.filter {
            MonitoringFilter::Event(f) => Some(f),
            MonitoringFilter::DataChange(_) => None,
        }
    }

    fn passes_trigger(&self, new: &DataValue) -> bool {
        let MonitoringFilter::DataChange(filter) = &self.filter else {
            return true;
        };
        let Some(old) = &self.last_sampled else {
            return true;
        };
        match filter.trigger {
            DataChangeTrigger::Status => old.status() != new.status(),
            DataChangeTrigger::StatusValue => old.status() != new.status() || old.value != new.value,
            DataChangeTrigger::StatusValueTimestamp => {
                old.status() != new.status() || old.value != new.value || old.source_timestamp != new.source_timestamp
            }
        }
    }

    fn passes_deadband(&self, store: &NodeStore, new: &DataValue) -> bool {
        let MonitoringFilter::DataChange(filter) = &self.filter else {
            return true;
        };
        let DeadbandType::None = filter.deadband_type else {
            return self.passes_deadband_value(store, filter, new);
        };
        true
    }

    fn passes_deadband_value(&self, store: &NodeStore, filter: &DataChangeFilter, new: &DataValue) -> bool {
        let (Some(old_v), Some(new_v)) = (
            self.last_sampled.as_ref().and_then(|d| d.value.as_ref()),
            new.value.as_ref(),
        ) else {
            return true;
        };
        let (Some(old_type), Some(new_type)) = (old_v.scalar_type_id(), new_v.scalar_type_id()) else {
            return true;
        };
        let (Some(old_f), Some(new_f)) = (old_type.as_f64(old_v), new_type.as_f64(new_v)) else {
            return true;
        };
        let delta = (new_f - old_f).abs();
        match filter.deadband_type {
            DeadbandType::None => true,
            DeadbandType::Absolute(limit) => delta > limit,
            DeadbandType::Percent(pct) => match eu_range_of(store, &self.node_id) {
                Some((low, high)) if high > low => delta > (pct / 100.0) * (high - low),
                _ => true,
            },
        }
    }
}

/// Validate and normalise a requested filter (§4.12): a data-change filter's
/// deadband must be numeric-compatible; an event filter is only valid on an
/// `EventNotifier` attribute.
fn install_filter(
    store: &NodeStore,
    node_id: &NodeId,
    is_event: bool,
    params: &MonitoringParameters,
) -> Result<MonitoringFilter, StatusCode> {
    match &params.filter {
        MonitoringFilter::Event(f) => {
            if !is_event {
                return Err(StatusCode::BadAttributeIdInvalid);
            }
            Ok(MonitoringFilter::Event(clone_event_filter(f)))
        }
        MonitoringFilter::DataChange(f) => {
            if is_event {
                // §4.12: EventNotifier items ignore deadband outright.
                return Ok(MonitoringFilter::DataChange(DataChangeFilter {
                    trigger: f.trigger,
                    deadband_type: DeadbandType::None,
                }));
            }
            match f.deadband_type {
                DeadbandType::None => {}
                DeadbandType::Absolute(_) => {
                    if !value_type_is_numeric(store, node_id) {
                        return Err(StatusCode::BadInvalidArgument);
                    }
                }
                DeadbandType::Percent(pct) => {
                    if !(0.0..=100.0).contains(&pct) || !value_type_is_numeric(store, node_id) {
                        return Err(StatusCode::BadInvalidArgument);
                    }
                }
            }
            Ok(MonitoringFilter::DataChange(*f))
        }
    }
}

fn clone_event_filter(f: &EventFilter) -> EventFilter {
    EventFilter {
        select_clauses: f.select_clauses.clone(),
        where_clause: f.where_clause.clone(),
    }
}

/// `true` if the variable's declared data type is one of the numeric builtin
/// types (`SByte`..`Double`, ids 2..=11), the same range
/// [`opcua_types::VariantScalarTypeId::is_numeric`] accepts.
fn value_type_is_numeric(store: &NodeStore, node_id: &NodeId) -> bool {
    store
        .with_node(node_id, |n| match n {
            Node::Variable(v) => {
                v.data_type.namespace == 0 && v.data_type.as_u32().is_some_and(|id| (2..=11).contains(&id))
            }
            _ => false,
        })
        .unwrap_or(false)
}

/// Resolve a Variable's `EURange` property (§4.12 percent deadband),
/// expected to hold a two-element `Double` array `[low, high]` since
/// [`Variant`] has no structured `Range` carrier.
fn eu_range_of(store: &NodeStore, node_id: &NodeId) -> Option<(f64, f64)> {
    let has_property = NodeId::new(0, object_id::HAS_PROPERTY);
    let eu_range_name = QualifiedName::from("EURange");
    let refs = store.iter_references(node_id)?;
    let property_id = refs.iter().filter(|r| !r.is_inverse && r.reference_type_id == has_property).find_map(|r| {
        if !r.target_id.is_local() {
            return None;
        }
        store
            .with_node(&r.target_id.node_id, |n| (n.base().browse_name == eu_range_name).then(|| n.node_id().clone()))
            .flatten()
    })?;
    let value = store.with_node(&property_id, |n| match n {
        Node::Variable(v) => match &v.value {
            opcua_nodes::ValueSource::Value { value, .. } => value.value.clone(),
            _ => None,
        },
        _ => None,
    })??;
    match value {
        Variant::Array(arr) if arr.values.len() == 2 => {
            let low = arr.value_type.as_f64(&arr.values[0])?;
            let high = arr.value_type.as_f64(&arr.values[1])?;
            Some((low, high))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_nodes::{Base, ValueSource, VariableNode};
    use opcua_types::node_class::AccessLevel;
    use opcua_types::service_types::ReadValueId;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn variable_store(value: Variant, min_sampling: f64) -> (NodeStore, NodeId) {
        let store = NodeStore::new();
        let node_id = NodeId::new(1, 10u32);
        store
            .insert(Node::Variable(Box::new(VariableNode {
                base: Base::new(node_id.clone(), "v", "v"),
                data_type: NodeId::new(0, object_id::DOUBLE),
                value_rank: -1,
                array_dimensions: None,
                access_level: AccessLevel::CURRENT_READ,
                user_access_level: AccessLevel::CURRENT_READ,
                minimum_sampling_interval: min_sampling,
                historizing: false,
                value: ValueSource::new(DataValue::new_now(value)),
            })))
            .unwrap();
        (store, node_id)
    }

    fn create_request(node_id: NodeId, filter: MonitoringFilter) -> MonitoredItemCreateRequest {
        MonitoredItemCreateRequest {
            item_to_monitor: ReadValueId::new(node_id, AttributeId::Value),
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters: MonitoringParameters {
                client_handle: 5,
                sampling_interval: 10.0,
                filter,
                queue_size: 2,
                discard_oldest: true,
            },
        }
    }

    #[test]
    fn create_raises_sampling_interval_to_node_minimum() {
        let (store, node_id) = variable_store(Variant::Double(1.0), 500.0);
        let limits = Limits::default();
        let item = MonitoredItem::create(
            &store,
            &limits,
            1,
            &create_request(node_id, MonitoringFilter::default()),
            TimestampsToReturn::Both,
            now(),
        )
        .unwrap();
        assert_eq!(item.sampling_interval, 500.0);
    }

    #[test]
    fn create_tolerates_whitelisted_bad_status() {
        let store = NodeStore::new();
        let node_id = NodeId::new(1, 11u32);
        store
            .insert(Node::Variable(Box::new(VariableNode {
                base: Base::new(node_id.clone(), "v", "v"),
                data_type: NodeId::new(0, object_id::DOUBLE),
                value_rank: -1,
                array_dimensions: None,
                access_level: AccessLevel::empty(),
                user_access_level: AccessLevel::empty(),
                minimum_sampling_interval: 0.0,
                historizing: false,
                value: ValueSource::new(DataValue::new_now(Variant::Double(1.0))),
            })))
            .unwrap();
        let limits = Limits::default();
        // Denied read access yields BadUserAccessDenied, which is on the
        // creation whitelist (§4.12): creation still succeeds.
        let item = MonitoredItem::create(
            &store,
            &limits,
            1,
            &create_request(node_id, MonitoringFilter::default()),
            TimestampsToReturn::Both,
            now(),
        )
        .unwrap();
        assert_eq!(item.sampling_interval, 50.0);
    }

    #[test]
    fn create_aborts_on_disallowed_status() {
        let missing_node_id = NodeId::new(1, 999u32);
        let store = NodeStore::new();
        let limits = Limits::default();
        let result = MonitoredItem::create(
            &store,
            &limits,
            1,
            &create_request(missing_node_id, MonitoringFilter::default()),
            TimestampsToReturn::Both,
            now(),
        );
        assert_eq!(result.unwrap_err(), StatusCode::BadNodeIdUnknown);
    }

    #[test]
    fn percent_deadband_rejects_non_numeric_node() {
        let store = NodeStore::new();
        let node_id = NodeId::new(1, 12u32);
        store
            .insert(Node::Variable(Box::new(VariableNode {
                base: Base::new(node_id.clone(), "v", "v"),
                data_type: NodeId::new(0, object_id::STRING),
                value_rank: -1,
                array_dimensions: None,
                access_level: AccessLevel::CURRENT_READ,
                user_access_level: AccessLevel::CURRENT_READ,
                minimum_sampling_interval: 0.0,
                historizing: false,
                value: ValueSource::new(DataValue::new_now(Variant::String("x".into()))),
            })))
            .unwrap();
        let limits = Limits::default();
        let filter = MonitoringFilter::DataChange(DataChangeFilter {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Percent(10.0),
        });
        let result = MonitoredItem::create(&store, &limits, 1, &create_request(node_id, filter), TimestampsToReturn::Both, now());
        assert_eq!(result.unwrap_err(), StatusCode::BadInvalidArgument);
    }

    #[test]
    fn absolute_deadband_suppresses_small_changes() {
        let (store, node_id) = variable_store(Variant::Double(10.0), 0.0);
        let limits = Limits::default();
        let filter = MonitoringFilter::DataChange(DataChangeFilter {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Absolute(1.0),
        });
        let mut item = MonitoredItem::create(&store, &limits, 1, &create_request(node_id.clone(), filter), TimestampsToReturn::Both, now()).unwrap();

        item.sample(&store, now());
        assert!(item.take_notifications().is_empty());

        attribute::write_value(&store, &node_id, AttributeId::Value, &NumericRange::default(), &DataValue::new_now(Variant::Double(10.5)));
        item.sample(&store, now());
        assert!(item.take_notifications().is_empty(), "change within deadband should not notify");

        attribute::write_value(&store, &node_id, AttributeId::Value, &NumericRange::default(), &DataValue::new_now(Variant::Double(12.0)));
        item.sample(&store, now());
        assert_eq!(item.take_notifications().len(), 1, "change beyond deadband should notify");
    }

    #[test]
    fn queue_overflow_sets_info_bit_and_discards_oldest() {
        let (store, node_id) = variable_store(Variant::Double(0.0), 0.0);
        let limits = Limits::default();
        let mut req = create_request(node_id.clone(), MonitoringFilter::default());
        req.requested_parameters.queue_size = 1;
        let mut item = MonitoredItem::create(&store, &limits, 1, &req, TimestampsToReturn::Both, now()).unwrap();
        assert_eq!(item.queue_size, 1);

        for v in [1.0, 2.0, 3.0] {
            attribute::write_value(&store, &node_id, AttributeId::Value, &NumericRange::default(), &DataValue::new_now(Variant::Double(v)));
            item.sample(&store, now());
        }
        let notifications = item.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].value.value, Some(Variant::Double(3.0)));
        assert!(notifications[0].overflow);
    }

    #[test]
    fn set_monitoring_mode_disabled_clears_queue() {
        let (store, node_id) = variable_store(Variant::Double(0.0), 0.0);
        let limits = Limits::default();
        let mut item = MonitoredItem::create(&store, &limits, 1, &create_request(node_id.clone(), MonitoringFilter::default()), TimestampsToReturn::Both, now()).unwrap();
        attribute::write_value(&store, &node_id, AttributeId::Value, &NumericRange::default(), &DataValue::new_now(Variant::Double(1.0)));
        item.sample(&store, now());
        assert!(item.has_pending());
        item.set_monitoring_mode(MonitoringMode::Disabled);
        assert!(!item.has_pending());
    }
}
