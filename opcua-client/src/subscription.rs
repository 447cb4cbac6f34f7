// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Client-side bookkeeping for subscriptions and monitored items (§4.13):
//! the local mirror of what the server told us it created, kept around so
//! a reconnect or a `Republish` can be reconciled against it.

use hashbrown::HashMap;

use opcua_types::service_types::{MonitoringMode, ReadValueId};
use opcua_types::{AttributeId, NodeId};

/// The client's local record of one monitored item, as revised by the
/// server's `MonitoredItemCreateResult`/`MonitoredItemModifyResult`.
#[derive(Debug, Clone)]
pub struct MonitoredItem {
    id: u32,
    client_handle: u32,
    item_to_monitor: ReadValueId,
    monitoring_mode: MonitoringMode,
    sampling_interval: f64,
    queue_size: u32,
    discard_oldest: bool,
}

impl MonitoredItem {
    pub fn new(client_handle: u32, item_to_monitor: ReadValueId) -> Self {
        Self {
            id: 0,
            client_handle,
            item_to_monitor,
            monitoring_mode: MonitoringMode::Reporting,
            sampling_interval: 0.0,
            queue_size: 1,
            discard_oldest: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    pub fn item_to_monitor(&self) -> &ReadValueId {
        &self.item_to_monitor
    }

    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    pub fn queue_size(&self) -> u32 {
        self.queue_size
    }

    pub fn discard_oldest(&self) -> bool {
        self.discard_oldest
    }

    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.monitoring_mode
    }

    /// Applies the server's assigned id and revised parameters, as returned
    /// from a `MonitoredItemCreateResult`.
    pub fn set_created(&mut self, id: u32, revised_sampling_interval: f64, revised_queue_size: u32) {
        self.id = id;
        self.sampling_interval = revised_sampling_interval;
        self.queue_size = revised_queue_size;
    }

    pub fn set_monitoring_mode(&mut self, mode: MonitoringMode) {
        self.monitoring_mode = mode;
    }
}

/// The client's local record of one subscription: the server-revised
/// parameters plus every monitored item created on it so far.
#[derive(Debug)]
pub struct Subscription {
    subscription_id: u32,
    publishing_interval: f64,
    lifetime_count: u32,
    max_keep_alive_count: u32,
    max_notifications_per_publish: u32,
    priority: u8,
    publishing_enabled: bool,
    monitored_items: HashMap<u32, MonitoredItem>,
    client_handles: HashMap<u32, u32>,
    next_client_handle: u32,
}

impl Subscription {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscription_id: u32,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        max_notifications_per_publish: u32,
        priority: u8,
        publishing_enabled: bool,
    ) -> Self {
        Self {
            subscription_id,
            publishing_interval,
            lifetime_count,
            max_keep_alive_count,
            max_notifications_per_publish,
            priority,
            publishing_enabled,
            monitored_items: HashMap::new(),
            client_handles: HashMap::new(),
            next_client_handle: 1,
        }
    }

    pub fn subscription_id(&self) -> u32 {
        self.subscription_id
    }

    pub fn publishing_interval(&self) -> f64 {
        self.publishing_interval
    }

    pub fn lifetime_count(&self) -> u32 {
        self.lifetime_count
    }

    pub fn max_keep_alive_count(&self) -> u32 {
        self.max_keep_alive_count
    }

    pub fn max_notifications_per_publish(&self) -> u32 {
        self.max_notifications_per_publish
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn publishing_enabled(&self) -> bool {
        self.publishing_enabled
    }

    pub fn monitored_items(&self) -> &HashMap<u32, MonitoredItem> {
        &self.monitored_items
    }

    /// Allocates the next free client handle, for a monitored item about to
    /// be sent in a `CreateMonitoredItemsRequest`.
    pub fn next_client_handle(&mut self) -> u32 {
        let handle = self.next_client_handle;
        self.next_client_handle += 1;
        handle
    }

    /// Records a monitored item once its create result has come back from
    /// the server, keyed by the server-assigned id.
    pub fn insert_created_item(&mut self, item: MonitoredItem) {
        self.client_handles.insert(item.client_handle(), item.id());
        self.monitored_items.insert(item.id(), item);
    }

    pub fn remove_item(&mut self, id: u32) -> Option<MonitoredItem> {
        let item = self.monitored_items.remove(&id)?;
        self.client_handles.remove(&item.client_handle());
        Some(item)
    }

    pub fn item_by_client_handle(&self, client_handle: u32) -> Option<&MonitoredItem> {
        let id = self.client_handles.get(&client_handle)?;
        self.monitored_items.get(id)
    }

    /// Applies the revised parameters from a `ModifySubscriptionResponse`.
    pub fn apply_modify(
        &mut self,
        revised_publishing_interval: f64,
        revised_lifetime_count: u32,
        revised_max_keep_alive_count: u32,
    ) {
        self.publishing_interval = revised_publishing_interval;
        self.lifetime_count = revised_lifetime_count;
        self.max_keep_alive_count = revised_max_keep_alive_count;
    }

    pub fn set_publishing_enabled(&mut self, enabled: bool) {
        self.publishing_enabled = enabled;
    }
}

/// Every subscription the client currently owns, keyed by subscription id.
#[derive(Debug, Default)]
pub struct SubscriptionState {
    subscriptions: HashMap<u32, Subscription>,
}

impl SubscriptionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subscription: Subscription) {
        self.subscriptions.insert(subscription.subscription_id(), subscription);
    }

    pub fn get(&self, subscription_id: u32) -> Option<&Subscription> {
        self.subscriptions.get(&subscription_id)
    }

    pub fn get_mut(&mut self, subscription_id: u32) -> Option<&mut Subscription> {
        self.subscriptions.get_mut(&subscription_id)
    }

    pub fn remove(&mut self, subscription_id: u32) -> Option<Subscription> {
        self.subscriptions.remove(&subscription_id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.subscriptions.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(handle: u32) -> MonitoredItem {
        MonitoredItem::new(handle, ReadValueId::new(NodeId::null(), AttributeId::Value))
    }

    #[test]
    fn client_handle_allocation_is_sequential() {
        let mut sub = Subscription::new(1, 500.0, 120, 30, 0, 0, true);
        assert_eq!(sub.next_client_handle(), 1);
        assert_eq!(sub.next_client_handle(), 2);
    }

    #[test]
    fn created_items_are_reachable_by_client_handle_and_id() {
        let mut sub = Subscription::new(1, 500.0, 120, 30, 0, 0, true);
        let handle = sub.next_client_handle();
        let mut mi = item(handle);
        mi.set_created(77, 500.0, 10);
        sub.insert_created_item(mi);

        assert_eq!(sub.item_by_client_handle(handle).unwrap().id(), 77);
        assert!(sub.monitored_items().contains_key(&77));
    }

    #[test]
    fn removing_an_item_drops_its_handle_mapping_too() {
        let mut sub = Subscription::new(1, 500.0, 120, 30, 0, 0, true);
        let handle = sub.next_client_handle();
        let mut mi = item(handle);
        mi.set_created(5, 500.0, 1);
        sub.insert_created_item(mi);

        assert!(sub.remove_item(5).is_some());
        assert!(sub.item_by_client_handle(handle).is_none());
    }

    #[test]
    fn subscription_state_tracks_every_owned_subscription() {
        let mut state = SubscriptionState::new();
        state.insert(Subscription::new(1, 500.0, 120, 30, 0, 0, true));
        state.insert(Subscription::new(2, 1000.0, 120, 30, 0, 0, true));
        assert_eq!(state.len(), 2);
        let mut ids = state.ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert!(state.remove(1).is_some());
        assert_eq!(state.len(), 1);
    }
}
