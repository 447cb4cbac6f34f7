// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The event path (§4.12, spec.md: "the server's event emitter traverses
//! `HasNotifier`/`HasEventSource` up-references to reach MonitoredItems on
//! EventNotifier attributes"). An [`Event`] is raised at a source node;
//! [`SubscriptionManager::raise_event`] ascends from there, evaluates each
//! candidate item's where-clause, and enqueues the select-clause fields on
//! every match.
//!
//! This core has no generated event-type hierarchy, so an event's fields are
//! a flat bag keyed by the joined browse-name path a `SimpleAttributeOperand`
//! names — enough to evaluate the generic `BaseEventType` fields (Message,
//! Severity, SourceNode, Time, ...) the standard's event model is built on.

use hashbrown::{HashMap, HashSet};

use opcua_nodes::{hierarchy, NodeStore};
use opcua_types::{
    constants::object_id,
    service_types::{ContentFilterElement, ContentFilterOperand, EventFilter, SimpleAttributeOperand},
    NodeId, Variant,
};

/// One event instance as raised at `source_node`: the event type it is an
/// instance of, and the field values a `SimpleAttributeOperand` may select.
#[derive(Debug, Clone)]
pub struct Event {
    pub source_node: NodeId,
    pub event_type: NodeId,
    fields: HashMap<String, Variant>,
}

impl Event {
    pub fn new(source_node: NodeId, event_type: NodeId) -> Self {
        Self {
            source_node,
            event_type,
            fields: HashMap::new(),
        }
    }

    /// Sets one field, keyed by its plain (single-segment) browse name —
    /// the common case for `BaseEventType` fields like `Message` or
    /// `Severity`.
    pub fn with_field(mut self, name: &str, value: Variant) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    fn field(&self, operand: &SimpleAttributeOperand) -> Variant {
        let key = browse_path_key(&operand.browse_path);
        self.fields.get(&key).cloned().unwrap_or(Variant::Empty)
    }
}

fn browse_path_key(browse_path: &[opcua_types::QualifiedName]) -> String {
    browse_path.iter().map(|q| q.to_string()).collect::<Vec<_>>().join("/")
}

/// The node ids reached by ascending `HasNotifier`/`HasEventSource` inverse
/// references from `source`, including `source` itself — every node whose
/// EventNotifier-attribute MonitoredItems should be offered this event.
/// Bounded by the store's reference-type count so a malformed store (a
/// notifier cycle) can't loop forever.
pub fn notifier_ancestors(store: &NodeStore, source: &NodeId) -> Vec<NodeId> {
    let has_notifier = NodeId::new(0, object_id::HAS_NOTIFIER);
    let has_event_source = NodeId::new(0, object_id::HAS_EVENT_SOURCE);

    let mut seen = HashSet::new();
    let mut frontier = vec![source.clone()];
    seen.insert(source.clone());
    let bound = store.reference_type_count().max(1) + 64;

    for _ in 0..bound {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for node in frontier.drain(..) {
            let Some(refs) = store.iter_references(&node) else {
                continue;
            };
            for r in refs.iter().filter(|r| {
                r.is_inverse && (r.reference_type_id == has_notifier || r.reference_type_id == has_event_source)
            }) {
                let parent = r.target_id.node_id.clone();
                if seen.insert(parent.clone()) {
                    next.push(parent);
                }
            }
        }
        frontier = next;
    }
    seen.into_iter().collect()
}

/// Evaluates an `EventFilter`'s where-clause against `event`, then extracts
/// its select-clause fields if the event matches. `None` if the where-clause
/// rejects the event.
pub fn apply_filter(store: &NodeStore, filter: &EventFilter, event: &Event) -> Option<Vec<Variant>> {
    if !evaluate_where(store, &filter.where_clause, event) {
        return None;
    }
    Some(filter.select_clauses.iter().map(|op| event.field(op)).collect())
}

fn evaluate_where(store: &NodeStore, where_clause: &[ContentFilterElement], event: &Event) -> bool {
    match where_clause.first() {
        None => true,
        Some(element) => evaluate_element(store, element, event),
    }
}

fn evaluate_element(store: &NodeStore, element: &ContentFilterElement, event: &Event) -> bool {
    match element {
        ContentFilterElement::And(a, b) => as_bool(event, a) && as_bool(event, b),
        ContentFilterElement::Or(a, b) => as_bool(event, a) || as_bool(event, b),
        ContentFilterElement::Equals(a, b) => resolve(event, a) == resolve(event, b),
        ContentFilterElement::OfType(type_id) => hierarchy::is_subtype_or_same(store, &event.event_type, type_id),
    }
}

fn as_bool(event: &Event, operand: &ContentFilterOperand) -> bool {
    matches!(resolve(event, operand), Variant::Boolean(true))
}

fn resolve(event: &Event, operand: &ContentFilterOperand) -> Variant {
    match operand {
        ContentFilterOperand::Literal(v) => v.clone(),
        ContentFilterOperand::Attribute(simple) => event.field(simple),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_nodes::node::{Base, Node, ObjectNode};
    use opcua_types::{AttributeId, QualifiedName};

    fn object(id: u32, name: &str) -> Node {
        Node::Object(Box::new(ObjectNode {
            base: Base::new(NodeId::new(1, id), name, name),
            event_notifier: 0,
        }))
    }

    fn select(name: &str) -> SimpleAttributeOperand {
        SimpleAttributeOperand {
            type_definition_id: NodeId::null(),
            browse_path: vec![QualifiedName::from(name)],
            attribute_id: AttributeId::Value,
        }
    }

    #[test]
    fn ascent_reaches_every_notifier_ancestor() {
        let store = NodeStore::new();
        let server = store.insert(object(1, "Server")).unwrap();
        let area = store.insert(object(2, "Area")).unwrap();
        let source = store.insert(object(3, "Sensor")).unwrap();

        let has_notifier = NodeId::new(0, object_id::HAS_NOTIFIER);
        store.add_reference_pair(&server, &has_notifier, &area).unwrap();
        store.add_reference_pair(&area, &has_notifier, &source).unwrap();

        let mut ancestors = notifier_ancestors(&store, &source);
        ancestors.sort_by_key(|n| n.to_string());
        let mut expected = vec![source.clone(), area.clone(), server.clone()];
        expected.sort_by_key(|n| n.to_string());
        assert_eq!(ancestors, expected);
    }

    #[test]
    fn where_clause_rejects_a_non_matching_event() {
        let store = NodeStore::new();
        let event = Event::new(NodeId::new(1, 3), NodeId::new(0, 2041))
            .with_field("Severity", Variant::Int32(100));
        let filter = EventFilter {
            select_clauses: vec![select("Message")],
            where_clause: vec![ContentFilterElement::Equals(
                Box::new(ContentFilterOperand::Attribute(select("Severity"))),
                Box::new(ContentFilterOperand::Literal(Variant::Int32(500))),
            )],
        };
        assert!(apply_filter(&store, &filter, &event).is_none());
    }

    #[test]
    fn matching_event_yields_selected_fields_in_order() {
        let store = NodeStore::new();
        let event = Event::new(NodeId::new(1, 3), NodeId::new(0, 2041))
            .with_field("Severity", Variant::Int32(500))
            .with_field("Message", Variant::String("overload".into()));
        let filter = EventFilter {
            select_clauses: vec![select("Message"), select("Severity")],
            where_clause: vec![ContentFilterElement::Equals(
                Box::new(ContentFilterOperand::Attribute(select("Severity"))),
                Box::new(ContentFilterOperand::Literal(Variant::Int32(500))),
            )],
        };
        let fields = apply_filter(&store, &filter, &event).unwrap();
        assert_eq!(fields, vec![Variant::String("overload".into()), Variant::Int32(500)]);
    }

    #[test]
    fn empty_where_clause_matches_everything() {
        let store = NodeStore::new();
        let event = Event::new(NodeId::new(1, 3), NodeId::new(0, 2041));
        let filter = EventFilter {
            select_clauses: vec![],
            where_clause: vec![],
        };
        assert!(apply_filter(&store, &filter, &event).is_some());
    }
}
