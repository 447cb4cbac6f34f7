// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! The server side of the core: owns the address space, session table,
//! secure channel table and subscription engine, and implements
//! [`opcua_core::Dispatcher`] to turn one [`ServiceRequest`] into its
//! [`ServiceResponse`] (§4.4–§4.12).
//!
//! [`OpcUaServer::run_iterate`] is the cooperative tick a transport/runtime
//! loop calls periodically to drive everything that happens independently of
//! an incoming request: publishing cycles, session/channel timeout sweeps,
//! and parked-Publish-request timeouts (§5, §C.4).

pub mod config;
pub mod diagnostics;
pub mod services;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcua_core::{Dispatcher, RequestContext, SecureChannelManager, ServiceRequest, ServiceResponse};
use opcua_nodes::NodeStore;
use opcua_types::{Identifier, StatusCode};

pub use config::{EndpointDescription, Limits, ServerConfig};
pub use diagnostics::{ServiceCounter, ServiceCounters, SessionDiagnostics};
pub use session::{ContinuationPoint, PendingPublish, Session, SessionManager};
pub use services::subscription::SubscriptionManager;

/// Owns every piece of shared server state and answers [`ServiceRequest`]s
/// against it. One instance serves every channel/session the embedder hands
/// it; the embedder supplies transport, wire codec and connection
/// multiplexing (§E, Non-goals).
pub struct OpcUaServer {
    /// The address space.
    pub store: NodeStore,
    /// Config: endpoints plus engine-wide limits.
    pub config: ServerConfig,
    /// Secure channels.
    pub channels: SecureChannelManager,
    /// Sessions.
    pub sessions: SessionManager,
    /// Subscriptions and their MonitoredItems.
    pub subscriptions: SubscriptionManager,
    /// Per-service request/error counters (§C.1).
    pub counters: ServiceCounters,
}

impl OpcUaServer {
    /// A fresh server over an empty address space, with `config` controlling
    /// endpoints and engine limits.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: NodeStore::new(),
            config,
            channels: SecureChannelManager::new(),
            sessions: SessionManager::new(),
            subscriptions: SubscriptionManager::new(),
            counters: ServiceCounters::new(),
        }
    }

    fn session_for(&self, context: &RequestContext) -> Result<Arc<Session>, StatusCode> {
        self.sessions.require(context.session_id.as_ref())
    }

    /// Drive everything that advances independently of an incoming request:
    /// publishing ticks for every session, expiry sweeps for channels and
    /// sessions, and timeout of parked PublishRequests. Returns the
    /// PublishResponses that became due this tick, paired with the session
    /// that should receive them (§5, §C.4).
    pub fn run_iterate(&self, now: DateTime<Utc>) -> Vec<(opcua_types::Guid, opcua_types::service_types::PublishResponse)> {
        let mut due = Vec::new();

        for channel_id in self.channels.sweep_expired(now) {
            self.sessions.detach_channel(channel_id);
        }

        for session in self.sessions.sweep_expired(now) {
            for pending in session.drain_publish_requests() {
                due.push((guid_of(&session), timeout_publish_response(pending, now)));
            }
        }

        for guid in self.sessions.guids() {
            let Some(session) = self.sessions.get(&guid) else { continue };
            self.subscriptions.tick_session(&self.store, &session, now);
            for (_subscription_id, message) in self.subscriptions.mark_late_and_expire(&session, now) {
                due.push((guid, status_change_publish_response(message)));
            }
            while let Some(pending) = session.take_publish() {
                match self.subscriptions.answer_pending(&session, pending.clone(), now) {
                    Some(response) => due.push((guid, response)),
                    None => {
                        // Nothing ready yet: put it back and stop draining
                        // this session's queue for this tick.
                        let _ = session.enqueue_publish(pending);
                        break;
                    }
                }
            }
            for pending in session.expire_publish_requests(now) {
                due.push((guid, timeout_publish_response(pending, now)));
            }
        }

        due
    }
}

fn session_guid(context: &RequestContext) -> Option<opcua_types::Guid> {
    context.session_id
}

fn guid_of(session: &Session) -> opcua_types::Guid {
    match session.authentication_token.identifier {
        Identifier::Guid(g) => g,
        _ => opcua_types::Guid::default(),
    }
}

fn timeout_publish_response(pending: PendingPublish, now: DateTime<Utc>) -> opcua_types::service_types::PublishResponse {
    opcua_types::service_types::PublishResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(
            &opcua_types::service_types::RequestHeader {
                request_handle: pending.request_handle,
                ..Default::default()
            },
            StatusCode::BadTimeout,
        ),
        subscription_id: 0,
        available_sequence_numbers: Vec::new(),
        more_notifications: false,
        notification_message: opcua_types::service_types::NotificationMessage::keep_alive(0, now),
        results: Vec::new(),
    }
}

fn status_change_publish_response(message: opcua_types::service_types::NotificationMessage) -> opcua_types::service_types::PublishResponse {
    opcua_types::service_types::PublishResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(
            &opcua_types::service_types::RequestHeader::default(),
            StatusCode::Good,
        ),
        subscription_id: 0,
        available_sequence_numbers: Vec::new(),
        more_notifications: false,
        notification_message: message,
        results: Vec::new(),
    }
}

#[async_trait]
impl Dispatcher for OpcUaServer {
    async fn dispatch(&self, context: &RequestContext, request: ServiceRequest) -> ServiceResponse {
        let service_name = service_name(&request);
        let response = self.dispatch_inner(context, request).await;
        self.counters.record(service_name, is_ok(&response));
        if let Some(guid) = session_guid(context) {
            if let Some(session) = self.sessions.get(&guid) {
                session.diagnostics.record(is_ok(&response));
            }
        }
        response
    }
}

impl OpcUaServer {
    async fn dispatch_inner(&self, context: &RequestContext, request: ServiceRequest) -> ServiceResponse {
        match request {
            ServiceRequest::OpenSecureChannel(req) => {
                let channel_id = if services::channel::requires_existing_channel(req.request_type) {
                    Some(context.secure_channel_id)
                } else {
                    None
                };
                match services::channel::open_secure_channel(&self.channels, channel_id, req, context.now) {
                    Ok(response) => ServiceResponse::OpenSecureChannel(response),
                    Err(status) => ServiceResponse::OpenSecureChannel(error_open_secure_channel(status)),
                }
            }
            ServiceRequest::CloseSecureChannel(req) => {
                services::channel::close_secure_channel(&self.channels, context.secure_channel_id, req);
                ServiceResponse::CloseSecureChannel
            }
            ServiceRequest::CreateSession(req) => {
                let response = services::session::create_session(
                    &self.sessions,
                    &self.config.limits,
                    &self.config.endpoints,
                    req,
                    context.now,
                );
                ServiceResponse::CreateSession(response)
            }
            ServiceRequest::ActivateSession(req) => match self.session_for(context) {
                Ok(session) => match services::session::activate_session(&session, context.secure_channel_id, req, context.now) {
                    Ok(response) => ServiceResponse::ActivateSession(response),
                    Err(status) => ServiceResponse::ActivateSession(error_activate_session(status)),
                },
                Err(status) => ServiceResponse::ActivateSession(error_activate_session(status)),
            },
            ServiceRequest::CloseSession(req) => {
                let guid = session_guid(context).unwrap_or_default();
                let (response, session) = services::session::close_session(&self.sessions, guid, req);
                if let Some(session) = session {
                    for id in session.subscription_ids() {
                        self.subscriptions.delete_subscriptions(
                            &session,
                            opcua_types::service_types::DeleteSubscriptionsRequest {
                                request_header: Default::default(),
                                subscription_ids: vec![id],
                            },
                        );
                    }
                }
                ServiceResponse::CloseSession(response)
            }
            ServiceRequest::Read(req) => {
                ServiceResponse::Read(services::attribute::read(&self.store, req, context.now))
            }
            ServiceRequest::Write(req) => ServiceResponse::Write(services::attribute::write(&self.store, req)),
            ServiceRequest::Browse(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::Browse(services::view::browse(&self.store, &session, req)),
                Err(status) => ServiceResponse::Browse(opcua_types::service_types::BrowseResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: Vec::new(),
                }),
            },
            ServiceRequest::BrowseNext(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::BrowseNext(services::view::browse_next(&session, req)),
                Err(status) => ServiceResponse::BrowseNext(opcua_types::service_types::BrowseNextResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: Vec::new(),
                }),
            },
            ServiceRequest::TranslateBrowsePaths(req) => ServiceResponse::TranslateBrowsePaths(
                services::view::translate_browse_paths_to_node_ids(&self.store, req),
            ),
            ServiceRequest::AddNodes(req) => {
                ServiceResponse::AddNodes(services::node_management::add_nodes(&self.store, req))
            }
            ServiceRequest::DeleteNodes(req) => {
                ServiceResponse::DeleteNodes(services::node_management::delete_nodes(&self.store, req))
            }
            ServiceRequest::AddReferences(req) => {
                ServiceResponse::AddReferences(services::node_management::add_references(&self.store, req))
            }
            ServiceRequest::DeleteReferences(req) => {
                ServiceResponse::DeleteReferences(services::node_management::delete_references(&self.store, req))
            }
            ServiceRequest::Call(req) => ServiceResponse::Call(services::method::call(&self.store, req).await),
            ServiceRequest::CreateSubscription(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::CreateSubscription(self.subscriptions.create_subscription(
                    &session,
                    &self.config.limits,
                    req,
                )),
                Err(status) => ServiceResponse::CreateSubscription(opcua_types::service_types::CreateSubscriptionResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    subscription_id: 0,
                    revised_publishing_interval: 0.0,
                    revised_lifetime_count: 0,
                    revised_max_keep_alive_count: 0,
                }),
            },
            ServiceRequest::ModifySubscription(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::ModifySubscription(self.subscriptions.modify_subscription(
                    &session,
                    &self.config.limits,
                    req,
                )),
                Err(status) => ServiceResponse::ModifySubscription(opcua_types::service_types::ModifySubscriptionResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    revised_publishing_interval: 0.0,
                    revised_lifetime_count: 0,
                    revised_max_keep_alive_count: 0,
                }),
            },
            ServiceRequest::SetPublishingMode(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::SetPublishingMode(self.subscriptions.set_publishing_mode(&session, req)),
                Err(status) => ServiceResponse::SetPublishingMode(opcua_types::service_types::SetPublishingModeResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: req.subscription_ids.iter().map(|_| status).collect(),
                }),
            },
            ServiceRequest::DeleteSubscriptions(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::DeleteSubscriptions(self.subscriptions.delete_subscriptions(&session, req)),
                Err(status) => ServiceResponse::DeleteSubscriptions(opcua_types::service_types::DeleteSubscriptionsResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: req.subscription_ids.iter().map(|_| status).collect(),
                }),
            },
            ServiceRequest::CreateMonitoredItems(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::CreateMonitoredItems(self.subscriptions.create_monitored_items(
                    &self.store,
                    &session,
                    &self.config.limits,
                    req,
                    context.now,
                )),
                Err(status) => ServiceResponse::CreateMonitoredItems(opcua_types::service_types::CreateMonitoredItemsResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: Vec::new(),
                }),
            },
            ServiceRequest::ModifyMonitoredItems(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::ModifyMonitoredItems(self.subscriptions.modify_monitored_items(
                    &self.store,
                    &session,
                    &self.config.limits,
                    req,
                )),
                Err(status) => ServiceResponse::ModifyMonitoredItems(opcua_types::service_types::ModifyMonitoredItemsResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: Vec::new(),
                }),
            },
            ServiceRequest::SetMonitoringMode(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::SetMonitoringMode(self.subscriptions.set_monitoring_mode(&session, req)),
                Err(status) => ServiceResponse::SetMonitoringMode(opcua_types::service_types::SetMonitoringModeResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: req.monitored_item_ids.iter().map(|_| status).collect(),
                }),
            },
            ServiceRequest::DeleteMonitoredItems(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::DeleteMonitoredItems(self.subscriptions.delete_monitored_items(&session, req)),
                Err(status) => ServiceResponse::DeleteMonitoredItems(opcua_types::service_types::DeleteMonitoredItemsResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    results: req.monitored_item_ids.iter().map(|_| status).collect(),
                }),
            },
            ServiceRequest::Publish(req) => match self.session_for(context) {
                Ok(session) => match services::subscription::handle_publish(&self.subscriptions, &session, req.clone(), context.now) {
                    Ok(Some(response)) => ServiceResponse::Publish(response),
                    Ok(None) => ServiceResponse::Publish(parked_publish_placeholder(&req)),
                    Err(status) => ServiceResponse::Publish(error_publish(&req, status)),
                },
                Err(status) => ServiceResponse::Publish(error_publish(&req, status)),
            },
            ServiceRequest::Republish(req) => match self.session_for(context) {
                Ok(session) => ServiceResponse::Republish(self.subscriptions.republish(&session, req)),
                Err(status) => ServiceResponse::Republish(opcua_types::service_types::RepublishResponse {
                    response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
                    notification_message: opcua_types::service_types::NotificationMessage::keep_alive(0, context.now),
                }),
            },
        }
    }
}

/// A PublishRequest that was parked rather than answered immediately carries
/// no response back to the transport layer this tick; the connection loop is
/// expected to hold the request open and deliver the eventual response
/// produced by [`OpcUaServer::run_iterate`] once it becomes due (§C.4).
fn parked_publish_placeholder(req: &opcua_types::service_types::PublishRequest) -> opcua_types::service_types::PublishResponse {
    opcua_types::service_types::PublishResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, StatusCode::Good),
        subscription_id: 0,
        available_sequence_numbers: Vec::new(),
        more_notifications: false,
        notification_message: opcua_types::service_types::NotificationMessage::keep_alive(0, req.request_header.timestamp),
        results: Vec::new(),
    }
}

fn error_publish(
    req: &opcua_types::service_types::PublishRequest,
    status: StatusCode,
) -> opcua_types::service_types::PublishResponse {
    opcua_types::service_types::PublishResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(&req.request_header, status),
        subscription_id: 0,
        available_sequence_numbers: Vec::new(),
        more_notifications: false,
        notification_message: opcua_types::service_types::NotificationMessage::keep_alive(0, req.request_header.timestamp),
        results: Vec::new(),
    }
}

fn error_open_secure_channel(status: StatusCode) -> opcua_types::service_types::OpenSecureChannelResponse {
    opcua_types::service_types::OpenSecureChannelResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(
            &opcua_types::service_types::RequestHeader::default(),
            status,
        ),
        server_protocol_version: 0,
        security_token: opcua_types::service_types::ChannelSecurityToken {
            channel_id: 0,
            token_id: 0,
            created_at: Utc::now(),
            revised_lifetime: 0,
        },
        server_nonce: opcua_types::ByteString::null(),
    }
}

fn error_activate_session(status: StatusCode) -> opcua_types::service_types::ActivateSessionResponse {
    opcua_types::service_types::ActivateSessionResponse {
        response_header: opcua_types::service_types::ResponseHeader::new(
            &opcua_types::service_types::RequestHeader::default(),
            status,
        ),
        server_nonce: opcua_types::ByteString::null(),
    }
}

fn is_ok(response: &ServiceResponse) -> bool {
    use opcua_types::service_types::ResponseHeader;
    fn good(header: &ResponseHeader) -> bool {
        header.service_result == StatusCode::Good
    }
    match response {
        ServiceResponse::OpenSecureChannel(r) => good(&r.response_header),
        ServiceResponse::CloseSecureChannel => true,
        ServiceResponse::CreateSession(r) => good(&r.response_header),
        ServiceResponse::ActivateSession(r) => good(&r.response_header),
        ServiceResponse::CloseSession(r) => good(&r.response_header),
        ServiceResponse::Read(r) => good(&r.response_header),
        ServiceResponse::Write(r) => good(&r.response_header),
        ServiceResponse::Browse(r) => good(&r.response_header),
        ServiceResponse::BrowseNext(r) => good(&r.response_header),
        ServiceResponse::TranslateBrowsePaths(r) => good(&r.response_header),
        ServiceResponse::AddNodes(r) => good(&r.response_header),
        ServiceResponse::DeleteNodes(r) => good(&r.response_header),
        ServiceResponse::AddReferences(r) => good(&r.response_header),
        ServiceResponse::DeleteReferences(r) => good(&r.response_header),
        ServiceResponse::Call(r) => good(&r.response_header),
        ServiceResponse::CreateSubscription(r) => good(&r.response_header),
        ServiceResponse::ModifySubscription(r) => good(&r.response_header),
        ServiceResponse::SetPublishingMode(r) => good(&r.response_header),
        ServiceResponse::DeleteSubscriptions(r) => good(&r.response_header),
        ServiceResponse::CreateMonitoredItems(r) => good(&r.response_header),
        ServiceResponse::ModifyMonitoredItems(r) => good(&r.response_header),
        ServiceResponse::SetMonitoringMode(r) => good(&r.response_header),
        ServiceResponse::DeleteMonitoredItems(r) => good(&r.response_header),
        ServiceResponse::Publish(r) => good(&r.response_header),
        ServiceResponse::Republish(r) => good(&r.response_header),
    }
}

fn service_name(request: &ServiceRequest) -> &'static str {
    match request {
        ServiceRequest::OpenSecureChannel(_) => "OpenSecureChannel",
        ServiceRequest::CloseSecureChannel(_) => "CloseSecureChannel",
        ServiceRequest::CreateSession(_) => "CreateSession",
        ServiceRequest::ActivateSession(_) => "ActivateSession",
        ServiceRequest::CloseSession(_) => "CloseSession",
        ServiceRequest::Read(_) => "Read",
        ServiceRequest::Write(_) => "Write",
        ServiceRequest::Browse(_) => "Browse",
        ServiceRequest::BrowseNext(_) => "BrowseNext",
        ServiceRequest::TranslateBrowsePaths(_) => "TranslateBrowsePathsToNodeIds",
        ServiceRequest::AddNodes(_) => "AddNodes",
        ServiceRequest::DeleteNodes(_) => "DeleteNodes",
        ServiceRequest::AddReferences(_) => "AddReferences",
        ServiceRequest::DeleteReferences(_) => "DeleteReferences",
        ServiceRequest::Call(_) => "Call",
        ServiceRequest::CreateSubscription(_) => "CreateSubscription",
        ServiceRequest::ModifySubscription(_) => "ModifySubscription",
        ServiceRequest::SetPublishingMode(_) => "SetPublishingMode",
        ServiceRequest::DeleteSubscriptions(_) => "DeleteSubscriptions",
        ServiceRequest::CreateMonitoredItems(_) => "CreateMonitoredItems",
        ServiceRequest::ModifyMonitoredItems(_) => "ModifyMonitoredItems",
        ServiceRequest::SetMonitoringMode(_) => "SetMonitoringMode",
        ServiceRequest::DeleteMonitoredItems(_) => "DeleteMonitoredItems",
        ServiceRequest::Publish(_) => "Publish",
        ServiceRequest::Republish(_) => "Republish",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_types::service_types::{CreateSessionRequest, RequestHeader};
    use opcua_types::UAString;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn create_session_dispatches_and_records_a_counter() {
        let server = OpcUaServer::new(ServerConfig::default());
        let context = RequestContext {
            secure_channel_id: 1,
            session_id: None,
            now: now(),
        };
        let request = ServiceRequest::CreateSession(CreateSessionRequest {
            request_header: RequestHeader::default(),
            session_name: UAString::from("test"),
            requested_session_timeout: 60_000.0,
            max_response_message_size: 0,
        });
        let response = server.dispatch(&context, request).await;
        assert!(matches!(response, ServiceResponse::CreateSession(_)));
        assert_eq!(server.counters.snapshot("CreateSession"), (1, 0));
    }

    #[tokio::test]
    async fn read_without_a_session_is_rejected() {
        let server = OpcUaServer::new(ServerConfig::default());
        let context = RequestContext {
            secure_channel_id: 1,
            session_id: None,
            now: now(),
        };
        let request = ServiceRequest::Read(opcua_types::service_types::ReadRequest {
            request_header: RequestHeader::default(),
            nodes_to_read: Vec::new(),
            max_age: 0.0,
            timestamps_to_return: opcua_types::TimestampsToReturn::Both,
        });
        let response = server.dispatch(&context, request).await;
        match response {
            ServiceResponse::Read(r) => assert_eq!(r.response_header.service_result, StatusCode::BadSessionIdInvalid),
            _ => panic!("expected a Read response"),
        }
        assert_eq!(server.counters.snapshot("Read"), (1, 1));
    }
}
