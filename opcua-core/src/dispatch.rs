// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Service dispatch scaffolding: the typed request/response envelope a
//! [`Connection`](crate::connection::Connection) hands to whatever
//! implements [`Dispatcher`] (`opcua-server`'s session/service layer), and
//! back again.

use async_trait::async_trait;
use opcua_types::service_types::*;

/// Everything a service handler needs to know about the request besides its
/// typed body: which channel and (if any) session it arrived on.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The channel the request was decoded from.
    pub secure_channel_id: u32,
    /// The session bound to `request_header.authentication_token`, if any
    /// (resolved by the caller before dispatch; `None` for
    /// CreateSession/OpenSecureChannel which precede session binding).
    pub session_id: Option<opcua_types::Guid>,
    /// Wall-clock time the request was received, used for session/subscription
    /// timeout bookkeeping.
    pub now: chrono::DateTime<chrono::Utc>,
}

/// One incoming service request, tagged by which service it invokes. Holding
/// every request type in one enum lets a `Connection` stay transport-generic
/// without knowing about individual services.
#[derive(Debug, Clone)]
pub enum ServiceRequest {
    /// OpenSecureChannel.
    OpenSecureChannel(OpenSecureChannelRequest),
    /// CloseSecureChannel.
    CloseSecureChannel(CloseSecureChannelRequest),
    /// CreateSession.
    CreateSession(CreateSessionRequest),
    /// ActivateSession.
    ActivateSession(ActivateSessionRequest),
    /// CloseSession.
    CloseSession(CloseSessionRequest),
    /// Read.
    Read(ReadRequest),
    /// Write.
    Write(WriteRequest),
    /// Browse.
    Browse(BrowseRequest),
    /// BrowseNext.
    BrowseNext(BrowseNextRequest),
    /// TranslateBrowsePathsToNodeIds.
    TranslateBrowsePaths(TranslateBrowsePathsToNodeIdsRequest),
    /// AddNodes.
    AddNodes(AddNodesRequest),
    /// DeleteNodes.
    DeleteNodes(DeleteNodesRequest),
    /// AddReferences.
    AddReferences(AddReferencesRequest),
    /// DeleteReferences.
    DeleteReferences(DeleteReferencesRequest),
    /// Call.
    Call(CallRequest),
    /// CreateSubscription.
    CreateSubscription(CreateSubscriptionRequest),
    /// ModifySubscription.
    ModifySubscription(ModifySubscriptionRequest),
    /// SetPublishingMode.
    SetPublishingMode(SetPublishingModeRequest),
    /// DeleteSubscriptions.
    DeleteSubscriptions(DeleteSubscriptionsRequest),
    /// CreateMonitoredItems.
    CreateMonitoredItems(CreateMonitoredItemsRequest),
    /// ModifyMonitoredItems.
    ModifyMonitoredItems(ModifyMonitoredItemsRequest),
    /// SetMonitoringMode.
    SetMonitoringMode(SetMonitoringModeRequest),
    /// DeleteMonitoredItems.
    DeleteMonitoredItems(DeleteMonitoredItemsRequest),
    /// Publish.
    Publish(PublishRequest),
    /// Republish.
    Republish(RepublishRequest),
}

/// The matching response for each [`ServiceRequest`] variant.
#[derive(Debug, Clone)]
pub enum ServiceResponse {
    /// OpenSecureChannel.
    OpenSecureChannel(OpenSecureChannelResponse),
    /// CloseSecureChannel: per §4.9 no response is ever emitted, but the
    /// dispatcher still returns a marker so the connection loop can log and
    /// move on to tearing down the channel.
    CloseSecureChannel,
    /// CreateSession.
    CreateSession(CreateSessionResponse),
    /// ActivateSession.
    ActivateSession(ActivateSessionResponse),
    /// CloseSession.
    CloseSession(CloseSessionResponse),
    /// Read.
    Read(ReadResponse),
    /// Write.
    Write(WriteResponse),
    /// Browse.
    Browse(BrowseResponse),
    /// BrowseNext.
    BrowseNext(BrowseNextResponse),
    /// TranslateBrowsePathsToNodeIds.
    TranslateBrowsePaths(TranslateBrowsePathsToNodeIdsResponse),
    /// AddNodes.
    AddNodes(AddNodesResponse),
    /// DeleteNodes.
    DeleteNodes(DeleteNodesResponse),
    /// AddReferences.
    AddReferences(AddReferencesResponse),
    /// DeleteReferences.
    DeleteReferences(DeleteReferencesResponse),
    /// Call.
    Call(CallResponse),
    /// CreateSubscription.
    CreateSubscription(CreateSubscriptionResponse),
    /// ModifySubscription.
    ModifySubscription(ModifySubscriptionResponse),
    /// SetPublishingMode.
    SetPublishingMode(SetPublishingModeResponse),
    /// DeleteSubscriptions.
    DeleteSubscriptions(DeleteSubscriptionsResponse),
    /// CreateMonitoredItems.
    CreateMonitoredItems(CreateMonitoredItemsResponse),
    /// ModifyMonitoredItems.
    ModifyMonitoredItems(ModifyMonitoredItemsResponse),
    /// SetMonitoringMode.
    SetMonitoringMode(SetMonitoringModeResponse),
    /// DeleteMonitoredItems.
    DeleteMonitoredItems(DeleteMonitoredItemsResponse),
    /// Publish.
    Publish(PublishResponse),
    /// Republish.
    Republish(RepublishResponse),
}

/// Implemented by whatever owns the server's shared state (NodeStore,
/// SessionManager, SecureChannelManager, subscriptions) to turn one
/// [`ServiceRequest`] into its [`ServiceResponse`]. `opcua-server` provides
/// the implementation; this crate only defines the seam so the transport
/// layer can stay decoupled from service logic.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Handle one request, using `context` to resolve the channel/session it
    /// arrived on.
    async fn dispatch(&self, context: &RequestContext, request: ServiceRequest) -> ServiceResponse;
}
