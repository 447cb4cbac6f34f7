// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Session lifecycle (§4.10): `CreateSession`/`ActivateSession`/`CloseSession`,
//! the per-session ContinuationPoint table (§4.7, P7), and the timeout sweep.
//!
//! A session is identified two ways on the wire: `session_id` is the opaque
//! handle returned from `CreateSessionResponse` and never used again by the
//! client, while `authentication_token` is what every subsequent request
//! header carries to bind back to this session. We generate the token as a
//! `NodeId` wrapping a random [`Guid`], and key the manager's table by that
//! `Guid` directly since that's the form `RequestContext::session_id`
//! arrives in once the transport layer has extracted it from the header.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use opcua_types::service_types::IdentityToken;
use opcua_types::{ByteString, Guid, Identifier, NodeId, StatusCode};
use parking_lot::{Mutex, RwLock};

use crate::config::Limits;
use crate::diagnostics::SessionDiagnostics;

/// Unreturned Browse/BrowseNext results kept under one ContinuationPoint id,
/// handed back a page at a time until exhausted or released.
#[derive(Debug, Clone)]
pub struct ContinuationPoint {
    /// References not yet sent to the client, in order.
    pub remaining: Vec<opcua_types::service_types::ReferenceDescription>,
}

/// One queued `PublishRequest`, parked on the session until a subscription
/// has something to say (§4.11 "Requests are enqueued on the session").
#[derive(Debug, Clone)]
pub struct PendingPublish {
    /// Echoed back in the eventual response.
    pub request_handle: u32,
    /// Acknowledgements to apply once this request is serviced.
    pub subscription_acknowledgements: Vec<opcua_types::service_types::SubscriptionAcknowledgement>,
    /// Absolute deadline past which the request is answered with `BadTimeout`
    /// (§C.4, `request_header.timeout_hint`); `None` means no limit.
    pub deadline: Option<DateTime<Utc>>,
}

/// One active session. Fields a request handler needs to mutate (channel
/// binding, expiry, continuation points, subscription membership) use
/// interior mutability so the manager can hand out `Arc<Session>` without
/// forcing callers through a second lock on the whole table.
pub struct Session {
    /// Returned once, in `CreateSessionResponse::session_id`.
    pub session_id: NodeId,
    /// Returned once, in `CreateSessionResponse::authentication_token`, and
    /// expected back in every subsequent `RequestHeader`.
    pub authentication_token: NodeId,
    auth_guid: Guid,
    /// Client-supplied session name, for diagnostics.
    pub session_name: String,
    secure_channel_id: Mutex<Option<u32>>,
    activated: Mutex<bool>,
    identity: Mutex<IdentityToken>,
    valid_till: Mutex<DateTime<Utc>>,
    timeout_ms: f64,
    continuation_points: Mutex<HashMap<ByteString, ContinuationPoint>>,
    max_continuation_points: usize,
    /// Subscriptions owned by this session.
    pub subscription_ids: Mutex<Vec<u32>>,
    /// Request/error/resource counters for this session (§C.2).
    pub diagnostics: SessionDiagnostics,
    /// PublishRequests received but not yet matched to a notification.
    publish_queue: Mutex<std::collections::VecDeque<PendingPublish>>,
    max_publish_requests: usize,
}

impl Session {
    /// This session's bound channel, if any; `None` once the channel has
    /// disconnected but the session has not yet timed out.
    pub fn secure_channel_id(&self) -> Option<u32> {
        *self.secure_channel_id.lock()
    }

    /// `true` once `ActivateSession` has succeeded at least once.
    pub fn is_activated(&self) -> bool {
        *self.activated.lock()
    }

    /// The identity last presented via `ActivateSession`.
    pub fn identity(&self) -> IdentityToken {
        self.identity.lock().clone()
    }

    /// Absolute time this session expires without a touch.
    pub fn valid_till(&self) -> DateTime<Utc> {
        *self.valid_till.lock()
    }

    /// Extend `valid_till` from `now` by this session's negotiated timeout.
    pub fn touch(&self, now: DateTime<Utc>) {
        *self.valid_till.lock() = now + chrono::Duration::milliseconds(self.timeout_ms as i64);
    }

    /// Bind to a fresh channel and mark activated (§4.10: ActivateSession may
    /// also be used to migrate a session to a new SecureChannel).
    pub fn activate(&self, secure_channel_id: u32, identity: IdentityToken) {
        *self.secure_channel_id.lock() = Some(secure_channel_id);
        *self.activated.lock() = true;
        *self.identity.lock() = identity;
    }

    /// Detach from a channel that has gone away. The session remains valid
    /// until `valid_till` elapses, awaiting re-activation on a new channel.
    pub fn detach_channel(&self) {
        *self.secure_channel_id.lock() = None;
    }

    /// Store a fresh ContinuationPoint, evicting nothing: callers must check
    /// [`Session::continuation_point_count`] against the configured limit
    /// first and fail with `BadNoContinuationPoints` if at capacity.
    pub fn store_continuation_point(&self, id: ByteString, point: ContinuationPoint) {
        self.continuation_points.lock().insert(id, point);
    }

    /// Number of ContinuationPoints currently held.
    pub fn continuation_point_count(&self) -> usize {
        self.continuation_points.lock().len()
    }

    /// This session's configured cap on concurrent ContinuationPoints.
    pub fn max_continuation_points(&self) -> usize {
        self.max_continuation_points
    }

    /// Take and remove a ContinuationPoint by id, for BrowseNext.
    pub fn take_continuation_point(&self, id: &ByteString) -> Option<ContinuationPoint> {
        self.continuation_points.lock().remove(id)
    }

    /// Drop a ContinuationPoint without returning its contents (the client
    /// asked to release it via `releaseContinuationPoints`).
    pub fn release_continuation_point(&self, id: &ByteString) {
        self.continuation_points.lock().remove(id);
    }

    /// Record a subscription as belonging to this session.
    pub fn add_subscription(&self, subscription_id: u32) {
        self.subscription_ids.lock().push(subscription_id);
        self.diagnostics.adjust_subscriptions(1);
    }

    /// Stop tracking a subscription, e.g. after `DeleteSubscriptions`.
    pub fn remove_subscription(&self, subscription_id: u32) {
        self.subscription_ids.lock().retain(|id| *id != subscription_id);
        self.diagnostics.adjust_subscriptions(-1);
    }

    /// The subscription ids this session currently owns.
    pub fn subscription_ids(&self) -> Vec<u32> {
        self.subscription_ids.lock().clone()
    }

    /// Queue a `PublishRequest`, rejecting it with `BadTooManyPublishRequests`
    /// if the session is already at capacity.
    pub fn enqueue_publish(&self, pending: PendingPublish) -> Result<(), StatusCode> {
        let mut queue = self.publish_queue.lock();
        if queue.len() >= self.max_publish_requests {
            return Err(StatusCode::BadTooManyPublishRequests);
        }
        queue.push_back(pending);
        Ok(())
    }

    /// Pop the oldest queued PublishRequest, if any.
    pub fn take_publish(&self) -> Option<PendingPublish> {
        self.publish_queue.lock().pop_front()
    }

    /// Number of PublishRequests currently queued.
    pub fn publish_queue_len(&self) -> usize {
        self.publish_queue.lock().len()
    }

    /// Remove and return every queued PublishRequest whose `deadline` has
    /// elapsed (§C.4): the caller answers each with `BadTimeout`.
    pub fn expire_publish_requests(&self, now: DateTime<Utc>) -> Vec<PendingPublish> {
        let mut queue = self.publish_queue.lock();
        let mut expired = Vec::new();
        let mut kept = std::collections::VecDeque::with_capacity(queue.len());
        for pending in queue.drain(..) {
            match pending.deadline {
                Some(deadline) if deadline <= now => expired.push(pending),
                _ => kept.push_back(pending),
            }
        }
        *queue = kept;
        expired
    }

    /// Drain every queued PublishRequest, e.g. when the session's last
    /// subscription is deleted or the session itself is torn down.
    pub fn drain_publish_requests(&self) -> Vec<PendingPublish> {
        self.publish_queue.lock().drain(..).collect()
    }
}

/// Owns every live [`Session`], keyed internally by the `Guid` embedded in
/// its `authentication_token` rather than by the wire-facing `NodeId`.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Guid, Arc<Session>>>,
    next_numeric_id: std::sync::atomic::AtomicU32,
}

impl SessionManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_numeric_id: std::sync::atomic::AtomicU32::new(1),
        }
    }

    /// `CreateSession`: allocate a new session, unactivated and unbound to
    /// any channel until `ActivateSession` follows.
    pub fn create(
        &self,
        session_name: String,
        requested_timeout_ms: f64,
        limits: &Limits,
        now: DateTime<Utc>,
    ) -> Arc<Session> {
        let numeric = self
            .next_numeric_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let auth_guid = Guid::new();
        let timeout_ms = if requested_timeout_ms <= 0.0 {
            limits.default_session_timeout_ms
        } else {
            requested_timeout_ms
        };
        let session = Arc::new(Session {
            session_id: NodeId::new(1, Identifier::Numeric(numeric)),
            authentication_token: NodeId::new(1, Identifier::Guid(auth_guid)),
            auth_guid,
            session_name,
            secure_channel_id: Mutex::new(None),
            activated: Mutex::new(false),
            identity: Mutex::new(IdentityToken::Anonymous),
            valid_till: Mutex::new(now + chrono::Duration::milliseconds(timeout_ms as i64)),
            timeout_ms,
            continuation_points: Mutex::new(HashMap::new()),
            max_continuation_points: limits.max_continuation_points_per_session,
            subscription_ids: Mutex::new(Vec::new()),
            diagnostics: SessionDiagnostics::new(),
            publish_queue: Mutex::new(std::collections::VecDeque::new()),
            max_publish_requests: limits.max_publish_requests_per_session,
        });
        self.sessions.write().insert(auth_guid, session.clone());
        session
    }

    /// Look up a session by the `Guid` the transport layer resolved from
    /// `request_header.authentication_token`.
    pub fn get(&self, guid: &Guid) -> Option<Arc<Session>> {
        self.sessions.read().get(guid).cloned()
    }

    /// Resolve a request's bound session, translating absence into the
    /// matching `StatusCode`.
    pub fn require(&self, guid: Option<&Guid>) -> Result<Arc<Session>, StatusCode> {
        let guid = guid.ok_or(StatusCode::BadSessionIdInvalid)?;
        self.get(guid).ok_or(StatusCode::BadSessionIdInvalid)
    }

    /// `CloseSession`: remove and return the session so the caller can tear
    /// down its subscriptions.
    pub fn close(&self, guid: &Guid) -> Option<Arc<Session>> {
        self.sessions.write().remove(guid)
    }

    /// A channel has gone away: detach every session bound to it so they
    /// survive until timeout awaiting re-activation, returning their guids.
    pub fn detach_channel(&self, channel_id: u32) -> Vec<Guid> {
        let sessions = self.sessions.read();
        let mut affected = Vec::new();
        for (guid, session) in sessions.iter() {
            if session.secure_channel_id() == Some(channel_id) {
                session.detach_channel();
                affected.push(*guid);
            }
        }
        affected
    }

    /// Remove and return every session whose `valid_till` has elapsed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Arc<Session>> {
        let mut sessions = self.sessions.write();
        let expired: Vec<Guid> = sessions
            .iter()
            .filter(|(_, s)| s.valid_till() <= now)
            .map(|(guid, _)| *guid)
            .collect();
        expired
            .into_iter()
            .filter_map(|guid| sessions.remove(&guid))
            .collect()
    }

    /// Number of live sessions, for diagnostics.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Every live session's key, for callers (the publishing/timeout tick)
    /// that need to visit each session in turn.
    pub fn guids(&self) -> Vec<Guid> {
        self.sessions.read().keys().copied().collect()
    }

    /// `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn create_then_lookup_by_embedded_guid() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("test".to_string(), 0.0, &limits, now());
        let guid = match session.authentication_token.identifier {
            opcua_types::Identifier::Guid(g) => g,
            _ => panic!("expected a Guid identifier"),
        };
        assert!(manager.get(&guid).is_some());
        assert_eq!(manager.require(Some(&guid)).unwrap().session_id, session.session_id);
    }

    #[test]
    fn sweep_expired_removes_timed_out_sessions() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("test".to_string(), 1000.0, &limits, now());
        let guid = session.auth_guid;
        let later = now() + chrono::Duration::seconds(2);
        let expired = manager.sweep_expired(later);
        assert_eq!(expired.len(), 1);
        assert!(manager.get(&guid).is_none());
    }

    #[test]
    fn detach_channel_keeps_session_but_clears_binding() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("test".to_string(), 60_000.0, &limits, now());
        session.activate(7, IdentityToken::Anonymous);
        let affected = manager.detach_channel(7);
        assert_eq!(affected.len(), 1);
        assert_eq!(session.secure_channel_id(), None);
        assert!(manager.get(&session.auth_guid).is_some());
    }

    #[test]
    fn continuation_point_round_trips() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("test".to_string(), 0.0, &limits, now());
        let id = ByteString::from(vec![1, 2, 3]);
        session.store_continuation_point(id.clone(), ContinuationPoint { remaining: Vec::new() });
        assert_eq!(session.continuation_point_count(), 1);
        assert!(session.take_continuation_point(&id).is_some());
        assert_eq!(session.continuation_point_count(), 0);
    }

    #[test]
    fn publish_queue_fifo_and_capacity() {
        let manager = SessionManager::new();
        let mut limits = Limits::default();
        limits.max_publish_requests_per_session = 1;
        let session = manager.create("test".to_string(), 0.0, &limits, now());
        session
            .enqueue_publish(PendingPublish {
                request_handle: 1,
                subscription_acknowledgements: Vec::new(),
                deadline: None,
            })
            .unwrap();
        let rejected = session.enqueue_publish(PendingPublish {
            request_handle: 2,
            subscription_acknowledgements: Vec::new(),
            deadline: None,
        });
        assert_eq!(rejected, Err(StatusCode::BadTooManyPublishRequests));
        assert_eq!(session.take_publish().unwrap().request_handle, 1);
        assert!(session.take_publish().is_none());
    }

    #[test]
    fn expire_publish_requests_drops_past_deadline_only() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("test".to_string(), 60_000.0, &limits, now());
        session
            .enqueue_publish(PendingPublish {
                request_handle: 1,
                subscription_acknowledgements: Vec::new(),
                deadline: Some(now()),
            })
            .unwrap();
        session
            .enqueue_publish(PendingPublish {
                request_handle: 2,
                subscription_acknowledgements: Vec::new(),
                deadline: Some(now() + chrono::Duration::seconds(10)),
            })
            .unwrap();
        let expired = session.expire_publish_requests(now() + chrono::Duration::seconds(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].request_handle, 1);
        assert_eq!(session.publish_queue_len(), 1);
    }
}
