// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! CreateSession/ActivateSession/CloseSession (§4.10), layered on top of the
//! [`crate::session::Session`]/[`crate::session::SessionManager`] data
//! structures. Anonymous and username/password identity tokens are accepted;
//! a password-level `encryption_algorithm` is rejected since this core relies
//! on the secure channel, not token-level crypto, to protect the secret.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opcua_types::service_types::{
    ActivateSessionRequest, ActivateSessionResponse, CloseSessionRequest, CloseSessionResponse,
    CreateSessionRequest, CreateSessionResponse, IdentityToken, ResponseHeader,
};
use opcua_types::StatusCode;

use crate::config::{EndpointDescription, Limits};
use crate::session::{Session, SessionManager};

/// `CreateSession`: always succeeds (this core imposes no session-count
/// ceiling beyond what the embedder enforces at the transport layer).
pub fn create_session(
    manager: &SessionManager,
    limits: &Limits,
    _endpoints: &[EndpointDescription],
    request: CreateSessionRequest,
    now: DateTime<Utc>,
) -> CreateSessionResponse {
    let session_name = request.session_name.to_string();
    let session = manager.create(session_name, request.requested_session_timeout, limits, now);
    CreateSessionResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        session_id: session.session_id.clone(),
        authentication_token: session.authentication_token.clone(),
        revised_session_timeout: session.valid_till().signed_duration_since(now).num_milliseconds() as f64,
    }
}

fn validate_identity(token: &IdentityToken) -> Result<(), StatusCode> {
    match token {
        IdentityToken::Anonymous => Ok(()),
        IdentityToken::UserName { encryption_algorithm, .. } => {
            if encryption_algorithm.value.as_ref().is_some_and(|s| !s.is_empty()) {
                Err(StatusCode::BadIdentityTokenInvalid)
            } else {
                Ok(())
            }
        }
    }
}

/// `ActivateSession`, including migration to a new SecureChannel (§4.10: "may
/// also be used to ... transfer to a different session").
pub fn activate_session(
    session: &Arc<Session>,
    secure_channel_id: u32,
    request: ActivateSessionRequest,
    now: DateTime<Utc>,
) -> Result<ActivateSessionResponse, StatusCode> {
    validate_identity(&request.user_identity_token)?;
    session.activate(secure_channel_id, request.user_identity_token);
    session.touch(now);
    Ok(ActivateSessionResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        server_nonce: opcua_types::ByteString::null(),
    })
}

/// `CloseSession`: removes the session from the manager and drains its
/// PublishRequest queue so the caller can answer each with a terminal status;
/// subscriptions are always deleted, since TransferSubscriptions is
/// unimplemented (§E, Non-goals).
pub fn close_session(
    manager: &SessionManager,
    auth_guid: opcua_types::Guid,
    request: CloseSessionRequest,
) -> (CloseSessionResponse, Option<Arc<Session>>) {
    let session = manager.close(&auth_guid);
    let response = CloseSessionResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
    };
    (response, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_types::service_types::RequestHeader;
    use opcua_types::{ByteString, UAString};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn create_session_issues_a_fresh_authentication_token() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let request = CreateSessionRequest {
            request_header: RequestHeader::default(),
            session_name: UAString::from("test-session"),
            requested_session_timeout: 60_000.0,
            max_response_message_size: 0,
        };
        let response = create_session(&manager, &limits, &[], request, now());
        assert_eq!(manager.len(), 1);
        assert_ne!(response.authentication_token, opcua_types::NodeId::null());
    }

    #[test]
    fn activate_session_rejects_an_encrypted_password_token() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("s".to_string(), 60_000.0, &limits, now());
        let request = ActivateSessionRequest {
            request_header: RequestHeader::default(),
            user_identity_token: IdentityToken::UserName {
                user_name: UAString::from("alice"),
                password: ByteString::from(b"secret".to_vec()),
                encryption_algorithm: UAString::from("RSA-OAEP"),
            },
        };
        let result = activate_session(&session, 1, request, now());
        assert_eq!(result.unwrap_err(), StatusCode::BadIdentityTokenInvalid);
        assert!(!session.is_activated());
    }

    #[test]
    fn activate_session_accepts_anonymous_and_binds_the_channel() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("s".to_string(), 60_000.0, &limits, now());
        let request = ActivateSessionRequest {
            request_header: RequestHeader::default(),
            user_identity_token: IdentityToken::Anonymous,
        };
        activate_session(&session, 7, request, now()).unwrap();
        assert!(session.is_activated());
        assert_eq!(session.secure_channel_id(), Some(7));
    }

    #[test]
    fn close_session_removes_it_from_the_manager() {
        let manager = SessionManager::new();
        let limits = Limits::default();
        let session = manager.create("s".to_string(), 60_000.0, &limits, now());
        let guid = match session.authentication_token.identifier {
            opcua_types::Identifier::Guid(g) => g,
            _ => panic!("expected a Guid identifier"),
        };
        let request = CloseSessionRequest {
            request_header: RequestHeader::default(),
            delete_subscriptions: true,
        };
        let (_response, removed) = close_session(&manager, guid, request);
        assert!(removed.is_some());
        assert!(manager.get(&guid).is_none());
    }
}
