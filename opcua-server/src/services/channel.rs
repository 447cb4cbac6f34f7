// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! OpenSecureChannel/CloseSecureChannel (§4.9). This core only ships
//! [`opcua_crypto::NoSecurityPolicy`]; a `MessageSecurityMode` other than
//! `None` is rejected outright since no concrete SecurityPolicy is linked in
//! (§E, Non-goals: "concrete SecurityPolicy algorithms").

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opcua_core::{generate_nonce, SecureChannelManager};
use opcua_crypto::{NoSecurityPolicy, SecurityPolicy};
use opcua_types::service_types::{
    CloseSecureChannelRequest, MessageSecurityMode, OpenSecureChannelRequest,
    OpenSecureChannelResponse, ResponseHeader, SecurityTokenRequestType,
};
use opcua_types::StatusCode;

fn resolve_policy(security_mode: MessageSecurityMode) -> Result<Arc<dyn SecurityPolicy>, StatusCode> {
    match security_mode {
        MessageSecurityMode::None => Ok(Arc::new(NoSecurityPolicy)),
        MessageSecurityMode::Sign | MessageSecurityMode::SignAndEncrypt => {
            Err(StatusCode::BadSecurityPolicyRejected)
        }
    }
}

/// `OpenSecureChannel`, covering both `Issue` and `Renew` (§4.9).
pub fn open_secure_channel(
    manager: &SecureChannelManager,
    channel_id: Option<u32>,
    request: OpenSecureChannelRequest,
    now: DateTime<Utc>,
) -> Result<OpenSecureChannelResponse, StatusCode> {
    let policy = resolve_policy(request.security_mode)?;
    let server_nonce = generate_nonce(policy.as_ref());
    let (_channel_id, token) = manager.open(
        request.request_type,
        channel_id,
        policy,
        request.security_mode,
        request.client_nonce.as_ref(),
        server_nonce.as_ref(),
        request.requested_lifetime,
        now,
    )?;
    Ok(OpenSecureChannelResponse {
        response_header: ResponseHeader::new(&request.request_header, StatusCode::Good),
        server_protocol_version: request.client_protocol_version,
        security_token: token,
        server_nonce,
    })
}

/// `CloseSecureChannel`: no response is ever sent (§4.9).
pub fn close_secure_channel(
    manager: &SecureChannelManager,
    channel_id: u32,
    _request: CloseSecureChannelRequest,
) {
    manager.close(channel_id);
}

/// Whether `request_type` requires an existing channel id to act on.
pub fn requires_existing_channel(request_type: SecurityTokenRequestType) -> bool {
    matches!(request_type, SecurityTokenRequestType::Renew)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_types::service_types::RequestHeader;
    use opcua_types::ByteString;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn issue_request() -> OpenSecureChannelRequest {
        OpenSecureChannelRequest {
            request_header: RequestHeader::default(),
            client_protocol_version: 0,
            request_type: SecurityTokenRequestType::Issue,
            security_mode: MessageSecurityMode::None,
            client_nonce: ByteString::null(),
            requested_lifetime: 0,
        }
    }

    #[test]
    fn issue_opens_a_channel_with_none_policy() {
        let manager = SecureChannelManager::new();
        let response = open_secure_channel(&manager, None, issue_request(), now()).unwrap();
        assert!(manager.is_open(response.security_token.channel_id));
    }

    #[test]
    fn sign_and_encrypt_is_rejected_with_no_concrete_policy_linked_in() {
        let manager = SecureChannelManager::new();
        let mut request = issue_request();
        request.security_mode = MessageSecurityMode::SignAndEncrypt;
        let result = open_secure_channel(&manager, None, request, now());
        assert_eq!(result.unwrap_err(), StatusCode::BadSecurityPolicyRejected);
    }

    #[test]
    fn renew_without_a_channel_id_is_rejected() {
        let manager = SecureChannelManager::new();
        let mut request = issue_request();
        request.request_type = SecurityTokenRequestType::Renew;
        let result = open_secure_channel(&manager, None, request, now());
        assert_eq!(result.unwrap_err(), StatusCode::BadSecureChannelIdInvalid);
    }

    #[test]
    fn close_removes_the_channel_on_next_sweep() {
        let manager = SecureChannelManager::new();
        let response = open_secure_channel(&manager, None, issue_request(), now()).unwrap();
        let channel_id = response.security_token.channel_id;
        close_secure_channel(
            &manager,
            channel_id,
            CloseSecureChannelRequest {
                request_header: RequestHeader::default(),
            },
        );
        assert!(!manager.is_open(channel_id));
    }
}
