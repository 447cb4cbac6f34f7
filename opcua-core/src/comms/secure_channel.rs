// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`SecureChannel`] and [`SecureChannelManager`] (§3, §4.9): channel
//! lifecycle, `SecurityToken` issue/renew, and the grace period during which
//! a just-superseded token remains valid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use opcua_crypto::{DerivedKeys, SecurityPolicy};
use opcua_types::{
    service_types::{ChannelSecurityToken, MessageSecurityMode, SecurityTokenRequestType},
    ByteString, StatusCode,
};
use parking_lot::RwLock;

/// Which side of the connection a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This end is the client.
    Client,
    /// This end is the server.
    Server,
}

/// A channel's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Allocated but no `OPN` has completed yet.
    Opening,
    /// Open and serviceable.
    Open,
    /// Closed by `CLO` or lifetime expiry; the channel id is no longer valid.
    Closed,
}

/// One endpoint's security context for a single channel: the current and, if
/// a renewal grace period is in effect, previous `SecurityToken`, plus
/// derived symmetric keys for each.
pub struct SecureChannel {
    role: Role,
    state: ChannelState,
    channel_id: u32,
    security_policy: Arc<dyn SecurityPolicy>,
    security_mode: MessageSecurityMode,
    current_token: ChannelSecurityToken,
    current_keys: DerivedKeys,
    previous: Option<(ChannelSecurityToken, DerivedKeys)>,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("channel_id", &self.channel_id)
            .field("security_mode", &self.security_mode)
            .field("current_token", &self.current_token)
            .finish()
    }
}

impl SecureChannel {
    /// Issue a fresh channel: allocates a channel id, derives keys from the
    /// nonce pair via `security_policy`, and opens immediately (§4.9, OPN
    /// with `Issue`).
    pub fn issue(
        role: Role,
        channel_id: u32,
        security_policy: Arc<dyn SecurityPolicy>,
        security_mode: MessageSecurityMode,
        client_nonce: &[u8],
        server_nonce: &[u8],
        token_id: u32,
        requested_lifetime: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, StatusCode> {
        let keys = security_policy
            .derive_keys(client_nonce, server_nonce)
            .map_err(StatusCode::from)?;
        let token = ChannelSecurityToken {
            channel_id,
            token_id,
            created_at: now,
            revised_lifetime: revise_lifetime(requested_lifetime),
        };
        Ok(Self {
            role,
            state: ChannelState::Open,
            channel_id,
            security_policy,
            security_mode,
            current_token: token,
            current_keys: keys,
            previous: None,
        })
    }

    /// This channel's id.
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Which side of the connection this channel belongs to.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// The active `SecurityToken`.
    pub fn current_token(&self) -> &ChannelSecurityToken {
        &self.current_token
    }

    /// The security policy this channel negotiated.
    pub fn security_policy(&self) -> &dyn SecurityPolicy {
        self.security_policy.as_ref()
    }

    /// The security mode this channel negotiated.
    pub fn security_mode(&self) -> MessageSecurityMode {
        self.security_mode
    }

    /// Renew: issue a new token for the same channel, keeping the current one
    /// valid (in `previous`) until either the next successful message under
    /// the new token, or the old token's own lifetime elapses, whichever
    /// comes first (§4.9).
    pub fn renew(
        &mut self,
        client_nonce: &[u8],
        server_nonce: &[u8],
        new_token_id: u32,
        requested_lifetime: u32,
        now: DateTime<Utc>,
    ) -> Result<&ChannelSecurityToken, StatusCode> {
        let keys = self
            .security_policy
            .derive_keys(client_nonce, server_nonce)
            .map_err(StatusCode::from)?;
        let new_token = ChannelSecurityToken {
            channel_id: self.channel_id,
            token_id: new_token_id,
            created_at: now,
            revised_lifetime: revise_lifetime(requested_lifetime),
        };
        let old_token = std::mem::replace(&mut self.current_token, new_token);
        let old_keys = std::mem::replace(&mut self.current_keys, keys);
        self.previous = Some((old_token, old_keys));
        Ok(&self.current_token)
    }

    /// Record that a message arrived authenticated under the current token,
    /// which retires the grace-period `previous` token immediately (§4.9:
    /// "until the first successful message with the new token").
    pub fn acknowledge_current_token(&mut self) {
        self.previous = None;
    }

    /// Look up the keys for `token_id`, accepting either the current token or
    /// a still-valid previous one. `None` means the token is unknown or its
    /// grace period has elapsed.
    pub fn keys_for_token(&self, token_id: u32, now: DateTime<Utc>) -> Option<&DerivedKeys> {
        if token_id == self.current_token.token_id && !self.current_token.is_expired(now) {
            return Some(&self.current_keys);
        }
        if let Some((token, keys)) = &self.previous {
            if token_id == token.token_id && !token.is_expired(now) {
                return Some(keys);
            }
        }
        None
    }

    /// `true` once the current token's lifetime has elapsed with no renewal
    /// (§4.9: "channels whose token lifetime has elapsed without renewal are
    /// destroyed").
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.current_token.is_expired(now)
    }

    /// Mark the channel closed; no response is emitted for `CLO` (§4.9).
    pub fn close(&mut self) {
        self.state = ChannelState::Closed;
    }
}

/// `revisedLifetime` floor/ceiling this core imposes when a client's
/// requested lifetime is absent or unreasonable.
const MIN_TOKEN_LIFETIME_MS: u32 = 10_000;
const MAX_TOKEN_LIFETIME_MS: u32 = 3_600_000;

fn revise_lifetime(requested: u32) -> u32 {
    if requested == 0 {
        MAX_TOKEN_LIFETIME_MS
    } else {
        requested.clamp(MIN_TOKEN_LIFETIME_MS, MAX_TOKEN_LIFETIME_MS)
    }
}

/// Owns every live channel on one endpoint, keyed by channel id.
#[derive(Default)]
pub struct SecureChannelManager {
    channels: RwLock<HashMap<u32, SecureChannel>>,
    next_channel_id: std::sync::atomic::AtomicU32,
}

impl SecureChannelManager {
    /// An empty manager. Channel ids are allocated starting at 1.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_channel_id: std::sync::atomic::AtomicU32::new(1),
        }
    }

    /// Handle an OPN with `request_type = Issue`: allocate a channel id and
    /// open a fresh channel.
    pub fn issue(
        &self,
        security_policy: Arc<dyn SecurityPolicy>,
        security_mode: MessageSecurityMode,
        client_nonce: &[u8],
        server_nonce: &[u8],
        requested_lifetime: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, StatusCode> {
        let channel_id = self
            .next_channel_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let channel = SecureChannel::issue(
            Role::Server,
            channel_id,
            security_policy,
            security_mode,
            client_nonce,
            server_nonce,
            1,
            requested_lifetime,
            now,
        )?;
        self.channels.write().insert(channel_id, channel);
        Ok(channel_id)
    }

    /// Handle an OPN with `request_type = Renew` against an existing channel.
    pub fn renew(
        &self,
        channel_id: u32,
        client_nonce: &[u8],
        server_nonce: &[u8],
        requested_lifetime: u32,
        now: DateTime<Utc>,
    ) -> Result<ChannelSecurityToken, StatusCode> {
        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(&channel_id)
            .ok_or(StatusCode::BadSecureChannelIdInvalid)?;
        let next_token_id = channel.current_token.token_id + 1;
        channel
            .renew(client_nonce, server_nonce, next_token_id, requested_lifetime, now)
            .cloned()
    }

    /// Dispatch an OPN by its `SecurityTokenRequestType`.
    pub fn open(
        &self,
        request_type: SecurityTokenRequestType,
        channel_id: Option<u32>,
        security_policy: Arc<dyn SecurityPolicy>,
        security_mode: MessageSecurityMode,
        client_nonce: &[u8],
        server_nonce: &[u8],
        requested_lifetime: u32,
        now: DateTime<Utc>,
    ) -> Result<(u32, ChannelSecurityToken), StatusCode> {
        match request_type {
            SecurityTokenRequestType::Issue => {
                let channel_id = self.issue(
                    security_policy,
                    security_mode,
                    client_nonce,
                    server_nonce,
                    requested_lifetime,
                    now,
                )?;
                let token = self
                    .channels
                    .read()
                    .get(&channel_id)
                    .expect("just inserted")
                    .current_token
                    .clone();
                Ok((channel_id, token))
            }
            SecurityTokenRequestType::Renew => {
                let channel_id = channel_id.ok_or(StatusCode::BadSecureChannelIdInvalid)?;
                let token = self.renew(channel_id, client_nonce, server_nonce, requested_lifetime, now)?;
                Ok((channel_id, token))
            }
        }
    }

    /// `CLO`: close a channel immediately. No response is ever emitted for
    /// this, matching §4.9.
    pub fn close(&self, channel_id: u32) {
        if let Some(channel) = self.channels.write().get_mut(&channel_id) {
            channel.close();
        }
    }

    /// Remove channels whose current token has expired without renewal,
    /// returning their ids so the caller can detach any bound sessions.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<u32> {
        let mut channels = self.channels.write();
        let expired: Vec<u32> = channels
            .iter()
            .filter(|(_, c)| c.is_expired(now) || c.state == ChannelState::Closed)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            channels.remove(id);
        }
        expired
    }

    /// Look up the keys that should authenticate a message under `token_id`
    /// on `channel_id`.
    pub fn keys_for_token(&self, channel_id: u32, token_id: u32, now: DateTime<Utc>) -> Option<DerivedKeys> {
        self.channels
            .read()
            .get(&channel_id)
            .and_then(|c| c.keys_for_token(token_id, now))
            .cloned()
    }

    /// `true` if the channel is currently open.
    pub fn is_open(&self, channel_id: u32) -> bool {
        self.channels
            .read()
            .get(&channel_id)
            .is_some_and(|c| c.state == ChannelState::Open)
    }
}

/// A server nonce long enough to satisfy every policy's `nonce_length`.
pub fn generate_nonce(security_policy: &dyn SecurityPolicy) -> ByteString {
    ByteString::from(vec![0u8; security_policy.nonce_length()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua_crypto::NoSecurityPolicy;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn issue_opens_a_fresh_channel() {
        let manager = SecureChannelManager::new();
        let id = manager
            .issue(Arc::new(NoSecurityPolicy), MessageSecurityMode::None, &[], &[], 0, now())
            .unwrap();
        assert!(manager.is_open(id));
    }

    #[test]
    fn renew_keeps_old_token_valid_during_grace_period() {
        let manager = SecureChannelManager::new();
        let id = manager
            .issue(Arc::new(NoSecurityPolicy), MessageSecurityMode::None, &[], &[], 0, now())
            .unwrap();
        let old_token_id = manager.channels.read().get(&id).unwrap().current_token.token_id;
        manager.renew(id, &[], &[], 0, now()).unwrap();
        assert!(manager.keys_for_token(id, old_token_id, now()).is_some());
    }

    #[test]
    fn close_removes_on_next_sweep() {
        let manager = SecureChannelManager::new();
        let id = manager
            .issue(Arc::new(NoSecurityPolicy), MessageSecurityMode::None, &[], &[], 0, now())
            .unwrap();
        manager.close(id);
        let expired = manager.sweep_expired(now());
        assert_eq!(expired, vec![id]);
        assert!(!manager.is_open(id));
    }
}
