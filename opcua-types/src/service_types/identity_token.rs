// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! User identity token types accepted by ActivateSession (§4.10).

use crate::{byte_string::ByteString, string::UAString};

/// The identity a client presents when activating a session.
#[derive(Debug, Clone)]
pub enum IdentityToken {
    /// No identity asserted; accepted only when the endpoint allows it.
    Anonymous,
    /// A username/password pair. Rejected if `encryption_algorithm` is
    /// non-empty: this core requires the secure channel, not token-level
    /// crypto, to protect the secret.
    UserName {
        /// The asserted username.
        user_name: UAString,
        /// The password, or its encrypted form if `encryption_algorithm` is set.
        password: ByteString,
        /// Non-empty only when the password is individually encrypted.
        encryption_algorithm: UAString,
    },
}

impl IdentityToken {
    /// `true` if this token is the anonymous token.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, IdentityToken::Anonymous)
    }
}
