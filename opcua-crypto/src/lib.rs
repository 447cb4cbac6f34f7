// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Interface to the cryptographic primitives behind OPC UA security
//! policies. Per the core's scope, this crate defines the seam only: the
//! [`SecurityPolicy`] trait the SecureChannel manager calls into to sign,
//! encrypt, verify and derive keys. Concrete policies (Basic256Sha256,
//! Aes256Sha256RsaPss, ...) are provided by an implementor linked in by the
//! embedding application, not by this core.

use opcua_types::{Error, StatusCode};

/// Symmetric keys derived for one direction of traffic on a channel.
#[derive(Clone)]
pub struct DerivedKeys {
    /// Key used to compute a message signature.
    pub signing_key: Vec<u8>,
    /// Key used to encrypt/decrypt the message body.
    pub encryption_key: Vec<u8>,
    /// Initialization vector for the encryption key.
    pub iv: Vec<u8>,
}

/// The operations a [`crate::SecurityPolicy`] must provide so the
/// SecureChannel manager can protect and authenticate chunks without
/// knowing which concrete algorithms are in play.
pub trait SecurityPolicy: Send + Sync {
    /// The policy's URI, e.g. `http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256`.
    fn uri(&self) -> &str;

    /// Derive symmetric keys for one direction of traffic from a client and
    /// server nonce pair.
    fn derive_keys(&self, client_nonce: &[u8], server_nonce: &[u8]) -> Result<DerivedKeys, Error>;

    /// Sign `data` with `keys.signing_key`, appending the signature.
    fn sign(&self, keys: &DerivedKeys, data: &[u8]) -> Result<Vec<u8>, Error>;

    /// Verify a signature previously produced by [`SecurityPolicy::sign`].
    fn verify(&self, keys: &DerivedKeys, data: &[u8], signature: &[u8]) -> Result<(), Error>;

    /// Encrypt `plain_text` with `keys.encryption_key`/`keys.iv`.
    fn encrypt(&self, keys: &DerivedKeys, plain_text: &[u8]) -> Result<Vec<u8>, Error>;

    /// Decrypt data previously produced by [`SecurityPolicy::encrypt`].
    fn decrypt(&self, keys: &DerivedKeys, cipher_text: &[u8]) -> Result<Vec<u8>, Error>;

    /// Length in bytes of a nonce this policy expects to receive, used to
    /// validate `OpenSecureChannelRequest::client_nonce`.
    fn nonce_length(&self) -> usize;
}

/// The no-op policy used for `MessageSecurityMode::None` channels: every
/// operation is the identity, signatures are empty, nonces may be any length.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecurityPolicy;

impl SecurityPolicy for NoSecurityPolicy {
    fn uri(&self) -> &str {
        "http://opcfoundation.org/UA/SecurityPolicy#None"
    }

    fn derive_keys(&self, _client_nonce: &[u8], _server_nonce: &[u8]) -> Result<DerivedKeys, Error> {
        Ok(DerivedKeys {
            signing_key: Vec::new(),
            encryption_key: Vec::new(),
            iv: Vec::new(),
        })
    }

    fn sign(&self, _keys: &DerivedKeys, _data: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(Vec::new())
    }

    fn verify(&self, _keys: &DerivedKeys, _data: &[u8], signature: &[u8]) -> Result<(), Error> {
        if signature.is_empty() {
            Ok(())
        } else {
            Err(Error::new(
                StatusCode::BadSecurityPolicyRejected,
                "unexpected signature on an unsecured channel",
            ))
        }
    }

    fn encrypt(&self, _keys: &DerivedKeys, plain_text: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(plain_text.to_vec())
    }

    fn decrypt(&self, _keys: &DerivedKeys, cipher_text: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(cipher_text.to_vec())
    }

    fn nonce_length(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_security_policy_roundtrips() {
        let policy = NoSecurityPolicy;
        let keys = policy.derive_keys(b"", b"").unwrap();
        let cipher = policy.encrypt(&keys, b"hello").unwrap();
        let plain = policy.decrypt(&keys, &cipher).unwrap();
        assert_eq!(plain, b"hello");
        let sig = policy.sign(&keys, b"hello").unwrap();
        assert!(policy.verify(&keys, b"hello", &sig).is_ok());
    }
}
