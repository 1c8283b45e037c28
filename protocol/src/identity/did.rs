//! # Identities
//!
//! An [`Identity`] is the opaque string a key-holder is known by: in
//! practice a DID such as `did:key:z6Mk...` or `did:example:abc`. The
//! authenticator and the ledger treat it as an opaque, validated token and
//! never interpret the method-specific part.
//!
//! ## Generated identities are not bound to their key
//!
//! [`GeneratedIdentity::new`] mints a `did:key:z<base58>` string from
//! random bytes, *not* from the public key it is handed out with. Nothing
//! about the string proves who holds the key; the binding, if any, comes
//! from the [`IdentityResolver`](crate::resolver::IdentityResolver) the
//! authenticator is configured with.

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{DID_KEY_PREFIX, GENERATED_IDENTITY_BYTES, MAX_IDENTITY_LENGTH};
use crate::crypto::keys::IdentityKeypair;

/// Errors raised while validating an identity string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity must not be empty")]
    Empty,

    #[error("identity exceeds {MAX_IDENTITY_LENGTH} bytes")]
    TooLong,

    #[error("identity must not contain control characters")]
    ControlCharacter,
}

/// A validated identity string.
///
/// Construction trims surrounding whitespace and rejects empty, oversized
/// or control-character-bearing values, so a `&Identity` is always safe to
/// use as a map key, a log field and a signed-message component.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap an identity string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentityError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        if trimmed.len() > MAX_IDENTITY_LENGTH {
            return Err(IdentityError::TooLong);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdentityError::ControlCharacter);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Mint a fresh random identity: `did:key:z` followed by base58 of
    /// [`GENERATED_IDENTITY_BYTES`] random bytes.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_IDENTITY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(format!(
            "{}{}",
            DID_KEY_PREFIX,
            bs58::encode(bytes).into_string()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method, if the identity is shaped like `did:<method>:<id>`.
    pub fn did_method(&self) -> Option<&str> {
        let mut parts = self.0.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => {
                Some(method)
            }
            _ => None,
        }
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Generated identity bundle
// ---------------------------------------------------------------------------

/// The output of the "generate identity + keys" operation.
///
/// Carries the private key out to the holder exactly once. The core never
/// stores it; callers that keep a `GeneratedIdentity` around are holding a
/// secret.
pub struct GeneratedIdentity {
    pub identity: Identity,
    pub keypair: IdentityKeypair,
}

/// Wire form of a [`GeneratedIdentity`]: identity plus hex-encoded keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedIdentityExport {
    pub identity: String,
    pub public_key: String,
    pub private_key: String,
}

impl GeneratedIdentity {
    /// Generate a keypair and a random identity to go with it.
    pub fn new() -> Self {
        Self {
            identity: Identity::generate(),
            keypair: IdentityKeypair::generate(),
        }
    }

    /// Export for handing to the holder. Includes the secret key.
    pub fn export(&self) -> GeneratedIdentityExport {
        GeneratedIdentityExport {
            identity: self.identity.to_string(),
            public_key: self.keypair.public_key().to_hex(),
            private_key: self.keypair.secret_key_hex(),
        }
    }
}

impl Default for GeneratedIdentity {
    fn default() -> Self {
        Self::new()
    }
}
