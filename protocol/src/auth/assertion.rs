//! Signed assertions: what a holder sends back to prove it owns a key.
//!
//! ## Canonical signing bytes
//!
//! ```text
//! "docauth/assertion/v1" 0x00
//! identity (UTF-8)       0x00
//! challenge              (32 raw bytes)
//! issued_at              (u64 little-endian, unix milliseconds)
//! ```
//!
//! Identity is NUL-terminated and [`Identity`] rejects control characters,
//! so two different (identity, challenge) pairs can never produce the same
//! byte string. Substituting any field invalidates the signature.
//!
//! The wire struct, [`SignedAssertion`], keeps every field as a string so
//! that undecodable input surfaces as `MalformedAssertion` from
//! [`SignedAssertion::parse`] rather than as an opaque deserializer error.

use serde::{Deserialize, Serialize};

use super::challenge::Challenge;
use super::error::AuthError;
use crate::config::{ASSERTION_DOMAIN, SIGNATURE_ALGORITHM};
use crate::crypto::keys::{IdentityKeypair, PublicKey, Signature};
use crate::identity::Identity;

/// A signed statement binding `{identity, challenge, issued_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAssertion {
    /// The identity the holder claims.
    pub identity: String,
    /// Hex-encoded challenge the holder was issued.
    pub challenge: String,
    /// When the holder signed, unix milliseconds.
    pub issued_at: u64,
    /// Signature algorithm. Only `"EdDSA"` verifies.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Hex-encoded public key the holder declares. Optional: resolvers that
    /// know the identity's key ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Hex-encoded Ed25519 signature over the canonical signing bytes.
    pub signature: String,
}

fn default_algorithm() -> String {
    SIGNATURE_ALGORITHM.to_string()
}

/// A [`SignedAssertion`] whose fields have all been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssertion {
    pub identity: Identity,
    pub challenge: Challenge,
    pub issued_at: u64,
    pub algorithm: String,
    pub public_key: Option<PublicKey>,
    pub signature: Signature,
}

impl ParsedAssertion {
    /// The exact bytes the signature must cover.
    pub fn signing_bytes(&self) -> Vec<u8> {
        signing_bytes(&self.identity, &self.challenge, self.issued_at)
    }
}

impl SignedAssertion {
    /// Decode every field. Any missing or undecodable field is a
    /// `MalformedAssertion`; the algorithm is left for signature
    /// verification to judge.
    ///
    /// The identity must arrive exactly as signed: surrounding whitespace
    /// is rejected rather than trimmed, since the signature covers the
    /// identity byte for byte.
    pub fn parse(&self) -> Result<ParsedAssertion, AuthError> {
        let identity = Identity::new(&self.identity)
            .map_err(|e| AuthError::MalformedAssertion(format!("identity: {e}")))?;
        if identity.as_str() != self.identity {
            return Err(AuthError::MalformedAssertion(
                "identity: surrounding whitespace".into(),
            ));
        }
        let challenge: Challenge = self.challenge.parse()?;
        if self.issued_at == 0 {
            return Err(AuthError::MalformedAssertion(
                "issued_at must be a unix millisecond timestamp".into(),
            ));
        }
        let public_key = self
            .public_key
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()
            .map_err(|e| AuthError::MalformedAssertion(format!("public_key: {e}")))?;
        let signature = Signature::from_hex(&self.signature)
            .map_err(|e| AuthError::MalformedAssertion(format!("signature: {e}")))?;

        Ok(ParsedAssertion {
            identity,
            challenge,
            issued_at: self.issued_at,
            algorithm: self.algorithm.clone(),
            public_key,
            signature,
        })
    }
}

/// Canonical signing bytes for an assertion.
pub fn signing_bytes(identity: &Identity, challenge: &Challenge, issued_at: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ASSERTION_DOMAIN.len() + identity.as_str().len() + 48);
    buf.extend_from_slice(ASSERTION_DOMAIN);
    buf.push(0x00);
    buf.extend_from_slice(identity.as_str().as_bytes());
    buf.push(0x00);
    buf.extend_from_slice(challenge.as_bytes());
    buf.extend_from_slice(&issued_at.to_le_bytes());
    buf
}

/// Client-side signer: build and sign an assertion for `challenge`.
///
/// This is what a holder runs locally. The core never calls it on a
/// holder's behalf; the node only exposes it behind an explicit opt-in.
///
/// # Example
///
/// ```
/// use docauth_protocol::auth::{sign_assertion, Authenticator};
/// use docauth_protocol::config::AuthConfig;
/// use docauth_protocol::crypto::IdentityKeypair;
/// use docauth_protocol::identity::Identity;
///
/// let auth = Authenticator::new(AuthConfig::default());
/// let keypair = IdentityKeypair::generate();
/// let identity = Identity::new("did:example:abc").unwrap();
///
/// let challenge = auth.issue_challenge("did:example:abc").unwrap();
/// let assertion = sign_assertion(&keypair, &identity, &challenge);
/// assert_eq!(auth.verify_assertion(&assertion).unwrap(), identity);
/// ```
pub fn sign_assertion(
    keypair: &IdentityKeypair,
    identity: &Identity,
    challenge: &Challenge,
) -> SignedAssertion {
    let issued_at = chrono::Utc::now().timestamp_millis().max(1) as u64;
    sign_assertion_at(keypair, identity, challenge, issued_at)
}

/// [`sign_assertion`] with an explicit timestamp.
pub fn sign_assertion_at(
    keypair: &IdentityKeypair,
    identity: &Identity,
    challenge: &Challenge,
    issued_at: u64,
) -> SignedAssertion {
    let signature = keypair.sign(&signing_bytes(identity, challenge, issued_at));
    SignedAssertion {
        identity: identity.to_string(),
        challenge: challenge.to_hex(),
        issued_at,
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        public_key: Some(keypair.public_key().to_hex()),
        signature: signature.to_hex(),
    }
}
