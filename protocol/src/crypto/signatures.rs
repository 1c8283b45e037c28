//! # Digital Signatures
//!
//! Ed25519 signing and verification for challenge assertions.
//!
//! The algorithm check lives here rather than in the authenticator so that
//! the one place that decides "is this an EdDSA signature we accept" is
//! the same place that verifies it. Verification is strict (see
//! [`PublicKey::verify`]).

use thiserror::Error;

use super::keys::{IdentityKeypair, PublicKey, Signature};
use crate::config::SIGNATURE_ALGORITHM;

/// Errors during signature verification.
///
/// Callers collapse all of these into one "invalid signature" outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Sign `message` with `keypair`.
pub fn sign(keypair: &IdentityKeypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verify an Ed25519 signature over `message`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}

/// Verify a signature that arrived tagged with an algorithm name.
///
/// Only [`SIGNATURE_ALGORITHM`] (`"EdDSA"`) is accepted; the comparison is
/// exact, since JOSE algorithm names are case-sensitive.
pub fn verify_with_algorithm(
    algorithm: &str,
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    if algorithm != SIGNATURE_ALGORITHM {
        return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    if verify(public_key, message, signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}
