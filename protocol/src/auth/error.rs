//! Error types for the challenge-response authenticator.
//!
//! One variant per verification step. Distinct kinds are convenient for
//! a demo and for metrics, but they do tell a caller which step failed;
//! an exposed deployment should collapse them into one opaque
//! "authentication failed" at its boundary.

use thiserror::Error;

use crate::identity::IdentityError;

/// Errors returned by [`Authenticator`](super::Authenticator) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity is empty, blank, oversized or otherwise unusable.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The assertion is missing fields or a field does not decode.
    #[error("malformed assertion: {0}")]
    MalformedAssertion(String),

    /// No pending challenge for the identity: never issued, already
    /// consumed, superseded or expired. These cases are indistinguishable
    /// on purpose.
    #[error("unknown or expired challenge")]
    UnknownOrExpiredChallenge,

    /// The assertion names a challenge other than the pending one.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The signature does not verify, the algorithm is unsupported, or no
    /// key may sign for the identity.
    #[error("invalid signature")]
    InvalidSignature,
}

impl AuthError {
    /// Stable, low-cardinality label for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidIdentity(_) => "invalid_identity",
            Self::MalformedAssertion(_) => "malformed_assertion",
            Self::UnknownOrExpiredChallenge => "unknown_or_expired_challenge",
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::InvalidSignature => "invalid_signature",
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(e: IdentityError) -> Self {
        Self::InvalidIdentity(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_distinct() {
        let errors = [
            AuthError::InvalidIdentity(String::new()),
            AuthError::MalformedAssertion(String::new()),
            AuthError::UnknownOrExpiredChallenge,
            AuthError::ChallengeMismatch,
            AuthError::InvalidSignature,
        ];
        let mut reasons: Vec<_> = errors.iter().map(AuthError::reason).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn identity_error_converts() {
        let err: AuthError = IdentityError::Empty.into();
        assert!(matches!(err, AuthError::InvalidIdentity(_)));
    }
}
