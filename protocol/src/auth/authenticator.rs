//! The challenge-response authenticator.
//!
//! ```text
//! holder                         Authenticator
//!   | -- issue_challenge(id) -->  |  store[id] = fresh nonce
//!   | <------- challenge -------- |
//!   | sign(id, challenge, t)      |
//!   | -- verify_assertion(a) -->  |  parse -> lookup -> compare -> verify -> consume
//!   | <-------- identity -------- |
//! ```
//!
//! Compare runs before signature verification: it is cheap and rejects
//! stale or crossed assertions without touching the curve.

use std::sync::Arc;

use super::assertion::SignedAssertion;
use super::challenge::{Challenge, ChallengeStore};
use super::error::AuthError;
use crate::config::AuthConfig;
use crate::crypto::signatures::verify_with_algorithm;
use crate::identity::Identity;
use crate::resolver::{DeclaredKeyResolver, IdentityResolver};

/// Issues challenges and verifies assertions against them.
///
/// Owns its challenge store outright; nothing outside this type can see or
/// mutate pending challenges. Share it across request handlers behind an
/// `Arc`.
pub struct Authenticator {
    challenges: ChallengeStore,
    resolver: Arc<dyn IdentityResolver>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("pending", &self.challenges.len())
            .finish()
    }
}

impl Authenticator {
    /// Authenticator that trusts the key declared in each assertion.
    pub fn new(config: AuthConfig) -> Self {
        Self::with_resolver(config, Arc::new(DeclaredKeyResolver))
    }

    /// Authenticator that asks `resolver` which key may sign for an identity.
    pub fn with_resolver(config: AuthConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            challenges: ChallengeStore::new(config.challenge_ttl),
            resolver,
        }
    }

    /// Issue a fresh challenge for `identity`, replacing any pending one.
    pub fn issue_challenge(&self, identity: impl AsRef<str>) -> Result<Challenge, AuthError> {
        let identity = Identity::new(identity)?;
        let challenge = self.challenges.issue(&identity);
        tracing::debug!(%identity, "challenge issued");
        tracing::trace!(%identity, challenge = %challenge, "challenge value");
        Ok(challenge)
    }

    /// Verify `assertion` and consume its challenge.
    ///
    /// Returns the authenticated identity. On `ChallengeMismatch` or
    /// `InvalidSignature` the pending challenge survives, so a holder can
    /// retry; on success it is gone, so the same assertion cannot be
    /// replayed.
    pub fn verify_assertion(&self, assertion: &SignedAssertion) -> Result<Identity, AuthError> {
        let parsed = assertion.parse().map_err(|e| {
            tracing::debug!(reason = e.reason(), "assertion rejected");
            e
        })?;
        let message = parsed.signing_bytes();

        let outcome = self.challenges.consume_with(&parsed.identity, |pending| {
            if !pending.ct_eq(&parsed.challenge) {
                return Err(AuthError::ChallengeMismatch);
            }
            let key = self
                .resolver
                .resolve(&parsed.identity, parsed.public_key.as_ref())
                .ok_or(AuthError::InvalidSignature)?;
            verify_with_algorithm(&parsed.algorithm, &key, &message, &parsed.signature)
                .map_err(|_| AuthError::InvalidSignature)
        });

        match outcome {
            Ok(()) => {
                tracing::info!(identity = %parsed.identity, "assertion verified");
                Ok(parsed.identity)
            }
            Err(e) => {
                tracing::debug!(identity = %parsed.identity, reason = e.reason(), "assertion rejected");
                Err(e)
            }
        }
    }

    /// Number of outstanding challenges.
    pub fn pending_count(&self) -> usize {
        self.challenges.len()
    }

    /// Drop expired challenges; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let purged = self.challenges.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "expired challenges purged");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::assertion::{sign_assertion, sign_assertion_at};
    use crate::crypto::keys::IdentityKeypair;
    use crate::resolver::KeyRegistry;
    use std::time::Duration;

    fn setup() -> (Authenticator, IdentityKeypair, Identity) {
        (
            Authenticator::new(AuthConfig::without_ttl()),
            IdentityKeypair::generate(),
            Identity::new("did:example:abc").unwrap(),
        )
    }

    #[test]
    fn issue_rejects_blank_identity() {
        let (auth, _, _) = setup();
        assert!(matches!(
            auth.issue_challenge(""),
            Err(AuthError::InvalidIdentity(_))
        ));
        assert!(matches!(
            auth.issue_challenge(" \t"),
            Err(AuthError::InvalidIdentity(_))
        ));
        assert_eq!(auth.pending_count(), 0);
    }

    #[test]
    fn happy_path_echoes_identity() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let assertion = sign_assertion(&kp, &identity, &challenge);

        assert_eq!(auth.verify_assertion(&assertion).unwrap(), identity);
        assert_eq!(auth.pending_count(), 0);
    }

    #[test]
    fn replay_is_rejected() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let assertion = sign_assertion(&kp, &identity, &challenge);

        auth.verify_assertion(&assertion).unwrap();
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::UnknownOrExpiredChallenge)
        );
    }

    #[test]
    fn never_issued_is_unknown() {
        let (auth, kp, identity) = setup();
        let assertion = sign_assertion(&kp, &identity, &Challenge::generate());
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::UnknownOrExpiredChallenge)
        );
    }

    #[test]
    fn superseded_challenge_mismatches() {
        let (auth, kp, identity) = setup();
        let first = auth.issue_challenge(identity.as_str()).unwrap();
        let _second = auth.issue_challenge(identity.as_str()).unwrap();

        let stale = sign_assertion(&kp, &identity, &first);
        assert_eq!(
            auth.verify_assertion(&stale),
            Err(AuthError::ChallengeMismatch)
        );
    }

    #[test]
    fn mismatch_does_not_consume() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();

        let wrong = sign_assertion(&kp, &identity, &Challenge::generate());
        assert_eq!(
            auth.verify_assertion(&wrong),
            Err(AuthError::ChallengeMismatch)
        );

        let right = sign_assertion(&kp, &identity, &challenge);
        assert!(auth.verify_assertion(&right).is_ok());
    }

    #[test]
    fn bad_signature_does_not_consume() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();

        // Signed by one key, declaring another.
        let mut forged = sign_assertion(&kp, &identity, &challenge);
        forged.public_key = Some(IdentityKeypair::generate().public_key().to_hex());
        assert_eq!(
            auth.verify_assertion(&forged),
            Err(AuthError::InvalidSignature)
        );

        let genuine = sign_assertion(&kp, &identity, &challenge);
        assert!(auth.verify_assertion(&genuine).is_ok());
    }

    #[test]
    fn substituted_identity_fails_signature() {
        let (auth, kp, identity) = setup();
        let mallory = Identity::new("did:example:mallory").unwrap();
        let challenge = auth.issue_challenge(mallory.as_str()).unwrap();

        // Signed for abc, relabelled as mallory.
        let mut assertion = sign_assertion(&kp, &identity, &challenge);
        assertion.identity = mallory.to_string();
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_issued_at_fails_signature() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let mut assertion = sign_assertion_at(&kp, &identity, &challenge, 1_000);
        assertion.issued_at = 2_000;
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn unsupported_algorithm_is_invalid_signature() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let mut assertion = sign_assertion(&kp, &identity, &challenge);
        assertion.algorithm = "ES256K".into();
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn missing_declared_key_with_declared_resolver_is_invalid_signature() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let mut assertion = sign_assertion(&kp, &identity, &challenge);
        assertion.public_key = None;
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn malformed_assertion_does_not_touch_store() {
        let (auth, kp, identity) = setup();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let mut assertion = sign_assertion(&kp, &identity, &challenge);
        assertion.signature = "zz".into();

        assert!(matches!(
            auth.verify_assertion(&assertion),
            Err(AuthError::MalformedAssertion(_))
        ));
        assert_eq!(auth.pending_count(), 1);
    }

    #[test]
    fn expired_challenge_behaves_like_unknown() {
        let auth = Authenticator::new(AuthConfig {
            challenge_ttl: Some(Duration::from_millis(10)),
        });
        let kp = IdentityKeypair::generate();
        let identity = Identity::new("did:example:slow").unwrap();
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let assertion = sign_assertion(&kp, &identity, &challenge);
        assert_eq!(
            auth.verify_assertion(&assertion),
            Err(AuthError::UnknownOrExpiredChallenge)
        );
        assert_eq!(auth.pending_count(), 0);
    }

    #[test]
    fn registry_resolver_rejects_unregistered_keys() {
        let registry = Arc::new(KeyRegistry::new());
        let auth = Authenticator::with_resolver(AuthConfig::without_ttl(), registry.clone());
        let owner = IdentityKeypair::generate();
        let intruder = IdentityKeypair::generate();
        let identity = Identity::new("did:example:bound").unwrap();
        registry.register(identity.clone(), owner.public_key());

        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let intruding = sign_assertion(&intruder, &identity, &challenge);
        assert_eq!(
            auth.verify_assertion(&intruding),
            Err(AuthError::InvalidSignature)
        );

        let genuine = sign_assertion(&owner, &identity, &challenge);
        assert_eq!(auth.verify_assertion(&genuine).unwrap(), identity);
    }

    #[test]
    fn challenges_are_per_identity() {
        let (auth, kp, alice) = setup();
        let bob = Identity::new("did:example:bob").unwrap();
        let alice_challenge = auth.issue_challenge(alice.as_str()).unwrap();
        let bob_challenge = auth.issue_challenge(bob.as_str()).unwrap();
        assert_eq!(auth.pending_count(), 2);

        // Bob's challenge presented under Alice's identity.
        let crossed = sign_assertion(&kp, &alice, &bob_challenge);
        assert_eq!(
            auth.verify_assertion(&crossed),
            Err(AuthError::ChallengeMismatch)
        );

        assert!(auth
            .verify_assertion(&sign_assertion(&kp, &alice, &alice_challenge))
            .is_ok());
        assert!(auth
            .verify_assertion(&sign_assertion(&kp, &bob, &bob_challenge))
            .is_ok());
    }

    #[test]
    fn concurrent_verifies_of_one_assertion_succeed_once() {
        let (auth, kp, identity) = setup();
        let auth = Arc::new(auth);
        let challenge = auth.issue_challenge(identity.as_str()).unwrap();
        let assertion = Arc::new(sign_assertion(&kp, &identity, &challenge));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let auth = Arc::clone(&auth);
                let assertion = Arc::clone(&assertion);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    auth.verify_assertion(&assertion)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == AuthError::UnknownOrExpiredChallenge));
    }
}
