//! Single-use challenges and the store that owns them.
//!
//! At most one challenge is pending per identity. Issuing replaces,
//! verifying consumes, and the TTL (if configured) silently retires. All
//! three paths go through the same `DashMap` shard lock for the identity,
//! so for any one identity they are linearizable.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use crate::config::CHALLENGE_LENGTH;
use crate::identity::Identity;

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// A 256-bit random nonce. Hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Challenge([u8; CHALLENGE_LENGTH]);

impl Challenge {
    /// Draw a fresh challenge from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CHALLENGE_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; CHALLENGE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Constant-time equality. Runtime depends only on the length, which is
    /// fixed, never on where the first differing byte sits.
    pub fn ct_eq(&self, other: &Challenge) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl FromStr for Challenge {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|_| AuthError::MalformedAssertion("challenge is not valid hex".into()))?;
        let bytes: [u8; CHALLENGE_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            AuthError::MalformedAssertion(format!(
                "challenge must be {CHALLENGE_LENGTH} bytes"
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl From<Challenge> for String {
    fn from(c: Challenge) -> Self {
        c.to_hex()
    }
}

impl TryFrom<String> for Challenge {
    type Error = AuthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Challenge {
    // Enough to correlate in a debugger, not enough to replay.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Challenge({}...)", &self.to_hex()[..8])
    }
}

// ---------------------------------------------------------------------------
// ChallengeStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct PendingChallenge {
    challenge: Challenge,
    issued_at: Instant,
}

/// Pending challenges keyed by identity.
///
/// Never persisted. A restart invalidates every outstanding challenge,
/// which is the correct outcome for single-use nonces.
#[derive(Debug)]
pub struct ChallengeStore {
    pending: DashMap<Identity, PendingChallenge>,
    ttl: Option<Duration>,
}

impl ChallengeStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Issue a new challenge for `identity`, superseding any pending one.
    pub fn issue(&self, identity: &Identity) -> Challenge {
        let challenge = Challenge::generate();
        let previous = self.pending.insert(
            identity.clone(),
            PendingChallenge {
                challenge,
                issued_at: Instant::now(),
            },
        );
        if previous.is_some() {
            tracing::debug!(%identity, "pending challenge superseded");
        }
        challenge
    }

    /// Run `check` against the pending challenge for `identity` and consume
    /// it if, and only if, `check` succeeds.
    ///
    /// The lookup, the expiry test, `check` and the removal all happen
    /// under the identity's entry guard. Two concurrent callers for the
    /// same identity are serialized; the loser sees no pending challenge.
    /// A failing `check` leaves the challenge in place.
    pub fn consume_with<F>(&self, identity: &Identity, check: F) -> Result<(), AuthError>
    where
        F: FnOnce(&Challenge) -> Result<(), AuthError>,
    {
        match self.pending.entry(identity.clone()) {
            Entry::Vacant(_) => Err(AuthError::UnknownOrExpiredChallenge),
            Entry::Occupied(entry) => {
                if self.is_expired(entry.get()) {
                    entry.remove();
                    return Err(AuthError::UnknownOrExpiredChallenge);
                }
                check(&entry.get().challenge)?;
                entry.remove();
                Ok(())
            }
        }
    }

    /// Drop every expired challenge. Returns how many were removed.
    ///
    /// Not needed for correctness (expired entries are rejected on use);
    /// this only reclaims memory from identities that never came back.
    pub fn purge_expired(&self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| !self.is_expired(pending));
        before.saturating_sub(self.pending.len())
    }

    /// Number of pending challenges, expired-but-unpurged ones included.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, pending: &PendingChallenge) -> bool {
        self.ttl
            .is_some_and(|ttl| pending.issued_at.elapsed() >= ttl)
    }
}
