//! # Sessions
//!
//! A successful `POST /assertions/verify` mints an opaque bearer token.
//! Document registration requires that token; the identity it names is the
//! one that passed verification, never one the caller asserts in a header.
//!
//! Sessions expire after a fixed TTL and the store is capped at
//! `max_entries`. Expired sessions are refused on lookup and swept by the
//! node's purge loop.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use docauth_protocol::identity::Identity;

/// Default session lifetime, in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 900;

/// Upper bound on live sessions held in memory.
pub const MAX_SESSIONS: usize = 100_000;

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: Instant,
}

/// Bearer-token sessions for authenticated identities.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Start a session for `identity` and return its token.
    ///
    /// At capacity, expired sessions are swept first; if the store is still
    /// full, the session closest to expiry is evicted.
    pub fn create(&self, identity: Identity) -> Uuid {
        if self.sessions.len() >= self.max_entries {
            self.purge_expired();
            if self.sessions.len() >= self.max_entries {
                let oldest = self
                    .sessions
                    .iter()
                    .min_by_key(|entry| entry.value().expires_at)
                    .map(|entry| *entry.key());
                if let Some(token) = oldest {
                    self.sessions.remove(&token);
                }
            }
        }

        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                identity,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// The identity behind `token`, if the session exists and is live.
    /// An expired session is removed on the way out.
    pub fn authenticate(&self, token: &Uuid) -> Option<Identity> {
        match self.sessions.entry(*token) {
            Entry::Occupied(entry) => {
                if Instant::now() < entry.get().expires_at {
                    Some(entry.get().identity.clone())
                } else {
                    entry.remove();
                    None
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now < session.expires_at);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("did:example:alice").unwrap()
    }

    #[test]
    fn token_resolves_to_its_identity() {
        let store = SessionStore::new(Duration::from_secs(60), 16);
        let token = store.create(alice());

        assert_eq!(store.authenticate(&token), Some(alice()));
        assert_eq!(store.authenticate(&Uuid::new_v4()), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn each_login_gets_a_distinct_token() {
        let store = SessionStore::new(Duration::from_secs(60), 16);
        assert_ne!(store.create(alice()), store.create(alice()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn expired_session_is_refused_and_removed() {
        let store = SessionStore::new(Duration::ZERO, 16);
        let token = store.create(alice());

        assert_eq!(store.authenticate(&token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let expired = SessionStore::new(Duration::ZERO, 16);
        expired.create(alice());
        expired.create(alice());
        assert_eq!(expired.purge_expired(), 2);
        assert!(expired.is_empty());

        let live = SessionStore::new(Duration::from_secs(60), 16);
        live.create(alice());
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn store_never_exceeds_capacity() {
        let store = SessionStore::new(Duration::from_secs(60), 4);
        let first = store.create(alice());
        std::thread::sleep(Duration::from_millis(2));
        for _ in 0..10 {
            store.create(alice());
        }

        assert_eq!(store.len(), 4);
        assert_eq!(store.authenticate(&first), None);
    }
}
