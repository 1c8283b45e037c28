//! # Identity Resolution
//!
//! The seam between "who does this assertion claim to be" and "which key
//! speaks for that identity". The authenticator never decides this on its
//! own; it asks an [`IdentityResolver`].
//!
//! Two resolvers ship with the crate:
//!
//! - [`DeclaredKeyResolver`] trusts the public key the assertion declares.
//!   This is the self-asserted demo model: the signature proves possession
//!   of *a* key, not that the key belongs to the identity.
//! - [`KeyRegistry`] only accepts keys registered for the identity ahead of
//!   time (the node registers every identity it generates).

use dashmap::DashMap;

use crate::crypto::keys::PublicKey;
use crate::identity::Identity;

/// Resolves the public key that is allowed to sign for an identity.
///
/// `declared` is the key carried by the assertion, if any. Returning `None`
/// means "no key may sign for this identity", which the authenticator
/// reports as an invalid signature.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, identity: &Identity, declared: Option<&PublicKey>) -> Option<PublicKey>;
}

/// Accepts whatever key the assertion declares.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredKeyResolver;

impl IdentityResolver for DeclaredKeyResolver {
    fn resolve(&self, _identity: &Identity, declared: Option<&PublicKey>) -> Option<PublicKey> {
        declared.copied()
    }
}

/// A concurrent identity → public key registry.
///
/// The declared key is ignored: only the registered key can sign.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: DashMap<Identity, PublicKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `identity`, replacing any previous binding. Returns the
    /// previous key, if there was one.
    pub fn register(&self, identity: Identity, key: PublicKey) -> Option<PublicKey> {
        let previous = self.keys.insert(identity.clone(), key);
        tracing::debug!(%identity, replaced = previous.is_some(), "identity key registered");
        previous
    }

    /// Drop the binding for `identity`.
    pub fn revoke(&self, identity: &Identity) -> Option<PublicKey> {
        self.keys.remove(identity).map(|(_, key)| key)
    }

    pub fn get(&self, identity: &Identity) -> Option<PublicKey> {
        self.keys.get(identity).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl IdentityResolver for KeyRegistry {
    fn resolve(&self, identity: &Identity, _declared: Option<&PublicKey>) -> Option<PublicKey> {
        self.get(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::IdentityKeypair;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[test]
    fn declared_resolver_echoes_declared_key() {
        let key = IdentityKeypair::generate().public_key();
        assert_eq!(
            DeclaredKeyResolver.resolve(&id("did:example:abc"), Some(&key)),
            Some(key)
        );
        assert_eq!(DeclaredKeyResolver.resolve(&id("did:example:abc"), None), None);
    }

    #[test]
    fn registry_ignores_declared_key() {
        let registry = KeyRegistry::new();
        let registered = IdentityKeypair::generate().public_key();
        let other = IdentityKeypair::generate().public_key();
        registry.register(id("did:example:abc"), registered);

        assert_eq!(
            registry.resolve(&id("did:example:abc"), Some(&other)),
            Some(registered)
        );
    }

    #[test]
    fn registry_unknown_identity_resolves_to_none() {
        let registry = KeyRegistry::new();
        let key = IdentityKeypair::generate().public_key();
        assert_eq!(registry.resolve(&id("did:example:nobody"), Some(&key)), None);
    }

    #[test]
    fn register_replaces_and_revoke_removes() {
        let registry = KeyRegistry::new();
        let first = IdentityKeypair::generate().public_key();
        let second = IdentityKeypair::generate().public_key();

        assert_eq!(registry.register(id("did:example:a"), first), None);
        assert_eq!(registry.register(id("did:example:a"), second), Some(first));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.revoke(&id("did:example:a")), Some(second));
        assert!(registry.is_empty());
    }
}
