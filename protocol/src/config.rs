//! # Protocol Configuration & Constants
//!
//! Every magic number in DocAuth lives here. The wire formats below are
//! what clients sign and what the ledger persists, so treat a change to
//! any of them as a breaking protocol change.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Domain separation tag prepended to every signed assertion. Keeps an
/// assertion signature from being replayed as a signature over anything
/// else the same key might sign.
pub const ASSERTION_DOMAIN: &[u8] = b"docauth/assertion/v1";

/// Schema version written into the persistent store's metadata tree.
pub const STORAGE_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Prefix of generated identities. The trailing `z` is the multibase tag
/// for base58btc.
pub const DID_KEY_PREFIX: &str = "did:key:z";

/// Random bytes behind a generated identity. Not derived from the key.
pub const GENERATED_IDENTITY_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// The only signature algorithm family accepted in an assertion, named the
/// way JOSE headers name it.
pub const SIGNATURE_ALGORITHM: &str = "EdDSA";

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 secret key (seed) length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Challenge length in bytes. 32 bytes from the OS RNG = 256 bits of entropy.
pub const CHALLENGE_LENGTH: usize = 32;

/// Content digest algorithm. SHA-256, because every external verifier
/// (and every ledger a digest might end up anchored on) already speaks it.
pub const DIGEST_ALGORITHM: &str = "SHA-256";

/// Content digest length in bytes.
pub const DIGEST_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Limits & Timing
// ---------------------------------------------------------------------------

/// Default lifetime of an unconsumed challenge.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(300);

/// How often the node sweeps expired challenges out of memory.
pub const CHALLENGE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Default upper bound on a single uploaded document.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum accepted identity length. Anything longer is not an identifier,
/// it is a payload.
pub const MAX_IDENTITY_LENGTH: usize = 512;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for the challenge-response authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Lifetime of a pending challenge. `None` disables expiry: a challenge
    /// then lives until it is consumed or superseded.
    pub challenge_ttl: Option<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Some(DEFAULT_CHALLENGE_TTL),
        }
    }
}

impl AuthConfig {
    /// Configuration without challenge expiry.
    pub fn without_ttl() -> Self {
        Self {
            challenge_ttl: None,
        }
    }

    /// Build from a TTL in seconds, where `0` means "never expire". This is
    /// the shape CLI flags and environment variables arrive in.
    pub fn from_ttl_secs(secs: u64) -> Self {
        Self {
            challenge_ttl: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_has_at_least_256_bits() {
        assert!(CHALLENGE_LENGTH * 8 >= 256);
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        assert_eq!(AuthConfig::from_ttl_secs(0).challenge_ttl, None);
        assert_eq!(
            AuthConfig::from_ttl_secs(30).challenge_ttl,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn default_config_expires_challenges() {
        assert_eq!(
            AuthConfig::default().challenge_ttl,
            Some(DEFAULT_CHALLENGE_TTL)
        );
    }
}
