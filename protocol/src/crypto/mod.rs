//! # Cryptographic Primitives for DocAuth
//!
//! Two concerns, two well-audited building blocks:
//!
//! - **Ed25519** (via `ed25519-dalek`) for identity keys and assertion
//!   signatures.
//! - **SHA-256** (via `sha2`) for content addressing.
//!
//! Everything here is a thin, typed wrapper. Nothing is rolled by hand.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{sha256, sha256_array, ContentDigest, DigestParseError};
pub use keys::{IdentityKeypair, KeyError, PublicKey, Signature};
pub use signatures::{sign, verify, verify_with_algorithm, SignatureError};
