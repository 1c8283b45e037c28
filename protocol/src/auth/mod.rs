//! # Challenge-Response Authentication
//!
//! Proves that a caller holds the private key for an identity without the
//! key ever leaving the caller:
//!
//! 1. [`Authenticator::issue_challenge`] hands out a random 256-bit nonce.
//! 2. The holder signs `{identity, challenge, issued_at}` locally
//!    ([`sign_assertion`]).
//! 3. [`Authenticator::verify_assertion`] checks the signature against the
//!    pending challenge and consumes it.
//!
//! Challenges are single-use, one per identity, and optionally expire.

pub mod assertion;
pub mod authenticator;
pub mod challenge;
pub mod error;

pub use assertion::{
    sign_assertion, sign_assertion_at, signing_bytes, ParsedAssertion, SignedAssertion,
};
pub use authenticator::Authenticator;
pub use challenge::{Challenge, ChallengeStore};
pub use error::AuthError;
