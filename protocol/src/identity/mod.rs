//! # Identity Module
//!
//! The shared identity/key model of DocAuth.
//!
//! 1. **Identity**: a validated, opaque string (usually a DID) naming a
//!    key-holder. Both the authenticator and the ledger key on it.
//! 2. **Keypair**: Ed25519 key material. The holder signs challenges
//!    with it; the core only ever sees the public half.
//! 3. **GeneratedIdentity**: the one-shot "identity + keys" bundle handed
//!    to new holders.
//!
//! Exactly one DID method shape (`did:key`) is generated and exactly one
//! signature family (EdDSA over Ed25519) is accepted. Anything else is out
//! of scope.

pub mod did;
pub mod keypair;

pub use did::{GeneratedIdentity, GeneratedIdentityExport, Identity, IdentityError};
pub use keypair::{IdentityKeypair, PublicKey, Signature};
