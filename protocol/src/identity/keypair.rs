//! Re-exports of the key types for the identity layer.
//!
//! The canonical implementations live in [`crate::crypto::keys`]; this
//! module lets identity-related code import everything from one namespace.

pub use crate::crypto::keys::{IdentityKeypair, KeyError, PublicKey, Signature};
