// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DocAuth Protocol: Core Library
//!
//! Two small services that share one identity model:
//!
//! - **auth**: DID challenge-response authentication. Issue a nonce, let
//!   the holder sign it, verify and consume. Single-use, replay-proof.
//! - **ledger**: a content-addressed document registry. SHA-256 names the
//!   document; every re-registration appends the next version.
//!
//! Supporting modules:
//!
//! - **crypto**: Ed25519 keys and signatures, SHA-256 digests.
//! - **identity**: validated identities and generated `did:key` bundles.
//! - **resolver**: which public key may sign for an identity.
//! - **anchor**: publishing registered records to an external log.
//! - **storage**: optional sled persistence for the ledger.
//! - **config**: protocol constants and authenticator settings.
//!
//! ## Quick start
//!
//! ```
//! use docauth_protocol::auth::{sign_assertion, Authenticator};
//! use docauth_protocol::config::AuthConfig;
//! use docauth_protocol::identity::GeneratedIdentity;
//! use docauth_protocol::ledger::DocumentLedger;
//!
//! let auth = Authenticator::new(AuthConfig::default());
//! let holder = GeneratedIdentity::new();
//!
//! let challenge = auth.issue_challenge(holder.identity.as_str()).unwrap();
//! let assertion = sign_assertion(&holder.keypair, &holder.identity, &challenge);
//! let who = auth.verify_assertion(&assertion).unwrap();
//!
//! let ledger = DocumentLedger::new();
//! let record = ledger.register_document(b"hello-doc", who.as_str()).unwrap();
//! assert_eq!(record.version, 1);
//! ```
//!
//! No global state: every store is owned by the value that uses it, and
//! every cross-thread mutation happens under a per-key lock.

pub mod anchor;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod identity;
pub mod ledger;
pub mod resolver;
pub mod storage;
