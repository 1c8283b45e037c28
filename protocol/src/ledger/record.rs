//! The immutable unit the ledger stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::ContentDigest;
use crate::identity::Identity;

/// One registered version of a document.
///
/// Created once by [`DocumentLedger::register_document`](super::DocumentLedger::register_document)
/// and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// SHA-256 of the registered content, hex on the wire.
    pub digest: ContentDigest,
    /// 1-based, dense per digest.
    pub version: u64,
    /// Identity that registered this version.
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
}
