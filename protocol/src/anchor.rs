//! # Ledger Anchoring
//!
//! An [`Anchor`] publishes a registered record somewhere outside this
//! process (a transparency log, a blockchain, a notary) and returns an
//! acknowledgement. The document ledger is authoritative on its own;
//! anchoring is an add-on that the node runs after registration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::hash::ContentDigest;
use crate::ledger::DocumentRecord;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("anchor unavailable: {0}")]
    Unavailable(String),

    #[error("anchor rejected record: {0}")]
    Rejected(String),
}

/// Receipt for an anchored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorAck {
    pub receipt: Uuid,
    pub digest: ContentDigest,
    pub version: u64,
    pub anchored_at: DateTime<Utc>,
}

impl AnchorAck {
    fn for_record(record: &DocumentRecord) -> Self {
        Self {
            receipt: Uuid::new_v4(),
            digest: record.digest,
            version: record.version,
            anchored_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait Anchor: Send + Sync {
    async fn anchor(&self, record: &DocumentRecord) -> Result<AnchorAck, AnchorError>;
}

/// Acknowledges every record without publishing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnchor;

#[async_trait]
impl Anchor for NullAnchor {
    async fn anchor(&self, record: &DocumentRecord) -> Result<AnchorAck, AnchorError> {
        Ok(AnchorAck::for_record(record))
    }
}

/// Append-only in-memory anchor log.
#[derive(Debug, Default)]
pub struct MemoryAnchor {
    log: RwLock<Vec<AnchorAck>>,
}

impl MemoryAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything anchored so far, in order.
    pub fn entries(&self) -> Vec<AnchorAck> {
        self.log.read().clone()
    }

    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    /// Whether `(digest, version)` has been anchored.
    pub fn contains(&self, digest: &ContentDigest, version: u64) -> bool {
        self.log
            .read()
            .iter()
            .any(|ack| ack.digest == *digest && ack.version == version)
    }
}

#[async_trait]
impl Anchor for MemoryAnchor {
    async fn anchor(&self, record: &DocumentRecord) -> Result<AnchorAck, AnchorError> {
        let ack = AnchorAck::for_record(record);
        self.log.write().push(ack.clone());
        tracing::debug!(digest = %record.digest, version = record.version, receipt = %ack.receipt, "record anchored");
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DocumentLedger;

    #[tokio::test]
    async fn memory_anchor_appends_in_order() {
        let ledger = DocumentLedger::new();
        let anchor = MemoryAnchor::new();
        let v1 = ledger.register_document(b"doc", "did:example:abc").unwrap();
        let v2 = ledger.register_document(b"doc", "did:example:abc").unwrap();

        let ack1 = anchor.anchor(&v1).await.unwrap();
        let ack2 = anchor.anchor(&v2).await.unwrap();

        assert_ne!(ack1.receipt, ack2.receipt);
        assert_eq!(anchor.len(), 2);
        assert_eq!(anchor.entries()[1].version, 2);
        assert!(anchor.contains(&v1.digest, 1));
        assert!(!anchor.contains(&v1.digest, 3));
    }

    #[tokio::test]
    async fn null_anchor_acknowledges_without_state() {
        let ledger = DocumentLedger::new();
        let record = ledger.register_document(b"doc", "did:example:abc").unwrap();
        let ack = NullAnchor.anchor(&record).await.unwrap();
        assert_eq!(ack.digest, record.digest);
        assert_eq!(ack.version, 1);
    }
}
