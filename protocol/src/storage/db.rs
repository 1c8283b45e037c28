//! # LedgerDb: Persistent Record Store
//!
//! Optional write-through persistence for the document ledger, built on
//! sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                              | Value                     |
//! |-------------|----------------------------------|---------------------------|
//! | `documents` | `digest` (32B) ‖ `version` (8B BE) | `bincode(DocumentRecord)` |
//! | `metadata`  | key (UTF-8)                      | value (bytes)             |
//!
//! Versions are big-endian so that sled's lexicographic order matches
//! numeric order: all versions of one digest are contiguous and ascending,
//! and a full iteration yields records grouped by digest.
//!
//! Pending challenges are never written here.

use sled::{Db, Tree};
use std::path::Path;

use crate::config::{DIGEST_LENGTH, STORAGE_SCHEMA_VERSION};
use crate::crypto::hash::ContentDigest;
use super::RecordStore;
use crate::ledger::DocumentRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored data violates an invariant: a version gap, a key that
    /// disagrees with its record, or an unknown schema.
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

const META_SCHEMA_VERSION: &[u8] = b"schema_version";

const RECORD_KEY_LENGTH: usize = DIGEST_LENGTH + 8;

fn record_key(digest: &ContentDigest, version: u64) -> [u8; RECORD_KEY_LENGTH] {
    let mut key = [0u8; RECORD_KEY_LENGTH];
    key[..DIGEST_LENGTH].copy_from_slice(digest.as_bytes());
    key[DIGEST_LENGTH..].copy_from_slice(&version.to_be_bytes());
    key
}

fn decode_record(bytes: &[u8]) -> DbResult<DocumentRecord> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage for document records.
///
/// sled trees are safe for concurrent use; `LedgerDb` is a cheap handle
/// and can be cloned or shared via `Arc` without extra locking.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    documents: Tree,
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let store = Self {
            documents: db.open_tree("documents")?,
            metadata: db.open_tree("metadata")?,
            db,
        };

        match store.schema_version()? {
            Some(STORAGE_SCHEMA_VERSION) => {}
            Some(stored) => {
                return Err(DbError::Corrupt(format!(
                    "schema version {stored}, expected {STORAGE_SCHEMA_VERSION}"
                )));
            }
            None => {
                store
                    .metadata
                    .insert(META_SCHEMA_VERSION, &STORAGE_SCHEMA_VERSION.to_be_bytes())?;
            }
        }
        Ok(store)
    }

    // -- Record operations --------------------------------------------------

    /// Write one record. Records are immutable; rewriting the same
    /// `(digest, version)` replaces it byte-for-byte.
    pub fn put_record(&self, record: &DocumentRecord) -> DbResult<()> {
        let bytes =
            bincode::serialize(record).map_err(|e| DbError::Serialization(e.to_string()))?;
        self.documents
            .insert(record_key(&record.digest, record.version), bytes)?;
        Ok(())
    }

    /// Every stored record in key order: grouped by digest, versions
    /// ascending within a group.
    pub fn load_all(&self) -> DbResult<Vec<DocumentRecord>> {
        let mut records = Vec::with_capacity(self.documents.len());
        for entry in self.documents.iter() {
            let (key, value) = entry?;
            let record = decode_record(&value)?;
            if key.as_ref() != record_key(&record.digest, record.version) {
                return Err(DbError::Corrupt(format!(
                    "key does not match record {}@{}",
                    record.digest, record.version
                )));
            }
            records.push(record);
        }
        Ok(records)
    }

    // -- Utility operations -------------------------------------------------

    /// Number of records stored.
    pub fn record_count(&self) -> usize {
        self.documents.len()
    }

    /// Schema version recorded in the `metadata` tree.
    pub fn schema_version(&self) -> DbResult<Option<u32>> {
        match self.metadata.get(META_SCHEMA_VERSION)? {
            Some(bytes) => Ok(Some(u32::from_be_bytes(bytes.as_ref().try_into().map_err(
                |_| DbError::Corrupt("invalid schema version bytes".to_string()),
            )?))),
            None => Ok(None),
        }
    }

    /// Block until all buffered writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl RecordStore for LedgerDb {
    fn put_record(&self, record: &DocumentRecord) -> DbResult<()> {
        LedgerDb::put_record(self, record)
    }

    fn load_all(&self) -> DbResult<Vec<DocumentRecord>> {
        LedgerDb::load_all(self)
    }

    fn flush(&self) -> DbResult<()> {
        LedgerDb::flush(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
