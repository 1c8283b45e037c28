//! # Storage Module
//!
//! Optional persistence for the document ledger. The ledger is fully
//! functional in memory; a [`RecordStore`] only adds write-through
//! durability and a reload path on startup. [`LedgerDb`] is the sled-backed
//! implementation.
//!
//! Bincode is the on-disk encoding. JSON is for the API.

pub mod db;

pub use db::{DbError, DbResult, LedgerDb};

use crate::ledger::DocumentRecord;

/// Durable backing for a [`DocumentLedger`](crate::ledger::DocumentLedger).
///
/// Implementations must key records by `(digest, version)` so that writing
/// the same record twice leaves one copy.
pub trait RecordStore: Send + Sync {
    fn put_record(&self, record: &DocumentRecord) -> DbResult<()>;

    /// Every stored record, grouped by digest with versions ascending.
    fn load_all(&self) -> DbResult<Vec<DocumentRecord>>;

    fn flush(&self) -> DbResult<()>;
}
