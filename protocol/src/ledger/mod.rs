//! # Content-Addressed Document Ledger
//!
//! Documents are identified by the SHA-256 of their bytes. Registering the
//! same bytes again appends a new version; versions for a digest are
//! `1, 2, 3, ...` with no gaps, whatever the concurrency.
//!
//! ```text
//! content ──sha256──▶ ContentDigest ──▶ [v1, v2, ..., vN]
//!                                          │
//!                                          └─ write-through ─▶ RecordStore (optional)
//! ```

pub mod document_ledger;
pub mod error;
pub mod record;

pub use document_ledger::DocumentLedger;
pub use error::LedgerError;
pub use record::DocumentRecord;
