//! Ledger error types.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::DbError;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Zero-length content cannot be registered.
    #[error("document content is empty")]
    MissingContent,

    #[error("invalid owner identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    /// Loading persisted records failed. Write-through failures during
    /// registration never surface here.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}
