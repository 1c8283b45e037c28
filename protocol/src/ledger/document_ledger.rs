use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;

use super::error::LedgerError;
use super::record::DocumentRecord;
use crate::crypto::hash::ContentDigest;
use crate::identity::Identity;
use crate::storage::{DbError, RecordStore};

type FailureHook = Arc<dyn Fn(&DbError) + Send + Sync>;

/// Versions of one digest. `records[i]` holds version `i + 1`; the first
/// `persisted` of them are known to be in the store.
#[derive(Debug, Default)]
struct VersionChain {
    records: Vec<DocumentRecord>,
    persisted: usize,
}

/// Versioned, content-addressed document registry.
///
/// Appends happen under the digest's `DashMap` entry guard, so the next
/// version is always `len + 1` and concurrent registrations of the same
/// content serialize cleanly. Different digests never contend beyond a
/// shared shard.
///
/// With a store attached, each digest's persisted versions are always a
/// prefix `1..=k` of its in-memory versions. A failed write is retried,
/// in order, before any later version of the same digest is written.
pub struct DocumentLedger {
    records: DashMap<ContentDigest, VersionChain>,
    store: Option<Box<dyn RecordStore>>,
    on_persist_failure: Option<FailureHook>,
}

impl fmt::Debug for DocumentLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLedger")
            .field("documents", &self.records.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for DocumentLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLedger {
    /// In-memory ledger with no persistence.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            store: None,
            on_persist_failure: None,
        }
    }

    /// Ledger backed by `store`: every persisted record is loaded, and new
    /// records are written through.
    ///
    /// Fails with `Storage(Corrupt)` if any digest's versions are not
    /// exactly `1..=n`.
    pub fn with_store(store: impl RecordStore + 'static) -> Result<Self, LedgerError> {
        let records: DashMap<ContentDigest, VersionChain> = DashMap::new();
        let mut loaded = 0usize;

        for record in store.load_all()? {
            let mut chain = records.entry(record.digest).or_default();
            let expected = chain.records.len() as u64 + 1;
            if record.version != expected {
                return Err(DbError::Corrupt(format!(
                    "{}: found version {}, expected {}",
                    record.digest, record.version, expected
                ))
                .into());
            }
            chain.records.push(record);
            chain.persisted += 1;
            loaded += 1;
        }

        tracing::info!(
            documents = records.len(),
            records = loaded,
            "document ledger loaded from store"
        );

        Ok(Self {
            records,
            store: Some(Box::new(store)),
            on_persist_failure: None,
        })
    }

    /// Call `hook` whenever a write-through fails. The record stays in
    /// memory either way.
    pub fn on_persist_failure(mut self, hook: impl Fn(&DbError) + Send + Sync + 'static) -> Self {
        self.on_persist_failure = Some(Arc::new(hook));
        self
    }

    /// Register `content` under `owner`, returning the new record.
    pub fn register_document(
        &self,
        content: &[u8],
        owner: impl AsRef<str>,
    ) -> Result<DocumentRecord, LedgerError> {
        if content.is_empty() {
            return Err(LedgerError::MissingContent);
        }
        let owner = Identity::new(owner)?;
        let digest = ContentDigest::of(content);

        let mut chain = self.records.entry(digest).or_default();
        let record = DocumentRecord {
            digest,
            version: chain.records.len() as u64 + 1,
            owner,
            created_at: Utc::now(),
        };
        chain.records.push(record.clone());
        // Still under the entry guard: persisted order matches version order.
        self.persist_pending(&mut chain);
        drop(chain);

        tracing::info!(
            digest = %record.digest,
            version = record.version,
            owner = %record.owner,
            "document registered"
        );
        Ok(record)
    }

    /// Write every not-yet-persisted version of `chain`, oldest first,
    /// stopping at the first failure so the store never skips a version.
    fn persist_pending(&self, chain: &mut VersionChain) {
        let Some(store) = &self.store else {
            return;
        };
        while let Some(record) = chain.records.get(chain.persisted) {
            if let Err(e) = store.put_record(record) {
                tracing::error!(
                    digest = %record.digest,
                    version = record.version,
                    error = %e,
                    "failed to persist document record"
                );
                if let Some(hook) = &self.on_persist_failure {
                    hook(&e);
                }
                return;
            }
            chain.persisted += 1;
        }
    }

    /// Latest version registered for `content`, if any.
    pub fn lookup_latest(&self, content: &[u8]) -> Option<DocumentRecord> {
        self.lookup_latest_by_digest(&ContentDigest::of(content))
    }

    pub fn lookup_latest_by_digest(&self, digest: &ContentDigest) -> Option<DocumentRecord> {
        self.records
            .get(digest)
            .and_then(|chain| chain.records.last().cloned())
    }

    /// All versions of `digest`, oldest first. Empty if never registered.
    pub fn history(&self, digest: &ContentDigest) -> Vec<DocumentRecord> {
        self.records
            .get(digest)
            .map(|chain| chain.records.clone())
            .unwrap_or_default()
    }

    /// A specific version. Version `0` never exists.
    pub fn get_version(&self, digest: &ContentDigest, version: u64) -> Option<DocumentRecord> {
        let index = usize::try_from(version.checked_sub(1)?).ok()?;
        self.records
            .get(digest)
            .and_then(|chain| chain.records.get(index).cloned())
    }

    /// Number of distinct digests.
    pub fn document_count(&self) -> usize {
        self.records.len()
    }

    /// Number of records across all digests.
    pub fn record_count(&self) -> usize {
        self.records.iter().map(|entry| entry.value().records.len()).sum()
    }

    /// Number of records held in memory but not yet in the store.
    pub fn unpersisted_count(&self) -> usize {
        if self.store.is_none() {
            return 0;
        }
        self.records
            .iter()
            .map(|entry| entry.value().records.len() - entry.value().persisted)
            .sum()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Flush the backing store, if any.
    pub fn flush(&self) -> Result<(), DbError> {
        match &self.store {
            Some(store) => store.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DbResult, LedgerDb};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const OWNER: &str = "did:example:owner";

    #[test]
    fn first_registration_is_version_one() {
        let ledger = DocumentLedger::new();
        let record = ledger.register_document(b"hello-doc", OWNER).unwrap();

        assert_eq!(record.version, 1);
        assert_eq!(record.digest, ContentDigest::of(b"hello-doc"));
        assert_eq!(record.owner.as_str(), OWNER);
    }

    #[test]
    fn versions_increment_by_one() {
        let ledger = DocumentLedger::new();
        for expected in 1..=5 {
            let record = ledger.register_document(b"doc", OWNER).unwrap();
            assert_eq!(record.version, expected);
            assert_eq!(ledger.lookup_latest(b"doc").unwrap().version, expected);
        }
        assert_eq!(ledger.document_count(), 1);
        assert_eq!(ledger.record_count(), 5);
    }

    #[test]
    fn owner_may_differ_between_versions() {
        let ledger = DocumentLedger::new();
        ledger.register_document(b"doc", "did:example:a").unwrap();
        let second = ledger.register_document(b"doc", "did:example:b").unwrap();

        assert_eq!(second.version, 2);
        let history = ledger.history(&second.digest);
        assert_eq!(history[0].owner.as_str(), "did:example:a");
        assert_eq!(history[1].owner.as_str(), "did:example:b");
    }

    #[test]
    fn unknown_content_is_not_found() {
        let ledger = DocumentLedger::new();
        ledger.register_document(b"known", OWNER).unwrap();
        assert!(ledger.lookup_latest(b"unknown").is_none());
        assert!(ledger.history(&ContentDigest::of(b"unknown")).is_empty());
    }

    #[test]
    fn empty_content_is_rejected() {
        let ledger = DocumentLedger::new();
        assert!(matches!(
            ledger.register_document(b"", OWNER),
            Err(LedgerError::MissingContent)
        ));
        assert_eq!(ledger.document_count(), 0);
    }

    #[test]
    fn blank_owner_is_rejected() {
        let ledger = DocumentLedger::new();
        assert!(matches!(
            ledger.register_document(b"doc", "   "),
            Err(LedgerError::InvalidIdentity(_))
        ));
        assert!(ledger.lookup_latest(b"doc").is_none());
    }

    #[test]
    fn get_version_uses_one_based_index() {
        let ledger = DocumentLedger::new();
        let digest = ledger.register_document(b"doc", OWNER).unwrap().digest;
        ledger.register_document(b"doc", OWNER).unwrap();

        assert!(ledger.get_version(&digest, 0).is_none());
        assert_eq!(ledger.get_version(&digest, 1).unwrap().version, 1);
        assert_eq!(ledger.get_version(&digest, 2).unwrap().version, 2);
        assert!(ledger.get_version(&digest, 3).is_none());
    }

    #[test]
    fn write_through_and_reload_continue_versions() {
        let store = LedgerDb::open_temporary().unwrap();
        let ledger = DocumentLedger::with_store(store.clone()).unwrap();
        ledger.register_document(b"doc", OWNER).unwrap();
        ledger.register_document(b"doc", OWNER).unwrap();
        assert_eq!(store.record_count(), 2);

        let reloaded = DocumentLedger::with_store(store).unwrap();
        assert_eq!(reloaded.lookup_latest(b"doc").unwrap().version, 2);
        assert_eq!(reloaded.register_document(b"doc", OWNER).unwrap().version, 3);
    }

    #[test]
    fn version_gap_in_store_is_corrupt() {
        let store = LedgerDb::open_temporary().unwrap();
        let digest = ContentDigest::of(b"gappy");
        for version in [1, 3] {
            store
                .put_record(&DocumentRecord {
                    digest,
                    version,
                    owner: Identity::new(OWNER).unwrap(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        assert!(matches!(
            DocumentLedger::with_store(store),
            Err(LedgerError::Storage(DbError::Corrupt(_)))
        ));
    }

    /// Store whose writes fail while `failing` is set.
    struct FlakyStore {
        inner: LedgerDb,
        failing: Arc<AtomicBool>,
    }

    impl RecordStore for FlakyStore {
        fn put_record(&self, record: &DocumentRecord) -> DbResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DbError::Serialization("injected write failure".into()));
            }
            self.inner.put_record(record)
        }

        fn load_all(&self) -> DbResult<Vec<DocumentRecord>> {
            self.inner.load_all()
        }

        fn flush(&self) -> DbResult<()> {
            self.inner.flush()
        }
    }

    fn flaky_ledger() -> (DocumentLedger, LedgerDb, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let inner = LedgerDb::open_temporary().unwrap();
        let failing = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ledger = DocumentLedger::with_store(FlakyStore {
            inner: inner.clone(),
            failing: Arc::clone(&failing),
        })
        .unwrap()
        .on_persist_failure(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (ledger, inner, failing, calls)
    }

    #[test]
    fn failed_write_is_retried_before_the_next_version() {
        let (ledger, inner, failing, calls) = flaky_ledger();
        ledger.register_document(b"doc", OWNER).unwrap();

        failing.store(true, Ordering::SeqCst);
        let second = ledger.register_document(b"doc", OWNER).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.lookup_latest(b"doc").unwrap().version, 2);
        assert_eq!(ledger.unpersisted_count(), 1);
        assert_eq!(inner.record_count(), 1);

        failing.store(false, Ordering::SeqCst);
        ledger.register_document(b"doc", OWNER).unwrap();
        assert_eq!(ledger.unpersisted_count(), 0);
        assert_eq!(inner.record_count(), 3);

        let reloaded = DocumentLedger::with_store(inner).unwrap();
        let versions: Vec<u64> = reloaded
            .history(&ContentDigest::of(b"doc"))
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn store_never_skips_a_failed_version() {
        let (ledger, inner, failing, calls) = flaky_ledger();
        ledger.register_document(b"doc", OWNER).unwrap();

        failing.store(true, Ordering::SeqCst);
        ledger.register_document(b"doc", OWNER).unwrap();
        ledger.register_document(b"doc", OWNER).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.record_count(), 3);
        assert_eq!(ledger.unpersisted_count(), 2);

        // Only the dense prefix reached disk, so a restart loads cleanly.
        drop(ledger);
        let reloaded = DocumentLedger::with_store(inner).unwrap();
        assert_eq!(reloaded.lookup_latest(b"doc").unwrap().version, 1);
        assert_eq!(reloaded.register_document(b"doc", OWNER).unwrap().version, 2);
    }

    #[test]
    fn persist_hook_is_not_called_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ledger = DocumentLedger::with_store(LedgerDb::open_temporary().unwrap())
            .unwrap()
            .on_persist_failure(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        ledger.register_document(b"doc", OWNER).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ledger.is_persistent());
    }
}
