//! In-memory watchlist mirrored to a [`WatchlistBackend`].
use crate::error::PersistError;
use crate::models::MovieRecord;
use crate::persistence::WatchlistBackend;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// What happens to the in-memory list when the backend rejects a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Keep the mutation and report the error.
    #[default]
    Optimistic,
    /// Undo the mutation and report the error.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(MovieRecord),
    /// An entry with this id was already present; nothing changed.
    Duplicate(MovieRecord),
}

pub struct WatchlistStore {
    records: Vec<MovieRecord>,
    backend: Arc<dyn WatchlistBackend>,
    policy: SyncPolicy,
}

impl WatchlistStore {
    pub fn new(backend: Arc<dyn WatchlistBackend>, policy: SyncPolicy) -> Self {
        Self {
            records: Vec::new(),
            backend,
            policy,
        }
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Replace the in-memory list with the backend's contents.
    pub async fn load(&mut self) -> Result<&[MovieRecord], PersistError> {
        let loaded = self.backend.load().await?;
        let mut seen = HashSet::new();
        let total = loaded.len();
        self.records = loaded
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        if self.records.len() != total {
            warn!(
                "Dropped {} duplicate watchlist entries on load",
                total - self.records.len()
            );
        }
        info!("Loaded {} watchlist entries", self.records.len());
        Ok(&self.records)
    }

    pub async fn add(&mut self, record: MovieRecord) -> Result<AddOutcome, PersistError> {
        if let Some(existing) = self.get(&record.id) {
            info!("Skipping duplicate '{}' ({})", existing.title, existing.id);
            return Ok(AddOutcome::Duplicate(existing.clone()));
        }

        let stamped = record.stamped_now();
        self.records.push(stamped.clone());
        if let Err(e) = self.backend.record_added(&stamped, &self.records).await {
            warn!("Failed to persist added '{}': {}", stamped.id, e);
            if self.policy == SyncPolicy::Confirmed {
                self.records.pop();
            }
            return Err(e);
        }
        info!("Added '{}' ({}) to watchlist", stamped.title, stamped.id);
        Ok(AddOutcome::Added(stamped))
    }

    pub async fn remove(&mut self, id: &str) -> Result<Option<MovieRecord>, PersistError> {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let removed = self.records.remove(pos);
        if let Err(e) = self.backend.record_removed(id, &self.records).await {
            warn!("Failed to persist removal of '{}': {}", id, e);
            if self.policy == SyncPolicy::Confirmed {
                self.records.insert(pos, removed);
            }
            return Err(e);
        }
        info!("Removed '{}' ({}) from watchlist", removed.title, removed.id);
        Ok(Some(removed))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&MovieRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{LocalBackend, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn record(id: &str) -> MovieRecord {
        MovieRecord::new(id, format!("Title {id}"), format!("http://img/{id}"), "2000")
    }

    fn local_store(policy: SyncPolicy) -> WatchlistStore {
        WatchlistStore::new(Arc::new(LocalBackend::new(MemoryStore::new())), policy)
    }

    #[derive(Default)]
    struct FlakyBackend {
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WatchlistBackend for FlakyBackend {
        async fn load(&self) -> Result<Vec<MovieRecord>, PersistError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PersistError::Storage(std::io::Error::other("unreadable")));
            }
            Ok(vec![record("a"), record("b"), record("a")])
        }

        async fn record_added(
            &self,
            _record: &MovieRecord,
            _snapshot: &[MovieRecord],
        ) -> Result<(), PersistError> {
            self.outcome()
        }

        async fn record_removed(
            &self,
            _id: &str,
            _snapshot: &[MovieRecord],
        ) -> Result<(), PersistError> {
            self.outcome()
        }
    }

    impl FlakyBackend {
        fn outcome(&self) -> Result<(), PersistError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(PersistError::Storage(std::io::Error::other("quota exceeded")))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn add_then_contains_and_remove_then_not() {
        let mut store = local_store(SyncPolicy::Optimistic);
        let outcome = store.add(record("tt1")).await.unwrap();
        let AddOutcome::Added(added) = outcome else {
            panic!("expected Added");
        };
        assert!(added.date_added.is_some());
        assert!(store.contains("tt1"));

        let removed = store.remove("tt1").await.unwrap();
        assert_eq!(removed.map(|r| r.id), Some("tt1".to_string()));
        assert!(!store.contains("tt1"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn duplicate_add_is_noop() {
        let mut store = local_store(SyncPolicy::Optimistic);
        store.add(record("tt1")).await.unwrap();
        let first_stamp = store.get("tt1").unwrap().date_added.clone();

        let again = store.add(record("tt1")).await.unwrap();
        assert!(matches!(again, AddOutcome::Duplicate(ref r) if r.date_added == first_stamp));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_is_noop_without_sync() {
        let backend = Arc::new(FlakyBackend::default());
        let mut store = WatchlistStore::new(backend.clone(), SyncPolicy::Optimistic);
        assert_eq!(store.remove("missing").await.unwrap(), None);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ids_stay_unique_across_mixed_operations() {
        let mut store = local_store(SyncPolicy::Optimistic);
        let ops = [
            ("add", "a"),
            ("add", "b"),
            ("add", "a"),
            ("remove", "b"),
            ("add", "b"),
            ("add", "b"),
            ("remove", "a"),
            ("remove", "a"),
            ("add", "a"),
            ("add", "c"),
        ];
        for (op, id) in ops {
            match op {
                "add" => {
                    store.add(record(id)).await.unwrap();
                }
                _ => {
                    store.remove(id).await.unwrap();
                }
            }
            let mut ids: Vec<_> = store.records().iter().map(|r| r.id.clone()).collect();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before);
        }
        let ids: Vec<_> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn load_reproduces_persisted_sequence() {
        let backend = Arc::new(LocalBackend::new(MemoryStore::new()));
        let mut writer = WatchlistStore::new(backend.clone(), SyncPolicy::Optimistic);
        writer.add(record("x")).await.unwrap();
        writer.add(record("y")).await.unwrap();

        let mut reader = WatchlistStore::new(backend, SyncPolicy::Optimistic);
        let loaded = reader.load().await.unwrap().to_vec();
        assert_eq!(loaded, writer.records());
    }

    #[tokio::test]
    async fn load_drops_duplicate_ids() {
        let mut store = WatchlistStore::new(Arc::new(FlakyBackend::default()), SyncPolicy::Optimistic);
        let ids: Vec<_> = store
            .load()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_load_keeps_current_records_and_writes_nothing() {
        let backend = Arc::new(FlakyBackend::default());
        let mut store = WatchlistStore::new(backend.clone(), SyncPolicy::Optimistic);
        store.add(record("kept")).await.unwrap();
        let writes = backend.calls.load(Ordering::SeqCst);

        backend.failing.store(true, Ordering::SeqCst);
        assert!(store.load().await.is_err());
        assert_eq!(store.len(), 1);
        assert!(store.contains("kept"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), writes);
    }

    #[tokio::test]
    async fn optimistic_policy_keeps_mutation_on_failure() {
        let backend = Arc::new(FlakyBackend::default());
        backend.failing.store(true, Ordering::SeqCst);
        let mut store = WatchlistStore::new(backend.clone(), SyncPolicy::Optimistic);

        assert!(store.add(record("tt1")).await.is_err());
        assert!(store.contains("tt1"));

        assert!(store.remove("tt1").await.is_err());
        assert!(!store.contains("tt1"));
    }

    #[tokio::test]
    async fn confirmed_policy_rolls_back_on_failure() {
        let backend = Arc::new(FlakyBackend::default());
        let mut store = WatchlistStore::new(backend.clone(), SyncPolicy::Confirmed);
        store.add(record("a")).await.unwrap();
        store.add(record("b")).await.unwrap();

        backend.failing.store(true, Ordering::SeqCst);
        assert!(store.add(record("c")).await.is_err());
        assert!(!store.contains("c"));

        assert!(store.remove("a").await.is_err());
        let ids: Vec<_> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
