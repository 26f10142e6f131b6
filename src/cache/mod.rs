//! Client cache: the last-known-good request list plus the ledger of optimistic updates.
//!
//! The snapshot doubles as the offline fallback and as the buffer optimistic updates land in.
//! Every update is applied here first, whether or not the remote store accepts it, so the
//! dashboard and the fallback never disagree with each other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::models::{CommitRecord, CommitState, RequestItem, RequestPatch};
use crate::normalize::{apply_patch, normalize_all, timestamp};
use crate::sources::{LocalStore, RequestSource, SourceError};

/// Ledger entries kept in memory; older ones are dropped first.
const LEDGER_CAPACITY: usize = 256;

#[derive(Default)]
struct CommitLedger {
    next_seq: u64,
    records: VecDeque<CommitRecord>,
}

#[derive(Clone)]
pub struct ClientCache {
    store: LocalStore,
    /// Serializes snapshot writes; never held across a remote call
    writes: Arc<tokio::sync::Mutex<()>>,
    ledger: Arc<Mutex<CommitLedger>>,
}

impl ClientCache {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            writes: Arc::new(tokio::sync::Mutex::new(())),
            ledger: Arc::new(Mutex::new(CommitLedger::default())),
        }
    }

    /// Current snapshot, normalized; empty when nothing was stored yet.
    pub async fn get(&self, now: DateTime<Utc>) -> Result<Vec<RequestItem>, SourceError> {
        Ok(normalize_all(self.store.read().await?, now))
    }

    /// Replace the snapshot wholesale.
    pub async fn set(&self, items: &[RequestItem]) -> Result<(), SourceError> {
        let _guard = self.writes.lock().await;
        self.store.write_all(items).await
    }

    /// Merge `patch` into the record with `id`. Unknown ids are a no-op returning `None`.
    pub async fn apply_patch(
        &self,
        id: &str,
        patch: &RequestPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<RequestItem>, SourceError> {
        let _guard = self.writes.lock().await;
        let mut items = self.get(now).await?;
        let Some(target) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        *target = apply_patch(target, patch, now);
        let updated = target.clone();
        self.store.write_all(&items).await?;
        Ok(Some(updated))
    }

    /// Add a record to the end of the snapshot.
    pub async fn append(&self, item: &RequestItem) -> Result<(), SourceError> {
        let _guard = self.writes.lock().await;
        self.store.append(item).await.map(|_| ())
    }

    /// Store `seed` only when the snapshot is empty. Returns whether it was written.
    pub async fn seed_if_empty(&self, seed: &[RequestItem]) -> Result<bool, SourceError> {
        let _guard = self.writes.lock().await;
        if !self.store.read().await?.is_empty() {
            return Ok(false);
        }
        self.store.write_all(seed).await?;
        Ok(true)
    }

    /// Forget the snapshot. This is the only way records are ever destroyed.
    pub async fn reset(&self) -> Result<bool, SourceError> {
        self.store.clear().await
    }

    /// Open a ledger entry for an update that was just applied locally.
    pub fn begin_commit(&self, id: &str, patch: &RequestPatch, now: DateTime<Utc>) -> u64 {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.next_seq += 1;
        let seq = ledger.next_seq;
        if ledger.records.len() == LEDGER_CAPACITY {
            ledger.records.pop_front();
        }
        ledger.records.push_back(CommitRecord {
            seq,
            id: id.to_string(),
            patch: patch.clone(),
            state: CommitState::Pending,
            created_at: timestamp(now),
            resolved_at: None,
        });
        seq
    }

    /// Record the remote outcome of a pending update.
    pub fn resolve_commit(&self, seq: u64, state: CommitState, now: DateTime<Utc>) {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = ledger.records.iter_mut().find(|r| r.seq == seq) {
            record.state = state;
            record.resolved_at = Some(timestamp(now));
        }
    }

    /// Ledger entries, newest last.
    pub fn commits(&self) -> Vec<CommitRecord> {
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, KvStore};
    use crate::models::{Label, RawRequest};
    use crate::normalize::normalize;
    use tempfile::TempDir;

    async fn cache(dir: &TempDir) -> ClientCache {
        let pool = init_database(&dir.path().join("cache.sqlite")).await.unwrap();
        ClientCache::new(LocalStore::new(KvStore::new(pool), "requests"))
    }

    fn request(id: &str, status: &str) -> RequestItem {
        normalize(
            RawRequest {
                id: Some(id.to_string()),
                patreon_name: Some(format!("patron {id}")),
                status: Some(status.to_string()),
                date_requested: Some("2026-01-02".to_string()),
                ..Default::default()
            },
            0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        assert!(cache.get(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        cache.set(&[request("a", "Done"), request("b", "Done")]).await.unwrap();
        cache.set(&[request("c", "Done")]).await.unwrap();

        let items = cache.get(Utc::now()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "c");
    }

    #[tokio::test]
    async fn test_apply_patch_merges() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        let before = request("a", "Not Started");
        cache.set(&[before.clone()]).await.unwrap();

        let patch = RequestPatch {
            status: Some("In Progress".to_string()),
            ..Default::default()
        };
        let now = Utc::now();
        let updated = cache.apply_patch("a", &patch, now).await.unwrap().unwrap();

        assert_eq!(updated.status, Label::new("In Progress"));
        assert_eq!(updated.patreon_name, before.patreon_name);
        assert_eq!(cache.get(now).await.unwrap()[0], updated);
    }

    #[tokio::test]
    async fn test_apply_patch_never_inserts() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        cache.set(&[request("a", "Done")]).await.unwrap();

        let patch = RequestPatch {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        assert_eq!(cache.apply_patch("zzz", &patch, Utc::now()).await.unwrap(), None);
        assert_eq!(cache.get(Utc::now()).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_patches_all_land() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        let ids: Vec<String> = (0..16).map(|i| format!("r{i}")).collect();
        let items: Vec<RequestItem> = ids.iter().map(|id| request(id, "Not Started")).collect();
        cache.set(&items).await.unwrap();

        let tasks: Vec<_> = ids
            .iter()
            .map(|id| {
                let cache = cache.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    let patch = RequestPatch {
                        status: Some("Done".to_string()),
                        ..Default::default()
                    };
                    cache.apply_patch(&id, &patch, Utc::now()).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        let stored = cache.get(Utc::now()).await.unwrap();
        assert_eq!(stored.len(), 16);
        assert!(stored.iter().all(|i| i.status == Label::new("Done")));
    }

    #[tokio::test]
    async fn test_seed_if_empty_only_once() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;

        assert!(cache.seed_if_empty(&[request("first", "Done")]).await.unwrap());
        assert!(!cache
            .seed_if_empty(&[request("second", "Done"), request("third", "Done")])
            .await
            .unwrap());

        let items = cache.get(Utc::now()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "first");
    }

    #[tokio::test]
    async fn test_reset_clears() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        cache.set(&[request("a", "Done")]).await.unwrap();
        assert!(cache.reset().await.unwrap());
        assert!(cache.get(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_lifecycle_and_capacity() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir).await;
        let patch = RequestPatch::default();

        let seq = cache.begin_commit("a", &patch, Utc::now());
        assert_eq!(cache.commits()[0].state, CommitState::Pending);

        cache.resolve_commit(seq, CommitState::LocalOnly, Utc::now());
        let record = &cache.commits()[0];
        assert_eq!(record.state, CommitState::LocalOnly);
        assert!(record.resolved_at.is_some());

        for _ in 0..LEDGER_CAPACITY {
            cache.begin_commit("b", &patch, Utc::now());
        }
        let commits = cache.commits();
        assert_eq!(commits.len(), LEDGER_CAPACITY);
        assert_eq!(commits[0].id, "b");
    }
}
