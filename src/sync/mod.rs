//! Sync orchestrator: reads through an ordered fallback chain, commits writes remotely when
//! it can and locally always.
//!
//! Reads never fail: the worst case is the embedded seed list. Writes never fail either;
//! the outcome says whether the change reached the sheet or only the client cache.
//! Nothing is retried and no locks span stores, so concurrent writers race last-write-wins.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::ClientCache;
use crate::models::{
    CommitState, CommitTarget, DataSource, RawRequest, ReadOutcome, RequestItem, RequestPatch,
    WriteOutcome,
};
use crate::normalize::{generate_id, normalize, normalize_all};
use crate::sources::{
    seed_requests, Commit, ExcelExporter, ExportError, RequestSource, SourceError,
};

#[derive(Clone)]
pub struct SyncOrchestrator {
    /// Tried in order on every read
    read_chain: Vec<Arc<dyn RequestSource>>,
    /// Where updates and creates are committed durably
    remote: Arc<dyn RequestSource>,
    cache: ClientCache,
    seed: Vec<RawRequest>,
    exporter: ExcelExporter,
}

impl SyncOrchestrator {
    /// `sheets` is both the first read source and the write target; `csv` is the second
    /// read source.
    pub fn new(
        sheets: Arc<dyn RequestSource>,
        csv: Arc<dyn RequestSource>,
        cache: ClientCache,
        exporter: ExcelExporter,
    ) -> Self {
        Self {
            read_chain: vec![sheets.clone(), csv],
            remote: sheets,
            cache,
            seed: seed_requests(),
            exporter,
        }
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn seed(&self) -> &[RawRequest] {
        &self.seed
    }

    /// First configured source with a non-empty result wins; otherwise the seed list.
    ///
    /// The winning list is written through to the client cache. Seed data only fills an
    /// empty cache.
    pub async fn read(&self) -> ReadOutcome {
        let now = Utc::now();

        for source in &self.read_chain {
            let kind = source.kind();
            if !source.is_configured() {
                tracing::debug!("{} source not configured, skipping", kind);
                continue;
            }

            match source.read().await {
                Ok(rows) if !rows.is_empty() => {
                    let items = normalize_all(rows, now);
                    if let Err(e) = self.cache.set(&items).await {
                        tracing::warn!("Could not refresh client cache from {}: {}", kind, e);
                    }
                    tracing::info!("Serving {} requests from {}", items.len(), kind);
                    return ReadOutcome {
                        source: kind,
                        items,
                    };
                }
                Ok(_) => tracing::warn!("{} returned no requests, trying next source", kind),
                Err(e) => tracing::warn!("Reading from {} failed, trying next source: {}", kind, e),
            }
        }

        let items = normalize_all(self.seed.clone(), now);
        match self.cache.seed_if_empty(&items).await {
            Ok(true) => tracing::info!("Seeded empty client cache with {} requests", items.len()),
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not seed client cache: {}", e),
        }
        tracing::warn!("No remote source available, serving seed data");

        ReadOutcome {
            source: DataSource::Seed,
            items,
        }
    }

    /// Apply `patch` to the request `id`.
    ///
    /// The client cache is updated first and a pending ledger entry opened; the remote
    /// write is then awaited and the entry resolved to durable or local-only.
    pub async fn update(&self, id: &str, patch: &RequestPatch) -> WriteOutcome {
        let now = Utc::now();

        let request = self
            .cache
            .apply_patch(id, patch, now)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Could not apply update of {} to client cache: {}", id, e);
                None
            });
        let seq = self.cache.begin_commit(id, patch, now);

        let committed_to = commit_target(self.remote.write(id, patch).await, id);
        self.cache
            .resolve_commit(seq, commit_state(committed_to), Utc::now());

        WriteOutcome {
            committed_to,
            request,
        }
    }

    /// Add a new request. A short random id is generated when none is supplied.
    pub async fn create(&self, mut raw: RawRequest) -> WriteOutcome {
        let now = Utc::now();
        if raw.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            raw.id = Some(generate_id());
        }
        let item = normalize(raw, 0, now);

        if let Err(e) = self.cache.append(&item).await {
            tracing::warn!("Could not add {} to client cache: {}", item.id, e);
        }
        let seq = self
            .cache
            .begin_commit(&item.id, &RawRequest::from(item.clone()), now);

        let committed_to = commit_target(self.remote.append(&item).await, &item.id);
        self.cache
            .resolve_commit(seq, commit_state(committed_to), Utc::now());

        WriteOutcome {
            committed_to,
            request: Some(item),
        }
    }

    /// Deletes are acknowledged but not persisted anywhere; the cache keeps the record
    /// until it is reset.
    pub async fn delete(&self, id: &str) {
        tracing::info!("Delete of {} acknowledged, remote stores are append/update-only", id);
    }

    /// Write the full list to the Excel workbook.
    pub async fn export(&self, items: &[RequestItem]) -> Result<usize, ExportError> {
        self.exporter.export(items, Utc::now()).await.map_err(|e| {
            tracing::error!("Excel export failed: {}", e);
            e
        })
    }
}

fn commit_target(result: Result<Commit, SourceError>, id: &str) -> CommitTarget {
    match result {
        Ok(Commit::Persisted) => CommitTarget::Sheets,
        Ok(Commit::Acknowledged) | Err(SourceError::NotConfigured) => CommitTarget::Local,
        Err(SourceError::NotFound(_)) => {
            tracing::warn!("{} not found in sheet, change kept locally", id);
            CommitTarget::Local
        }
        Err(e) => {
            tracing::warn!("Remote write of {} failed, change kept locally: {}", id, e);
            CommitTarget::Local
        }
    }
}

fn commit_state(target: CommitTarget) -> CommitState {
    match target {
        CommitTarget::Sheets => CommitState::Durable,
        CommitTarget::Local => CommitState::LocalOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, KvStore};
    use crate::models::Label;
    use crate::sources::testing::MemorySheet;
    use crate::sources::{parse_csv, CsvAdapter, LocalStore, SheetsAdapter};
    use tempfile::TempDir;

    const HEADER: &[&str] = &["Patreon Name", "Tier", "Request Date", "Character Name"];
    const ROW_A: &[&str] = &[
        "naopHASAMI",
        "Tier 4",
        "2025-12-30",
        "Chisaki Hiradaira",
        "Nagi no Asu kara",
        "Not Poll",
        "In Progress",
        "",
    ];
    const ROW_B: &[&str] = &[
        "joe su",
        "Tier 4",
        "2026-01-02",
        "Latticenail",
        "Ansatsusha de Aru...",
        "Not Poll",
        "Not Started",
        "wants a hat",
    ];

    struct Harness {
        orchestrator: SyncOrchestrator,
        _dir: TempDir,
    }

    async fn harness(sheets: SheetsAdapter) -> Harness {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("sync.sqlite")).await.unwrap();
        let cache = ClientCache::new(LocalStore::new(KvStore::new(pool), "requests"));
        let orchestrator = SyncOrchestrator::new(
            Arc::new(sheets),
            Arc::new(CsvAdapter::new(reqwest::Client::new(), None)),
            cache,
            ExcelExporter::new(dir.path().join("export.xlsx")),
        );
        Harness {
            orchestrator,
            _dir: dir,
        }
    }

    fn stable_fields(items: &[RequestItem]) -> Vec<RawRequest> {
        items.iter().cloned().map(RawRequest::from).collect()
    }

    #[tokio::test]
    async fn test_read_prefers_sheets_and_refreshes_cache() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER, ROW_A, ROW_B]));
        let h = harness(SheetsAdapter::new(sheet)).await;

        let outcome = h.orchestrator.read().await;

        assert_eq!(outcome.source, DataSource::Sheets);
        let ids: Vec<&str> = outcome.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["req-2", "req-3"]);
        let cached = h.orchestrator.cache().get(Utc::now()).await.unwrap();
        assert_eq!(stable_fields(&cached), stable_fields(&outcome.items));
    }

    #[tokio::test]
    async fn test_read_falls_back_to_seed() {
        let h = harness(SheetsAdapter::new(Arc::new(MemorySheet::offline()))).await;

        let outcome = h.orchestrator.read().await;

        assert_eq!(outcome.source, DataSource::Seed);
        let expected = normalize_all(seed_requests(), Utc::now());
        assert_eq!(stable_fields(&outcome.items), stable_fields(&expected));
        // an empty cache gets seeded
        assert_eq!(h.orchestrator.cache().get(Utc::now()).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_sheet_falls_back_to_seed() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER]));
        let h = harness(SheetsAdapter::new(sheet)).await;
        assert_eq!(h.orchestrator.read().await.source, DataSource::Seed);
    }

    #[tokio::test]
    async fn test_seed_read_keeps_existing_cache() {
        let h = harness(SheetsAdapter::unconfigured()).await;
        let mine = normalize(
            RawRequest {
                id: Some("mine".to_string()),
                ..Default::default()
            },
            0,
            Utc::now(),
        );
        h.orchestrator.cache().set(&[mine]).await.unwrap();

        h.orchestrator.read().await;

        let cached = h.orchestrator.cache().get(Utc::now()).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "mine");
    }

    #[tokio::test]
    async fn test_update_commits_to_sheets() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER, ROW_A, ROW_B]));
        let h = harness(SheetsAdapter::new(sheet.clone())).await;
        let before = h.orchestrator.read().await.items[1].clone();

        let patch = RequestPatch {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        let outcome = h.orchestrator.update("req-3", &patch).await;

        assert_eq!(outcome.committed_to, CommitTarget::Sheets);
        assert_eq!(sheet.row(2)[6], "Done");
        assert_eq!(sheet.row(2)[7], "wants a hat");

        let after = outcome.request.unwrap();
        let mut expected = before;
        expected.status = Label::new("Done");
        assert_eq!(after, expected);

        let commits = h.orchestrator.cache().commits();
        assert_eq!(commits.last().unwrap().state, CommitState::Durable);
    }

    #[tokio::test]
    async fn test_update_unknown_row_is_local() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER, ROW_A]));
        let h = harness(SheetsAdapter::new(sheet)).await;
        h.orchestrator.read().await;

        let patch = RequestPatch {
            notes: Some("offline edit".to_string()),
            ..Default::default()
        };
        let outcome = h.orchestrator.update("req-40", &patch).await;

        assert_eq!(outcome.committed_to, CommitTarget::Local);
        assert!(outcome.request.is_none());
        let commits = h.orchestrator.cache().commits();
        assert_eq!(commits.last().unwrap().state, CommitState::LocalOnly);
    }

    #[tokio::test]
    async fn test_update_while_offline_lands_in_cache() {
        let h = harness(SheetsAdapter::new(Arc::new(MemorySheet::offline()))).await;
        h.orchestrator.read().await;

        let patch = RequestPatch {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        let outcome = h.orchestrator.update("dummy-3", &patch).await;

        assert_eq!(outcome.committed_to, CommitTarget::Local);
        assert_eq!(outcome.request.unwrap().status, Label::new("Done"));
        let cached = h.orchestrator.cache().get(Utc::now()).await.unwrap();
        let stored = cached.iter().find(|i| i.id == "dummy-3").unwrap();
        assert_eq!(stored.status, Label::new("Done"));
    }

    #[tokio::test]
    async fn test_create_appends_everywhere() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER]));
        let h = harness(SheetsAdapter::new(sheet.clone())).await;

        let outcome = h
            .orchestrator
            .create(RawRequest {
                patreon_name: Some("Tim Hu".to_string()),
                character_name: Some("Nijika Ijichi".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(outcome.committed_to, CommitTarget::Sheets);
        let created = outcome.request.unwrap();
        assert_eq!(created.id.len(), 8);
        assert_eq!(sheet.len(), 2);
        let cached = h.orchestrator.cache().get(Utc::now()).await.unwrap();
        assert_eq!(cached[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_without_sheets_is_local() {
        let h = harness(SheetsAdapter::unconfigured()).await;
        let outcome = h
            .orchestrator
            .create(RawRequest {
                id: Some("given".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(outcome.committed_to, CommitTarget::Local);
        assert_eq!(outcome.request.unwrap().id, "given");
    }

    /// Known limitation: the same sheet row gets a different id through the CSV export.
    #[tokio::test]
    async fn test_ids_are_not_stable_across_sources() {
        let sheet = Arc::new(MemorySheet::new(&[HEADER, ROW_A]));
        let h = harness(SheetsAdapter::new(sheet)).await;
        let via_sheets = h.orchestrator.read().await.items;

        let csv = format!("{}\n{}", HEADER.join(","), ROW_A.join(","));
        let via_csv = normalize_all(parse_csv(&csv), Utc::now());

        assert_eq!(via_sheets[0].patreon_name, via_csv[0].patreon_name);
        assert_eq!(via_sheets[0].id, "req-2");
        assert_eq!(via_csv[0].id, "req-0");
    }
}
