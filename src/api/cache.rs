//! Client cache endpoints: the persisted snapshot and the commit ledger.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{CommitRecord, RawRequest, RequestItem};
use crate::normalize::normalize_all;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub seeded: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub removed: bool,
}

/// GET /api/cache - Current snapshot; empty when nothing was cached yet.
pub async fn get_cache(State(state): State<AppState>) -> ApiResult<Vec<RequestItem>> {
    let items = state.sync.cache().get(Utc::now()).await?;
    success(items)
}

/// PUT /api/cache - Replace the snapshot wholesale.
pub async fn put_cache(
    State(state): State<AppState>,
    Json(body): Json<Vec<RawRequest>>,
) -> ApiResult<Vec<RequestItem>> {
    let items = normalize_all(body, Utc::now());
    state.sync.cache().set(&items).await?;
    success(items)
}

/// DELETE /api/cache - Drop the snapshot.
pub async fn reset_cache(State(state): State<AppState>) -> ApiResult<ResetResult> {
    let removed = state.sync.cache().reset().await?;
    tracing::info!("Client cache reset (had snapshot: {})", removed);
    success(ResetResult { removed })
}

/// POST /api/cache/seed - Store the seed list if the snapshot is empty.
pub async fn seed_cache(State(state): State<AppState>) -> ApiResult<SeedResult> {
    let seed = normalize_all(state.sync.seed().to_vec(), Utc::now());
    let seeded = state.sync.cache().seed_if_empty(&seed).await?;
    success(SeedResult { seeded })
}

/// GET /api/commits - Recent optimistic updates and how they resolved.
pub async fn list_commits(State(state): State<AppState>) -> ApiResult<Vec<CommitRecord>> {
    success(state.sync.cache().commits())
}
