//! Analytics endpoint.

use axum::extract::State;
use chrono::Utc;

use super::{ApiResponse, ApiResult};
use crate::stats::{dashboard, DashboardStats};
use crate::AppState;

/// GET /api/stats - Metrics, work queue and chart series over the current list.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let outcome = state.sync.read().await;
    let stats = dashboard(&outcome.items, Utc::now());
    Ok(ApiResponse::new(stats).with_source(outcome.source))
}
