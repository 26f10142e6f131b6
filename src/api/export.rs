//! Excel export endpoint.

use axum::{extract::State, Json};
use chrono::Utc;

use super::{ApiResponse, ApiResult};
use crate::models::RawRequest;
use crate::normalize::normalize_all;
use crate::AppState;

/// POST /api/sync - Overwrite the server-side workbook with the posted list.
///
/// 423 when the workbook is held open elsewhere, 500 for any other write failure.
pub async fn export_requests(
    State(state): State<AppState>,
    Json(body): Json<Vec<RawRequest>>,
) -> ApiResult<()> {
    let items = normalize_all(body, Utc::now());
    let count = state.sync.export(&items).await?;
    Ok(ApiResponse::new(()).with_count(count))
}
