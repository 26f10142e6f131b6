//! Request list endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::models::{RawRequest, RequestItem};
use crate::stats::{filter_requests, RequestFilter};
use crate::AppState;

/// `?q=&status=&type=`; status and type take comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub request_type: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> RequestFilter {
        RequestFilter {
            query: self
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            statuses: split_list(self.status),
            request_types: split_list(self.request_type),
        }
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET /api/requests - Read through the source chain.
///
/// Unfiltered reads keep source order; filtered reads come back in dashboard order.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<RequestItem>> {
    let outcome = state.sync.read().await;
    let filter = query.into_filter();

    let items = if filter.is_empty() {
        outcome.items
    } else {
        filter_requests(outcome.items, &filter)
    };

    Ok(ApiResponse::new(items).with_source(outcome.source))
}

/// PUT /api/requests - Apply a partial update; the body carries the target id.
pub async fn update_request(
    State(state): State<AppState>,
    Json(mut body): Json<RawRequest>,
) -> ApiResult<Option<RequestItem>> {
    let id = match body.id.take() {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(AppError::Validation("Request id is required".to_string())),
    };
    if body.is_empty_patch() {
        tracing::debug!("Update of {} carries no fields", id);
    }

    let outcome = state.sync.update(&id, &body).await;
    Ok(ApiResponse::new(outcome.request).with_committed_to(outcome.committed_to))
}

/// POST /api/requests - Create a request.
pub async fn create_request(
    State(state): State<AppState>,
    Json(body): Json<RawRequest>,
) -> ApiResult<Option<RequestItem>> {
    let outcome = state.sync.create(body).await;
    Ok(ApiResponse::new(outcome.request).with_committed_to(outcome.committed_to))
}

/// DELETE /api/requests/{id} - Acknowledged, never persisted.
pub async fn delete_request(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.sync.delete(&id).await;
    success(())
}
