//! REST API module.
//!
//! Handlers translate HTTP to orchestrator and cache calls. Every success uses
//! [`ApiResponse`]; failures go out through [`crate::errors::AppError`].

mod accounts;
mod cache;
mod export;
mod options;
mod requests;
mod stats;

pub use accounts::*;
pub use cache::*;
pub use export::*;
pub use options::*;
pub use requests::*;
pub use stats::*;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::{CommitTarget, DataSource};

/// Response header naming the store a read was served from.
pub const DATA_SOURCE_HEADER: &str = "x-data-source";

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_to: Option<CommitTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            source: None,
            committed_to: None,
            count: None,
        }
    }

    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_committed_to(mut self, target: CommitTarget) -> Self {
        self.committed_to = Some(target);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(&self)).into_response();
        if let Some(source) = self.source {
            response
                .headers_mut()
                .insert(DATA_SOURCE_HEADER, HeaderValue::from_static(source.as_str()));
        }
        response
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}
