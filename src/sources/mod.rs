//! Source adapters.
//!
//! Each adapter translates between its backing store and [`RawRequest`]s. Failures come back
//! as [`SourceError`] values; the sync orchestrator decides what a failure means.

mod csv;
mod excel;
mod google_auth;
mod local;
mod seed;
mod sheets;

pub use csv::*;
pub use excel::*;
pub use google_auth::*;
pub use local::*;
pub use seed::*;
pub use sheets::*;

use async_trait::async_trait;

use crate::models::{DataSource, RawRequest, RequestItem, RequestPatch};

/// Outcome of a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Landed in the backing store
    Persisted,
    /// Accepted without persisting (read-only stores)
    Acknowledged,
}

/// Adapter-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The store has no configuration; callers move to the next tier silently
    NotConfigured,
    /// Network, auth or rate-limit failure
    Transport(String),
    /// Payload could not be understood
    Malformed(String),
    /// Update target could not be resolved
    NotFound(String),
    /// Local key-value store failure
    Storage(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotConfigured => write!(f, "source not configured"),
            SourceError::Transport(msg) => write!(f, "transport error: {}", msg),
            SourceError::Malformed(msg) => write!(f, "malformed data: {}", msg),
            SourceError::NotFound(id) => write!(f, "request {} not found", id),
            SourceError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

impl From<crate::errors::AppError> for SourceError {
    fn from(err: crate::errors::AppError) -> Self {
        SourceError::Storage(err.to_string())
    }
}

/// A readable and writable request store.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Tag reported to callers when this source serves a read.
    fn kind(&self) -> DataSource;

    /// Unconfigured sources are skipped without logging a failure.
    fn is_configured(&self) -> bool {
        true
    }

    /// Fetch every row the store holds.
    async fn read(&self) -> Result<Vec<RawRequest>, SourceError>;

    /// Apply a partial update to the record identified by `id`.
    async fn write(&self, id: &str, patch: &RequestPatch) -> Result<Commit, SourceError>;

    /// Add a new record.
    async fn append(&self, record: &RequestItem) -> Result<Commit, SourceError>;
}

/// Managed column order shared by the sheet and its CSV export:
/// Patreon Name, Tier, Request Date, Character Name, Origin, Type, Status, Notes.
pub const MANAGED_COLUMNS: usize = 8;

/// Map a sheet/CSV row onto a partial request. Blank cells are treated as absent.
pub(crate) fn raw_from_columns<S: AsRef<str>>(cells: &[S]) -> RawRequest {
    let cell = |index: usize| {
        cells
            .get(index)
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
    };

    RawRequest {
        patreon_name: cell(0),
        tier: cell(1),
        date_requested: cell(2),
        character_name: cell(3),
        origin: cell(4),
        request_type: cell(5),
        status: cell(6),
        notes: cell(7),
        ..RawRequest::default()
    }
}

/// Inverse of [`raw_from_columns`]; always yields exactly [`MANAGED_COLUMNS`] cells.
pub(crate) fn columns_from_raw(raw: &RawRequest) -> Vec<String> {
    [
        &raw.patreon_name,
        &raw.tier,
        &raw.date_requested,
        &raw.character_name,
        &raw.origin,
        &raw.request_type,
        &raw.status,
        &raw.notes,
    ]
    .into_iter()
    .map(|value| value.clone().unwrap_or_default())
    .collect()
}
