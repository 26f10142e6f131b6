//! Sync bookkeeping: where data came from, where writes landed.

use serde::{Deserialize, Serialize};

use super::{RequestItem, RequestPatch};

/// Store a request list was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Sheets,
    Csv,
    Local,
    Seed,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Sheets => "sheets",
            DataSource::Csv => "csv",
            DataSource::Local => "local",
            DataSource::Seed => "seed",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a mutation was durably committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitTarget {
    /// Landed in the remote sheet
    Sheets,
    /// Only the client cache holds it
    Local,
}

/// Lifecycle of an optimistic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitState {
    /// Applied locally, remote result not in yet
    Pending,
    Durable,
    LocalOnly,
}

/// Ledger entry for one update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub seq: u64,
    pub id: String,
    pub patch: RequestPatch,
    pub state: CommitState,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

/// Result of a read through the fallback chain.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub source: DataSource,
    pub items: Vec<RequestItem>,
}

/// Result of an update or create.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub committed_to: CommitTarget,
    /// The record as the client cache now holds it, if the cache knew it
    pub request: Option<RequestItem>,
}
