//! Local-store adapter: the whole request list as one JSON document under a fixed key.

use async_trait::async_trait;

use super::{Commit, RequestSource, SourceError};
use crate::db::KvStore;
use crate::models::{DataSource, RawRequest, RequestItem, RequestPatch};

#[derive(Clone)]
pub struct LocalStore {
    kv: KvStore,
    key: String,
}

impl LocalStore {
    pub fn new(kv: KvStore, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Overwrite the stored list.
    pub async fn write_all<T: serde::Serialize + Sync>(&self, items: &[T]) -> Result<(), SourceError> {
        let json = serde_json::to_string(items)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        self.kv.put(&self.key, &json).await?;
        Ok(())
    }

    /// Drop the stored list entirely.
    pub async fn clear(&self) -> Result<bool, SourceError> {
        Ok(self.kv.remove(&self.key).await?)
    }
}

/// Missing key or unparseable JSON both read as an empty list.
fn parse_snapshot(key: &str, json: Option<String>) -> Vec<RawRequest> {
    let Some(json) = json else {
        return Vec::new();
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable snapshot under {:?}: {}", key, e);
        Vec::new()
    })
}

#[async_trait]
impl RequestSource for LocalStore {
    fn kind(&self) -> DataSource {
        DataSource::Local
    }

    async fn read(&self) -> Result<Vec<RawRequest>, SourceError> {
        let json = self.kv.get(&self.key).await?;
        Ok(parse_snapshot(&self.key, json))
    }

    async fn write(&self, id: &str, patch: &RequestPatch) -> Result<Commit, SourceError> {
        let mut items = self.read().await?;
        let target = items
            .iter_mut()
            .find(|item| item.id.as_deref() == Some(id))
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        target.merge(patch);
        self.write_all(&items).await?;
        Ok(Commit::Persisted)
    }

    async fn append(&self, record: &RequestItem) -> Result<Commit, SourceError> {
        let mut items = self.read().await?;
        items.push(RawRequest::from(record.clone()));
        self.write_all(&items).await?;
        Ok(Commit::Persisted)
    }
}
