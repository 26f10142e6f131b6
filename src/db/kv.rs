//! Raw get/put/remove over string keys.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read the document stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Overwrite the document stored under `key`.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete `key`. Returns whether anything was removed.
    pub async fn remove(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("kv.sqlite")).await.unwrap();
        let store = KvStore::new(pool);

        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", "[1]").await.unwrap();
        store.put("k", "[2]").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("[2]"));
        assert_eq!(store.get("other").await.unwrap(), None);

        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
