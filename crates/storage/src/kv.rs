use crate::StorageError;
use sqlx::SqlitePool;
use tracing::debug;

/// String-keyed blob store with an optional byte quota across all keys.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
    quota_bytes: Option<u64>,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            quota_bytes: None,
        }
    }

    /// A quota of zero means unlimited.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = (quota_bytes > 0).then_some(quota_bytes);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Replaces the value under `key` wholesale.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let others: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) \
                 FROM local_storage WHERE key != ?1",
            )
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
            let needed = others.max(0) as u64 + key.len() as u64 + value.len() as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, strftime('%s','now')) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    /// Returns whether a value was present.
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM local_storage ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}
