use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

/// Capacity of a store opened with [`Storage::new`], in key + value bytes.
///
/// Must hold a 5 MiB image once base64 encoded (about 6.7 MiB) next to the prompt.
pub const DEFAULT_QUOTA_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: writing '{key}' needs {requested} bytes of {quota}")]
    QuotaExceeded {
        key: String,
        requested: u64,
        quota: u64,
    },
    #[error("sqlite error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("sqlite migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to create parent directory '{path}': {source}")]
    ParentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String-to-string persistence surface. Each write replaces one key atomically.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Bounded SQLite key-value store.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    quota_bytes: u64,
}

impl Storage {
    pub async fn new(database_url: &str) -> StorageResult<Self> {
        Self::with_quota(database_url, DEFAULT_QUOTA_BYTES).await
    }

    pub async fn with_quota(database_url: &str, quota_bytes: u64) -> StorageResult<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, quota_bytes })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Bytes currently held by all keys and values.
    pub async fn used_bytes(&self) -> StorageResult<u64> {
        let used: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM session_kv",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(used.max(0) as u64)
    }

    pub async fn entry(&self, key: &str) -> StorageResult<Option<StoredEntry>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM session_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredEntry {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    /// Removes every key starting with `prefix`; returns how many were dropped.
    pub async fn clear_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query("DELETE FROM session_kv WHERE key LIKE ? ESCAPE '\\'")
            .bind(pattern)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl KeyValueStore for Storage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM session_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let others: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM session_kv WHERE key <> ?",
        )
        .bind(key)
        .fetch_one(&mut *tx)
        .await?;

        let requested = others.max(0) as u64 + key.len() as u64 + value.len() as u64;
        if requested > self.quota_bytes {
            tracing::debug!(key, requested, quota = self.quota_bytes, "rejecting write over quota");
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                requested,
                quota: self.quota_bytes,
            });
        }

        sqlx::query(
            "INSERT INTO session_kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM session_kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> StorageResult<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).map_err(|source| StorageError::ParentDir {
        path: parent.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
