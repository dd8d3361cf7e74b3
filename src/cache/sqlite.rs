//! Persistent SQLite cache backend.
//!
//! This backend provides:
//! - Connection pool management
//! - WAL mode for concurrent reads
//! - Automatic migration execution
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use wikisource_api::{ClientConfig, SqliteCache, WikisourceApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = SqliteCache::new(Path::new("wikisource-cache.db")).await?;
//! let api = WikisourceApi::with_config(ClientConfig::default(), Arc::new(cache))?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{instrument, warn};

use crate::error::WikisourceError;

use super::Cache;

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// SQLite-backed [`Cache`].
///
/// Expiry is stored as unix seconds; a `NULL` expiry never expires.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Opens (creating if needed) a cache database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Cache`] if the connection or migrations fail.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, WikisourceError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(&db_url)
            .await
            .map_err(cache_error)?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(cache_error)?;

        sqlx::query(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS}"))
            .execute(&pool)
            .await
            .map_err(cache_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|error| WikisourceError::Cache {
                reason: format!("failed to run migrations: {error}"),
            })?;

        Ok(Self { pool })
    }

    /// Creates an in-memory cache database, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Cache`] if the connection or migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, WikisourceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(cache_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|error| WikisourceError::Cache {
                reason: format!("failed to run migrations: {error}"),
            })?;

        Ok(Self { pool })
    }

    /// Deletes every expired entry, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Cache`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, WikisourceError> {
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(unix_now())
                .execute(&self.pool)
                .await
                .map_err(cache_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> Option<String> {
        let row: Result<Option<(String, Option<i64>)>, sqlx::Error> =
            sqlx::query_as("SELECT value, expires_at FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await;
        match row {
            Ok(Some((value, expires_at))) if expires_at.is_none_or(|at| at > unix_now()) => {
                Some(value)
            }
            Ok(_) => None,
            Err(error) => {
                warn!(key, error = %error, "SQLite cache read failed; treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let result = sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expiry_timestamp(ttl))
        .execute(&self.pool)
        .await;
        if let Err(error) = result {
            warn!(key, error = %error, "SQLite cache write failed");
        }
    }
}

fn cache_error(error: sqlx::Error) -> WikisourceError {
    WikisourceError::Cache {
        reason: format!("failed to connect to cache database: {error}"),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or(0)
}

/// Unix expiry time for `ttl`, or `None` when it does not fit (never expires).
fn expiry_timestamp(ttl: Duration) -> Option<i64> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| unix_now().checked_add(secs))
}
