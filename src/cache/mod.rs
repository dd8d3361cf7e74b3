//! Pass-through cache used by every fetching component.
//!
//! The [`Cache`] contract is deliberately small: `get` returns a previously
//! stored value or nothing, `set` stores a value for a lifetime. Both are
//! no-ops with [`NoCache`], which is the default. Backends never report
//! errors through this interface; a failing backend behaves like a miss.
//!
//! - [`NoCache`] - Always misses
//! - [`MemoryCache`] - Process-local, expiring entries
//! - [`SqliteCache`] - Persistent SQLite store

pub(crate) mod keys;
mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Key/value store with per-entry lifetimes.
///
/// A `ttl` of [`Duration::MAX`] (or any lifetime too large to represent)
/// means the entry never expires.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the live value stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}
}

/// Reads and decodes a JSON value from the cache.
pub(crate) async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, error = %error, "Discarding undecodable cache entry");
            None
        }
    }
}

/// Encodes a value as JSON and stores it in the cache.
pub(crate) async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    match serde_json::to_string(value) {
        Ok(raw) => {
            debug!(key, "Caching");
            cache.set(key, raw, ttl).await;
        }
        Err(error) => warn!(key, error = %error, "Unable to encode cache entry"),
    }
}
