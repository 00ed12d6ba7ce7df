//! Content-addressed result cache.
//!
//! Entries are keyed by the computing function, its parameters (date range
//! excluded) and the date range. Two entries for one key may exist after a
//! racing insert; readers take the first.

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ring::digest::{digest, SHA256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::GridMixError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub function_name: String,
    /// Canonical JSON of the parameters, sorted keys
    pub params_json: String,
    /// Hex SHA-256 over function name and `params_json`
    pub key_digest: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(
        function_name: &str,
        params: &impl Serialize,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, GridMixError> {
        // Round-tripping through Value sorts object keys.
        let params_json = serde_json::to_value(params)?.to_string();
        let hashed = digest(&SHA256, format!("{function_name}\n{params_json}").as_bytes());
        let key_digest = hashed
            .as_ref()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Ok(Self {
            function_name: function_name.to_string(),
            params_json,
            key_digest,
            start,
            end,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub cached_at: DateTime<Utc>,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// First stored entry for the key, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, GridMixError>;

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), GridMixError>;

    fn name(&self) -> &str;
}

/// `get_or_compute` over any [`CacheStore`].
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Compute errors are returned and nothing is stored. A payload that no
    /// longer deserializes is recomputed. A failed store is logged and the
    /// computed value is still returned.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, GridMixError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GridMixError>>,
    {
        match self.store.get(key).await {
            Ok(Some(entry)) => match serde_json::from_str(&entry.payload) {
                Ok(value) => {
                    debug!(function = %key.function_name, digest = %key.key_digest, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(function = %key.function_name, error = %e, "stale cache payload; recomputing");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "cache read failed; computing");
            }
        }

        let value = compute().await?;

        let entry = CacheEntry {
            payload: serde_json::to_string(&value)?,
            cached_at: Utc::now(),
        };
        if let Err(e) = self.store.put(key, entry).await {
            warn!(store = self.store.name(), error = %e, "cache write failed");
        }
        Ok(value)
    }
}
