use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::{CacheEntry, CacheKey, CacheStore};
use crate::error::GridMixError;

pub const DEFAULT_MAX_KEYS: usize = 1024;

/// Process-local cache store holding at most `max_keys` keys.
///
/// When full, storing a new key evicts the key cached earliest.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, Vec<CacheEntry>>>,
    max_keys: usize,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_KEYS)
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_keys: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_keys: max_keys.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, GridMixError> {
        Ok(self
            .entries
            .read()
            .get(key)
            .and_then(|rows| rows.first().cloned()))
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), GridMixError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.max_keys {
            let oldest = entries
                .iter()
                .filter_map(|(k, rows)| rows.first().map(|row| (k, row.cached_at)))
                .min_by_key(|(_, cached_at)| *cached_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(function = %oldest.function_name, "evicting oldest cache entry");
                entries.remove(&oldest);
            }
        }
        entries.entry(key.clone()).or_default().push(entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
