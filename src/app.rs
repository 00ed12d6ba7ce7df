use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::cache::{MemoryCacheStore, ResultCache};
use crate::config::{CacheBackend, Config};
use crate::grid_mix::GridMixPipeline;
use crate::simulation::ScenarioComparator;
use crate::source::{EiaClient, TimeseriesSource};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub pipeline: Arc<GridMixPipeline>,
    pub comparator: ScenarioComparator,
}

impl AppState {
    /// Wire the EIA client and the configured cache backend.
    pub async fn new(cfg: Config) -> Result<Self> {
        if cfg.eia.api_key.is_empty() {
            tracing::warn!("no EIA API key configured; upstream requests will be rejected");
        }
        let source = EiaClient::new(cfg.eia.client_config()).context("building EIA client")?;
        let cache = build_cache(&cfg).await?;
        Self::from_parts(cfg, Arc::new(source), cache)
    }

    /// Assemble state from an arbitrary source and cache.
    pub fn from_parts(cfg: Config, source: Arc<dyn TimeseriesSource>, cache: ResultCache) -> Result<Self> {
        let pipeline = GridMixPipeline::new(source, cache, cfg.analysis.pipeline_settings());
        let comparator =
            ScenarioComparator::new(cfg.simulation.settings()).with_grid_timezone(cfg.analysis.grid_tz()?);
        Ok(Self {
            cfg,
            pipeline: Arc::new(pipeline),
            comparator,
        })
    }
}

async fn build_cache(cfg: &Config) -> Result<ResultCache> {
    match cfg.cache.backend {
        CacheBackend::Memory => {
            info!(max_keys = cfg.cache.memory_max_keys, "using in-memory result cache");
            let store = MemoryCacheStore::with_capacity(cfg.cache.memory_max_keys);
            Ok(ResultCache::new(Arc::new(store)))
        }
        #[cfg(feature = "db")]
        CacheBackend::Postgres => {
            let store = crate::cache::pg::PgCacheStore::connect(&cfg.db.url)
                .await
                .context("connecting to cache database")?;
            info!("using postgres result cache");
            Ok(ResultCache::new(Arc::new(store)))
        }
        #[cfg(not(feature = "db"))]
        CacheBackend::Postgres => {
            anyhow::bail!("postgres cache backend requires the `db` feature")
        }
    }
}
