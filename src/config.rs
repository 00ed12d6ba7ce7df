use anyhow::{Context, Result};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use validator::Validate;

use crate::domain::Region;
use crate::grid_mix::{ClockHourWeighting, PipelineSettings};
use crate::simulation::SimulationSettings;
use crate::source::EiaClientConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    #[validate(nested)]
    pub eia: EiaConfig,
    #[validate(nested)]
    pub analysis: AnalysisConfig,
    pub simulation: SimulationConfig,
    #[validate(nested)]
    pub cache: CacheConfig,
    pub db: DbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 120,
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EiaConfig {
    pub base_url: String,
    pub api_key: String,
    /// Rows per request; upstream serves at most 5000
    #[validate(range(min = 1, max = 5000))]
    pub page_size: usize,
    pub http_timeout_seconds: u64,
    pub default_timezone_facet: Option<String>,
}

impl Default for EiaConfig {
    fn default() -> Self {
        let client = EiaClientConfig::default();
        Self {
            base_url: client.base_url,
            api_key: client.api_key,
            page_size: client.page_size,
            http_timeout_seconds: client.timeout.as_secs(),
            default_timezone_facet: client.default_timezone_facet,
        }
    }
}

impl EiaConfig {
    pub fn client_config(&self) -> EiaClientConfig {
        EiaClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            page_size: self.page_size,
            timeout: Duration::from_secs(self.http_timeout_seconds),
            default_timezone_facet: self.default_timezone_facet.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Window used when a request gives no dates
    #[validate(range(min = 1))]
    pub default_window_days: u32,
    /// Longest window a single request may ask for
    #[validate(range(min = 1))]
    pub max_window_days: u32,
    pub clock_hour_weighting: ClockHourWeighting,
    pub skip_regions: Vec<String>,
    /// IANA zone of the grid data, e.g. `America/Los_Angeles`
    pub grid_timezone: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            default_window_days: 30,
            max_window_days: 366,
            clock_hour_weighting: settings.weighting,
            skip_regions: settings
                .skip_regions
                .iter()
                .map(|r| r.to_string())
                .collect(),
            grid_timezone: None,
        }
    }
}

impl AnalysisConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            skip_regions: self.skip_regions.iter().map(Region::new).collect(),
            weighting: self.clock_hour_weighting,
        }
    }

    pub fn grid_tz(&self) -> Result<Option<Tz>> {
        self.grid_timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("invalid grid timezone {name:?}: {e}"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub step_minutes: u32,
    pub comfort_slack_c: f64,
    pub lookahead_hours: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let settings = SimulationSettings::default();
        Self {
            step_minutes: settings.step_minutes,
            comfort_slack_c: settings.comfort_slack_c,
            lookahead_hours: settings.lookahead_hours,
        }
    }
}

impl SimulationConfig {
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            step_minutes: self.step_minutes,
            comfort_slack_c: self.comfort_slack_c,
            lookahead_hours: self.lookahead_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Keys held by the memory backend before the oldest is evicted
    #[validate(range(min = 1))]
    pub memory_max_keys: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            memory_max_keys: crate::cache::memory::DEFAULT_MAX_KEYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub url: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/load_shifting_carbon".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `LSC__` environment variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment("config/default.toml"))
    }

    /// Extracts and validates; rejects values the EIA client cannot use.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract().context("loading configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LSC__").split("__"))
    }
}
