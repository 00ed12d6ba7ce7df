//! # Home thermal simulation
//!
//! - **Weather**: explicit points or a synthetic clear-sky series
//! - **Thermal**: single-zone energy balance stepped at a fixed interval
//! - **HVAC**: thermostat policies, including a carbon-aware one
//! - **Scenario**: several homes against one weather timeline and grid intensity
//!
//! ## Usage
//!
//! ```rust
//! use load_shifting_carbon::domain::{HomeCharacteristics, IntensitySeries};
//! use load_shifting_carbon::simulation::{
//!     ScenarioComparator, SimulationSettings, SyntheticWeather, WeatherSeries,
//! };
//!
//! let weather = WeatherSeries::synthetic(
//!     &SyntheticWeather::year(44.645, -72.827, 2024)
//!         .with_window(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 7),
//! )
//! .unwrap();
//!
//! let homes = vec![
//!     ("old".to_string(), HomeCharacteristics::baseline_home(44.645, -72.827)),
//!     ("new".to_string(), HomeCharacteristics::improved_home(44.645, -72.827)),
//! ];
//!
//! let comparison = ScenarioComparator::new(SimulationSettings::default())
//!     .compare(&homes, &weather, &IntensitySeries::default())
//!     .unwrap();
//! assert!(comparison.differences[0].hvac_kwh < 0.0);
//! ```

pub mod hvac;
pub mod scenario;
pub mod thermal;
pub mod weather;

pub use hvac::{BasicControl, CarbonAwareControl, ControlContext, HvacControl, HvacMode, PriceTier};
pub use scenario::{
    model_one_house, ScenarioComparator, ScenarioComparison, ScenarioDelta, ScenarioResult, TracePoint,
};
pub use thermal::{
    calculate_next_timestep, monthly_energy_balance, MonthlyEnergyBalance, SimulationStep,
    ThermalSimulator,
};
pub use weather::{ClearSkyModel, SyntheticWeather, WeatherPoint, WeatherSeries};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid home {name:?}: {source}")]
    InvalidHome {
        name: String,
        #[source]
        source: ValidationErrors,
    },

    #[error("weather series is empty")]
    EmptyWeather,

    #[error("no scenarios to compare")]
    NoScenarios,

    #[error("invalid weather: {0}")]
    InvalidWeather(String),
}

/// Step length and carbon-aware control tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub step_minutes: u32,
    /// Comfort band widening during high-carbon hours (°C)
    pub comfort_slack_c: f64,
    pub lookahead_hours: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_minutes: 10,
            comfort_slack_c: 2.0,
            lookahead_hours: 6,
        }
    }
}
