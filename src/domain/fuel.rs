//! Fuel types and their emissions factors.
//!
//! Factors are pounds of CO2-equivalent per kWh generated, from
//! <https://www.eia.gov/tools/faqs/faq.php?id=74&t=11>. The hourly fuel-type
//! dataset reports short codes (`COL`), the daily dataset and `type-name`
//! report long labels (`Coal`, `Natural gas`, sometimes `Natural Gas`). Both
//! spellings, in any case, resolve to the same factor; anything else is an
//! error rather than a guessed factor.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::GridMixError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum FuelType {
    #[strum(to_string = "Coal", serialize = "COL")]
    Coal,
    #[strum(to_string = "Natural gas", serialize = "NG")]
    NaturalGas,
    #[strum(to_string = "Petroleum", serialize = "OIL")]
    Petroleum,
    #[strum(to_string = "Nuclear", serialize = "NUC")]
    Nuclear,
    #[strum(to_string = "Solar", serialize = "SUN")]
    Solar,
    #[strum(to_string = "Hydro", serialize = "WAT")]
    Hydro,
    #[strum(to_string = "Wind", serialize = "WND")]
    Wind,
    #[strum(to_string = "Other", serialize = "OTH")]
    Other,
}

impl FuelType {
    /// Resolve an upstream label (short code or long name).
    pub fn from_label(label: &str) -> Result<Self, GridMixError> {
        FuelType::from_str(label.trim())
            .map_err(|_| GridMixError::UnknownFuelType(label.to_string()))
    }

    /// Pounds of CO2e emitted per kWh generated.
    pub fn lbs_co2_per_kwh(&self) -> f64 {
        match self {
            FuelType::Coal => 2.30,
            FuelType::NaturalGas => 0.97,
            FuelType::Petroleum => 2.38,
            FuelType::Nuclear => 0.0,
            FuelType::Solar => 0.0,
            FuelType::Hydro => 0.0,
            FuelType::Wind => 0.0,
            // EIA's average across all power sources
            FuelType::Other => 0.86,
        }
    }
}
