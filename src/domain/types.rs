use chrono::{Duration, DurationRound, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

// ============================================================================
// Region
// ============================================================================

/// Balancing authority code (e.g. `CISO`, `BPAT`).
///
/// Codes are normalized to upper case so that `"ciso"` and `"CISO"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// ============================================================================
// Measurement types
// ============================================================================

/// Kind of a region-level measurement.
///
/// Upstream uses short codes in `type` (`D`, `NG`, `TI`) and long labels in
/// `type-name`; both parse to the same variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum MeasurementType {
    #[strum(to_string = "Demand", serialize = "D")]
    Demand,
    #[strum(to_string = "Net generation", serialize = "NG")]
    NetGeneration,
    #[strum(to_string = "Total interchange", serialize = "TI")]
    TotalInterchange,
    /// Day-ahead demand forecast; recognized so it can be ignored.
    #[strum(to_string = "Day-ahead demand forecast", serialize = "DF")]
    DemandForecast,
}

impl MeasurementType {
    /// Upstream short code, used when filtering requests.
    pub fn code(&self) -> &'static str {
        match self {
            MeasurementType::Demand => "D",
            MeasurementType::NetGeneration => "NG",
            MeasurementType::TotalInterchange => "TI",
            MeasurementType::DemandForecast => "DF",
        }
    }
}

// ============================================================================
// Time helpers
// ============================================================================

/// Truncate a local-clock timestamp to the start of its hour.
///
/// This is the join key between weather steps and grid intensity.
pub fn clock_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .duration_trunc(Duration::hours(1))
        .unwrap_or(timestamp)
}
