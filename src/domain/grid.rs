use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FuelType, MeasurementType, Region};

/// One region-level measurement for one hour.
///
/// For a complete region-hour `TotalInterchange = NetGeneration - Demand` is
/// assumed but never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionTimepoint {
    pub region: Region,
    pub timestamp: NaiveDateTime,
    pub measurement: MeasurementType,
    pub value_mwh: f64,
}

/// Energy moved from `source_region` into `destination_region`.
///
/// Positive values are imports into the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeEdge {
    pub timestamp: NaiveDateTime,
    pub source_region: Region,
    pub destination_region: Region,
    pub mwh: f64,
}

/// Energy consumed locally during one hour, by the region that generated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionBySource {
    pub timestamp: NaiveDateTime,
    pub source_region: Region,
    pub mwh_consumed_locally: f64,
}

/// Raw generation of one fuel label in one region-hour, as reported upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelGeneration {
    pub timestamp: NaiveDateTime,
    pub region: Region,
    pub fuel_label: String,
    pub generation_mwh: f64,
}

/// Generation of one fuel type with its share of the region-hour total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixRow {
    pub timestamp: NaiveDateTime,
    pub region: Region,
    pub fuel_type: FuelType,
    pub generation_mwh: f64,
    pub pct_of_region_generation: f64,
}

/// Locally consumed energy attributed to a source region and fuel type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedUsageRow {
    pub timestamp: NaiveDateTime,
    pub source_region: Region,
    pub fuel_type: FuelType,
    pub usage_mwh: f64,
    pub emissions_per_kwh: f64,
    pub emissions_lbs: f64,
}

/// Consumption-weighted carbon intensity of one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyIntensity {
    pub timestamp: NaiveDateTime,
    pub total_usage_mwh: f64,
    pub total_emissions_lbs: f64,
    pub lbs_co2_per_kwh: f64,
}

/// Mean intensity of one hour of the day across a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockHourIntensity {
    pub hour: u32,
    pub lbs_co2_per_kwh: f64,
}

/// Distribution of hourly intensity for one BA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitySummary {
    pub ba_name: Region,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    pub median: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

/// Total of one measurement type for one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyDemandByHour {
    pub hour: u32,
    pub measurement: MeasurementType,
    pub total_mwh: f64,
}

/// Hourly intensity for a BA together with the UTC offsets the grid data declared.
///
/// Timestamps are local-clock and timezone-naive; `declared_offsets` keeps the
/// offset upstream attached to each hour (when it sent one) so joins against
/// weather can detect misalignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensitySeries {
    pub hours: Vec<HourlyIntensity>,
    #[serde(default)]
    pub declared_offsets: BTreeMap<NaiveDateTime, i32>,
}

impl IntensitySeries {
    /// Intensity keyed by local-clock hour.
    pub fn by_hour(&self) -> BTreeMap<NaiveDateTime, f64> {
        self.hours
            .iter()
            .map(|h| (h.timestamp, h.lbs_co2_per_kwh))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}
