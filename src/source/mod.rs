//! Timeseries sources for grid data.
//!
//! The pipeline only depends on [`TimeseriesSource`]; [`EiaClient`] talks to the
//! EIA v2 API and [`InMemorySource`] serves fixed rows.

pub mod eia;
pub mod memory;
pub mod period;

pub use eia::{EiaClient, EiaClientConfig};
pub use memory::InMemorySource;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::Display;

use crate::domain::{FuelGeneration, InterchangeEdge, MeasurementType, Region, RegionTimepoint};
use crate::error::GridMixError;

/// Which measurement family to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Demand, net generation and total interchange per respondent
    RegionData,
    /// Interchange into the requested BAs, by neighbouring BA
    InterchangeData,
    /// Net generation by fuel type per respondent
    FuelTypeData,
}

/// Reporting frequency of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    #[strum(to_string = "local-hourly")]
    LocalHourly,
    #[strum(to_string = "daily")]
    Daily,
}

impl Dataset {
    /// Upstream route segment under `electricity/rto`.
    pub fn url_segment(&self, frequency: Frequency) -> &'static str {
        match (self, frequency) {
            (Dataset::RegionData, Frequency::LocalHourly) => "region-data",
            (Dataset::RegionData, Frequency::Daily) => "daily-region-data",
            (Dataset::InterchangeData, Frequency::LocalHourly) => "interchange-data",
            (Dataset::InterchangeData, Frequency::Daily) => "daily-interchange-data",
            (Dataset::FuelTypeData, Frequency::LocalHourly) => "fuel-type-data",
            (Dataset::FuelTypeData, Frequency::Daily) => "daily-fuel-type-data",
        }
    }

    /// Facet that selects the requested regions.
    pub fn region_facet(&self) -> &'static str {
        match self {
            Dataset::InterchangeData => "toba",
            Dataset::RegionData | Dataset::FuelTypeData => "respondent",
        }
    }
}

/// A bounded request for one dataset over a set of regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub dataset: Dataset,
    pub frequency: Frequency,
    pub regions: Vec<Region>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchRequest {
    pub fn hourly(dataset: Dataset, regions: Vec<Region>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            dataset,
            frequency: Frequency::LocalHourly,
            regions,
            start,
            end,
        }
    }

    pub fn regions_label(&self) -> String {
        self.regions
            .iter()
            .map(Region::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn no_data(&self) -> GridMixError {
        GridMixError::NoData {
            dataset: self.dataset.url_segment(self.frequency).to_string(),
            regions: self.regions_label(),
        }
    }
}

/// One upstream row, before it is typed into a domain row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Respondent, or receiving BA (`toba`) for interchange rows
    pub region: Region,
    /// Sending BA (`fromba`) for interchange rows
    pub counterpart: Option<Region>,
    /// Local-clock timestamp
    pub timestamp: NaiveDateTime,
    /// UTC offset the period string carried, if any
    pub utc_offset_seconds: Option<i32>,
    /// `type-name`, `fueltype` or `type`, whichever upstream sent
    pub label: Option<String>,
    pub value: f64,
}

impl SourceRow {
    /// Region measurement; `None` for demand-forecast rows.
    pub fn into_region_timepoint(self) -> Result<Option<RegionTimepoint>, GridMixError> {
        let label = self
            .label
            .ok_or_else(|| GridMixError::MalformedRow("region row without a type".to_string()))?;
        let measurement = MeasurementType::from_str(label.trim())
            .map_err(|_| GridMixError::MalformedRow(format!("unknown measurement type {label:?}")))?;
        if measurement == MeasurementType::DemandForecast {
            return Ok(None);
        }
        Ok(Some(RegionTimepoint {
            region: self.region,
            timestamp: self.timestamp,
            measurement,
            value_mwh: self.value,
        }))
    }

    pub fn into_interchange_edge(self) -> Result<InterchangeEdge, GridMixError> {
        let source_region = self.counterpart.ok_or_else(|| {
            GridMixError::MalformedRow("interchange row without a sending BA".to_string())
        })?;
        Ok(InterchangeEdge {
            timestamp: self.timestamp,
            source_region,
            destination_region: self.region,
            mwh: self.value,
        })
    }

    pub fn into_fuel_generation(self) -> Result<FuelGeneration, GridMixError> {
        let fuel_label = self
            .label
            .ok_or_else(|| GridMixError::MalformedRow("fuel row without a fuel type".to_string()))?;
        Ok(FuelGeneration {
            timestamp: self.timestamp,
            region: self.region,
            fuel_label,
            generation_mwh: self.value,
        })
    }
}

#[async_trait]
pub trait TimeseriesSource: Send + Sync {
    /// Fetch every row for the request.
    ///
    /// Implementations return [`GridMixError::NoData`] when nothing matches and
    /// never return a silently truncated result.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<SourceRow>, GridMixError>;
}
