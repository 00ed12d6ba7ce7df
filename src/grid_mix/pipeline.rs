use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::attribution::attribute;
use super::consumption::{reconcile, supply_demand_by_clock_hour};
use super::intensity::{aggregate_by_clock_hour, aggregate_hourly, summarize, ClockHourWeighting};
use crate::cache::{CacheKey, ResultCache};
use crate::domain::{
    AttributedUsageRow, ClockHourIntensity, ConsumptionBySource, IntensitySeries, IntensitySummary,
    InterchangeEdge, Region, RegionTimepoint, SupplyDemandByHour,
};
use crate::error::GridMixError;
use crate::source::{Dataset, FetchRequest, TimeseriesSource};

const USAGE_CACHE_FN: &str = "hourly_gen_mix_by_ba_and_type";
const SUMMARY_CACHE_FN: &str = "co2_boxplot_all_bas";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// BAs known to have no data; left out of multi-BA summaries
    pub skip_regions: Vec<Region>,
    pub weighting: ClockHourWeighting,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            skip_regions: ["NSB", "OVEC", "EEI", "GLHB", "AEC", "GRIF"]
                .into_iter()
                .map(Region::new)
                .collect(),
            weighting: ClockHourWeighting::Unweighted,
        }
    }
}

/// Attributed usage for a BA/window plus the UTC offsets its region data declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBreakdown {
    pub rows: Vec<AttributedUsageRow>,
    pub declared_offsets: BTreeMap<NaiveDateTime, i32>,
}

struct RegionWindow {
    rows: Vec<RegionTimepoint>,
    declared_offsets: BTreeMap<NaiveDateTime, i32>,
}

/// Fetch → reconcile → attribute → aggregate, with cached stages.
pub struct GridMixPipeline {
    source: Arc<dyn TimeseriesSource>,
    cache: ResultCache,
    settings: PipelineSettings,
}

impl GridMixPipeline {
    pub fn new(source: Arc<dyn TimeseriesSource>, cache: ResultCache, settings: PipelineSettings) -> Self {
        Self {
            source,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    async fn region_window(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RegionWindow, GridMixError> {
        let request = FetchRequest::hourly(Dataset::RegionData, vec![region.clone()], start, end);
        let mut rows = Vec::new();
        let mut declared_offsets = BTreeMap::new();
        for raw in self.source.fetch(&request).await? {
            if let Some(offset) = raw.utc_offset_seconds {
                declared_offsets.insert(raw.timestamp, offset);
            }
            if let Some(tp) = raw.into_region_timepoint()? {
                rows.push(tp);
            }
        }
        Ok(RegionWindow {
            rows,
            declared_offsets,
        })
    }

    /// Interchange into `region`. A BA with no interchange rows imports nothing.
    async fn imports(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<InterchangeEdge>, GridMixError> {
        let request = FetchRequest::hourly(Dataset::InterchangeData, vec![region.clone()], start, end);
        match self.source.fetch(&request).await {
            Ok(rows) => rows.into_iter().map(|r| r.into_interchange_edge()).collect(),
            Err(e) if e.is_no_data() => {
                warn!(region = %region, "no interchange rows; assuming no imports");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Hourly consumption of `region` split by generating region.
    pub async fn consumption_by_source(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ConsumptionBySource>, GridMixError> {
        let window = self.region_window(region, start, end).await?;
        let interchange = self.imports(region, start, end).await?;
        Ok(reconcile(region, &window.rows, &interchange))
    }

    /// Consumption of `region` attributed to source region and fuel type.
    pub async fn fuel_mix_after_import_export(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<UsageBreakdown, GridMixError> {
        let window = self.region_window(region, start, end).await?;
        let interchange = self.imports(region, start, end).await?;
        let consumption = reconcile(region, &window.rows, &interchange);
        info!(region = %region, rows = consumption.len(), "reconciled consumption by source");

        let rows = attribute(self.source.as_ref(), &consumption, start, end).await?;
        Ok(UsageBreakdown {
            rows,
            declared_offsets: window.declared_offsets,
        })
    }

    /// Cached [`Self::fuel_mix_after_import_export`].
    pub async fn usage_by_source_and_fuel(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<UsageBreakdown, GridMixError> {
        let key = CacheKey::new(USAGE_CACHE_FN, &json!({ "ba": region }), start, end)?;
        self.cache
            .get_or_compute(&key, || self.fuel_mix_after_import_export(region, start, end))
            .await
    }

    pub async fn intensity_series(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IntensitySeries, GridMixError> {
        let usage = self.usage_by_source_and_fuel(region, start, end).await?;
        let hours = aggregate_hourly(&usage.rows);
        info!(region = %region, hours = hours.len(), "aggregated hourly intensity");
        Ok(IntensitySeries {
            hours,
            declared_offsets: usage.declared_offsets,
        })
    }

    /// Intensity per hour of day; `weighting` defaults to the configured one.
    pub async fn clock_hour_intensity(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
        weighting: Option<ClockHourWeighting>,
    ) -> Result<Vec<ClockHourIntensity>, GridMixError> {
        let series = self.intensity_series(region, start, end).await?;
        Ok(aggregate_by_clock_hour(
            &series.hours,
            weighting.unwrap_or(self.settings.weighting),
        ))
    }

    async fn compute_summaries(
        &self,
        regions: &[Region],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntensitySummary>, GridMixError> {
        let mut out = Vec::new();
        for region in regions {
            if self.settings.skip_regions.contains(region) {
                continue;
            }
            let series = match self.intensity_series(region, start, end).await {
                Ok(series) => series,
                Err(e) if e.is_no_data() => {
                    warn!(region = %region, error = %e, "skipping BA without data");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match summarize(region, &series.hours) {
                Some(summary) => out.push(summary),
                None => warn!(region = %region, "no hours with usage; skipping BA"),
            }
        }
        Ok(out)
    }

    /// Five-number intensity summary per BA, cached for the region set.
    pub async fn summaries(
        &self,
        regions: &[Region],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntensitySummary>, GridMixError> {
        let key = CacheKey::new(
            SUMMARY_CACHE_FN,
            &json!({ "bas": regions, "skip": self.settings.skip_regions }),
            start,
            end,
        )?;
        self.cache
            .get_or_compute(&key, || self.compute_summaries(regions, start, end))
            .await
    }

    pub async fn supply_demand_by_clock_hour(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SupplyDemandByHour>, GridMixError> {
        let window = self.region_window(region, start, end).await?;
        Ok(supply_demand_by_clock_hour(&window.rows))
    }
}
