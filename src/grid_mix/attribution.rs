//! Fuel-mix attribution of locally consumed energy.

use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::domain::{AttributedUsageRow, ConsumptionBySource, FuelGeneration, FuelMixRow, FuelType, Region};
use crate::error::GridMixError;
use crate::source::{Dataset, FetchRequest, TimeseriesSource};

/// Each fuel's share of its region's generation, per hour.
///
/// Labels are resolved first so that an unknown fuel aborts before anything
/// is computed. Region-hours whose total generation is not positive have no
/// defined share and are skipped.
pub fn fuel_mix_shares(generation: &[FuelGeneration]) -> Result<Vec<FuelMixRow>, GridMixError> {
    let mut by_fuel: BTreeMap<(NaiveDateTime, Region, FuelType), f64> = BTreeMap::new();
    for row in generation {
        let fuel = FuelType::from_label(&row.fuel_label)?;
        *by_fuel
            .entry((row.timestamp, row.region.clone(), fuel))
            .or_insert(0.0) += row.generation_mwh;
    }

    let mut totals: HashMap<(NaiveDateTime, Region), f64> = HashMap::new();
    for ((timestamp, region, _), mwh) in &by_fuel {
        *totals.entry((*timestamp, region.clone())).or_insert(0.0) += mwh;
    }

    let mut skipped = 0usize;
    let mut rows = Vec::with_capacity(by_fuel.len());
    for ((timestamp, region), group) in &by_fuel
        .into_iter()
        .chunk_by(|((timestamp, region, _), _)| (*timestamp, region.clone()))
    {
        let total = totals.get(&(timestamp, region.clone())).copied().unwrap_or(0.0);
        if total <= 0.0 {
            warn!(region = %region, %timestamp, total, "non-positive total generation; no fuel shares");
            skipped += 1;
            continue;
        }
        for ((_, _, fuel_type), generation_mwh) in group {
            rows.push(FuelMixRow {
                timestamp,
                region: region.clone(),
                fuel_type,
                generation_mwh,
                pct_of_region_generation: generation_mwh / total,
            });
        }
    }

    if skipped > 0 {
        warn!(skipped, "region-hours skipped while computing fuel shares");
    }
    Ok(rows)
}

/// Spread each consumption row across its source region's fuel mix.
///
/// Inner join on `(timestamp, source_region)`: consumption without a matching
/// mix (and mix without consumption) produces nothing.
pub fn attribute_with_mix(
    consumption: &[ConsumptionBySource],
    mix: &[FuelMixRow],
) -> Vec<AttributedUsageRow> {
    let mut shares: HashMap<(NaiveDateTime, &Region), Vec<&FuelMixRow>> = HashMap::new();
    for row in mix {
        shares.entry((row.timestamp, &row.region)).or_default().push(row);
    }

    let mut out = Vec::new();
    for used in consumption {
        let Some(fuels) = shares.get(&(used.timestamp, &used.source_region)) else {
            continue;
        };
        for share in fuels {
            let usage_mwh = used.mwh_consumed_locally * share.pct_of_region_generation;
            let emissions_per_kwh = share.fuel_type.lbs_co2_per_kwh();
            out.push(AttributedUsageRow {
                timestamp: used.timestamp,
                source_region: used.source_region.clone(),
                fuel_type: share.fuel_type,
                usage_mwh,
                emissions_per_kwh,
                emissions_lbs: emissions_per_kwh * usage_mwh * 1000.0,
            });
        }
    }
    out.sort_by(|a, b| {
        (a.timestamp, &a.source_region, a.fuel_type).cmp(&(b.timestamp, &b.source_region, b.fuel_type))
    });
    out
}

/// Fetch the fuel mix of every source region in `consumption` and attribute.
pub async fn attribute(
    source: &dyn TimeseriesSource,
    consumption: &[ConsumptionBySource],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AttributedUsageRow>, GridMixError> {
    let regions: Vec<Region> = consumption
        .iter()
        .map(|c| c.source_region.clone())
        .unique()
        .sorted()
        .collect();
    if regions.is_empty() {
        return Ok(Vec::new());
    }

    let request = FetchRequest::hourly(Dataset::FuelTypeData, regions, start, end);
    let generation = source
        .fetch(&request)
        .await?
        .into_iter()
        .map(|row| row.into_fuel_generation())
        .collect::<Result<Vec<_>, _>>()?;

    let mix = fuel_mix_shares(&generation)?;
    let attributed = attribute_with_mix(consumption, &mix);
    info!(
        regions = %request.regions_label(),
        mix_rows = mix.len(),
        attributed_rows = attributed.len(),
        "attributed consumption to fuel types"
    );
    Ok(attributed)
}
