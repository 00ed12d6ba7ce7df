//! Consumption reconciliation: how much energy a region consumed each hour and
//! which region generated it.

use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::{
    ConsumptionBySource, InterchangeEdge, MeasurementType, Region, RegionTimepoint,
    SupplyDemandByHour,
};

#[derive(Default)]
struct LocalHour {
    demand: Option<f64>,
    net_generation: Option<f64>,
}

/// Split each hour's local consumption by source region.
///
/// The local row is `min(Demand, NetGeneration)`: a net importer burns all it
/// generates, a net exporter burns only its demand. Storage and line losses are
/// not modelled. Imports are interchange rows into `region`, summed per
/// sending region and clamped at zero.
///
/// Rows for other regions are ignored. Output is sorted by timestamp, then
/// source region, and `(timestamp, source_region)` is unique.
pub fn reconcile(
    region: &Region,
    region_rows: &[RegionTimepoint],
    interchange: &[InterchangeEdge],
) -> Vec<ConsumptionBySource> {
    let mut local: BTreeMap<NaiveDateTime, LocalHour> = BTreeMap::new();
    for row in region_rows.iter().filter(|r| &r.region == region) {
        let hour = local.entry(row.timestamp).or_default();
        match row.measurement {
            MeasurementType::Demand => {
                *hour.demand.get_or_insert(0.0) += row.value_mwh;
            }
            MeasurementType::NetGeneration => {
                *hour.net_generation.get_or_insert(0.0) += row.value_mwh;
            }
            MeasurementType::TotalInterchange | MeasurementType::DemandForecast => {}
        }
    }

    let mut out: BTreeMap<(NaiveDateTime, Region), f64> = BTreeMap::new();

    for (timestamp, hour) in &local {
        let used = match (hour.demand, hour.net_generation) {
            (Some(d), Some(ng)) => d.min(ng),
            (d, ng) => {
                warn!(
                    region = %region,
                    %timestamp,
                    has_demand = d.is_some(),
                    has_net_generation = ng.is_some(),
                    "missing demand or net generation; treating local use as 0"
                );
                0.0
            }
        };
        out.insert((*timestamp, region.clone()), used);
    }

    let mut imports: BTreeMap<(NaiveDateTime, Region), f64> = BTreeMap::new();
    for edge in interchange.iter().filter(|e| &e.destination_region == region) {
        if &edge.source_region == region {
            warn!(region = %region, timestamp = %edge.timestamp, "dropping self-interchange row");
            continue;
        }
        *imports
            .entry((edge.timestamp, edge.source_region.clone()))
            .or_insert(0.0) += edge.mwh;
    }
    // Exports (negative net flow) carry nothing into the region.
    for (key, mwh) in imports {
        out.insert(key, mwh.max(0.0));
    }

    debug!(region = %region, rows = out.len(), "reconciled consumption");

    out.into_iter()
        .map(|((timestamp, source_region), mwh)| ConsumptionBySource {
            timestamp,
            source_region,
            mwh_consumed_locally: mwh,
        })
        .collect()
}

/// Total of each region measurement per hour of the day.
pub fn supply_demand_by_clock_hour(region_rows: &[RegionTimepoint]) -> Vec<SupplyDemandByHour> {
    let mut totals: BTreeMap<(u32, MeasurementType), f64> = BTreeMap::new();
    for row in region_rows {
        if row.measurement == MeasurementType::DemandForecast {
            continue;
        }
        *totals
            .entry((row.timestamp.hour(), row.measurement))
            .or_insert(0.0) += row.value_mwh;
    }
    totals
        .into_iter()
        .map(|((hour, measurement), total_mwh)| SupplyDemandByHour {
            hour,
            measurement,
            total_mwh,
        })
        .collect()
}
