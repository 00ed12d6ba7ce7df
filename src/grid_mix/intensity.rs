//! Carbon intensity aggregation.

use chrono::{NaiveDateTime, Timelike};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::domain::{AttributedUsageRow, ClockHourIntensity, HourlyIntensity, IntensitySummary, Region};

/// How hours of the same clock hour are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClockHourWeighting {
    /// Mean of the hourly intensities
    #[default]
    Unweighted,
    /// Total emissions over total usage
    EnergyWeighted,
}

/// Collapse attributed rows to one intensity per hour.
///
/// Hours with zero total usage have no defined intensity and are left out.
pub fn aggregate_hourly(rows: &[AttributedUsageRow]) -> Vec<HourlyIntensity> {
    let mut sums: BTreeMap<NaiveDateTime, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let entry = sums.entry(row.timestamp).or_insert((0.0, 0.0));
        entry.0 += row.usage_mwh;
        entry.1 += row.emissions_lbs;
    }

    sums.into_iter()
        .filter(|(_, (usage, _))| *usage != 0.0)
        .map(|(timestamp, (usage, emissions))| HourlyIntensity {
            timestamp,
            total_usage_mwh: usage,
            total_emissions_lbs: emissions,
            lbs_co2_per_kwh: emissions / (usage * 1000.0),
        })
        .collect()
}

/// Intensity per hour of the day (0-23) across all days in `hourly`.
pub fn aggregate_by_clock_hour(
    hourly: &[HourlyIntensity],
    weighting: ClockHourWeighting,
) -> Vec<ClockHourIntensity> {
    let mut buckets: BTreeMap<u32, Vec<&HourlyIntensity>> = BTreeMap::new();
    for h in hourly {
        buckets.entry(h.timestamp.hour()).or_default().push(h);
    }

    buckets
        .into_iter()
        .filter_map(|(hour, items)| {
            let value = match weighting {
                ClockHourWeighting::Unweighted => {
                    items.iter().map(|h| h.lbs_co2_per_kwh).sum::<f64>() / items.len() as f64
                }
                ClockHourWeighting::EnergyWeighted => {
                    let usage: f64 = items.iter().map(|h| h.total_usage_mwh).sum();
                    if usage == 0.0 {
                        return None;
                    }
                    let emissions: f64 = items.iter().map(|h| h.total_emissions_lbs).sum();
                    emissions / (usage * 1000.0)
                }
            };
            Some(ClockHourIntensity {
                hour,
                lbs_co2_per_kwh: value,
            })
        })
        .collect()
}

/// Five-number summary of hourly intensity, `None` for an empty series.
pub fn summarize(ba_name: &Region, hourly: &[HourlyIntensity]) -> Option<IntensitySummary> {
    let mut values: Vec<OrderedFloat<f64>> = hourly
        .iter()
        .map(|h| OrderedFloat(h.lbs_co2_per_kwh))
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort();
    let sorted: Vec<f64> = values.into_iter().map(|v| v.into_inner()).collect();

    Some(IntensitySummary {
        ba_name: ba_name.clone(),
        min: sorted[0],
        p25: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        p75: percentile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
