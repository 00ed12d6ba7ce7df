//! End-to-end grid and home scenarios over in-memory data.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use load_shifting_carbon::cache::ResultCache;
use load_shifting_carbon::domain::{FuelType, HomeCharacteristics, Region};
use load_shifting_carbon::grid_mix::{GridMixPipeline, PipelineSettings};
use load_shifting_carbon::simulation::{
    model_one_house, ScenarioComparator, SimulationSettings, SyntheticWeather, WeatherSeries,
};
use load_shifting_carbon::source::{Dataset, InMemorySource, SourceRow};
use std::sync::Arc;

const DEMAND_MWH: f64 = 1_000.0;

fn row(region: &str, counterpart: Option<&str>, at: NaiveDateTime, label: Option<&str>, value: f64) -> SourceRow {
    SourceRow {
        region: Region::new(region),
        counterpart: counterpart.map(Region::new),
        timestamp: at,
        utc_offset_seconds: Some(-7 * 3600),
        label: label.map(str::to_string),
        value,
    }
}

fn april_hours() -> impl Iterator<Item = NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2024, 4, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..30 * 24).map(move |h| start + Duration::hours(h))
}

/// CISO generates nothing of its own and imports its whole demand from BPAT.
fn fully_importing_source() -> Arc<InMemorySource> {
    let mut region = Vec::new();
    let mut interchange = Vec::new();
    let mut fuel = Vec::new();
    for at in april_hours() {
        region.push(row("CISO", None, at, Some("D"), DEMAND_MWH));
        region.push(row("CISO", None, at, Some("NG"), 0.0));
        region.push(row("CISO", None, at, Some("TI"), -DEMAND_MWH));
        interchange.push(row("CISO", Some("BPAT"), at, None, DEMAND_MWH));
        fuel.push(row("CISO", None, at, Some("SUN"), 0.0));
        fuel.push(row("BPAT", None, at, Some("WAT"), 6_000.0));
        fuel.push(row("BPAT", None, at, Some("NG"), 3_000.0));
        fuel.push(row("BPAT", None, at, Some("NUC"), 1_000.0));
    }
    Arc::new(
        InMemorySource::new()
            .with_rows(Dataset::RegionData, region)
            .with_rows(Dataset::InterchangeData, interchange)
            .with_rows(Dataset::FuelTypeData, fuel),
    )
}

fn april() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )
}

#[tokio::test]
async fn test_full_import_follows_exporter_mix() {
    let pipeline = GridMixPipeline::new(
        fully_importing_source(),
        ResultCache::in_memory(),
        PipelineSettings::default(),
    );
    let (start, end) = april();
    let usage = pipeline
        .fuel_mix_after_import_export(&Region::new("CISO"), start, end)
        .await
        .unwrap();

    let own: f64 = usage
        .rows
        .iter()
        .filter(|r| r.source_region == Region::new("CISO"))
        .map(|r| r.usage_mwh)
        .sum();
    assert!(own.abs() < 1e-9, "own-generation contribution {own}");

    for at in april_hours() {
        let hour: Vec<_> = usage.rows.iter().filter(|r| r.timestamp == at).collect();
        let usage_of = |fuel: FuelType| {
            hour.iter()
                .filter(|r| r.source_region == Region::new("BPAT") && r.fuel_type == fuel)
                .map(|r| r.usage_mwh)
                .sum::<f64>()
        };
        assert!((usage_of(FuelType::Hydro) - 0.6 * DEMAND_MWH).abs() < 1e-6);
        assert!((usage_of(FuelType::NaturalGas) - 0.3 * DEMAND_MWH).abs() < 1e-6);
        assert!((usage_of(FuelType::Nuclear) - 0.1 * DEMAND_MWH).abs() < 1e-6);
    }

    let series = pipeline
        .intensity_series(&Region::new("CISO"), start, end)
        .await
        .unwrap();
    assert_eq!(series.hours.len(), 30 * 24);
    for hour in &series.hours {
        assert!((hour.total_usage_mwh - DEMAND_MWH).abs() < 1e-6);
        assert!((hour.lbs_co2_per_kwh - 0.3 * 0.97).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_summary_skips_regions_without_data() {
    let pipeline = GridMixPipeline::new(
        fully_importing_source(),
        ResultCache::in_memory(),
        PipelineSettings::default(),
    );
    let (start, end) = april();
    let summaries = pipeline
        .summaries(
            &[Region::new("CISO"), Region::new("ERCO"), Region::new("OVEC")],
            start,
            end,
        )
        .await
        .unwrap();

    assert_eq!(summaries.len(), 1);
    let ciso = &summaries[0];
    assert_eq!(ciso.ba_name, Region::new("CISO"));
    assert!((ciso.min - ciso.max).abs() < 1e-9);
}

#[test]
fn test_better_envelope_uses_less_energy_over_a_year() {
    let (lat, lon) = (44.645, -72.827);
    let weather = WeatherSeries::synthetic(&SyntheticWeather::year(lat, lon, 2023)).unwrap();
    let settings = SimulationSettings::default();

    let kwh = |home: &HomeCharacteristics| -> f64 {
        model_one_house(home, &weather, None, &settings)
            .unwrap()
            .iter()
            .map(|s| s.hvac_energy_kwh)
            .sum()
    };

    let leaky = HomeCharacteristics::baseline_home(lat, lon).with_insulation(11.0, 10.0);
    let tight = HomeCharacteristics::baseline_home(lat, lon).with_insulation(27.0, 1.5);
    let (leaky_kwh, tight_kwh) = (kwh(&leaky), kwh(&tight));

    assert!(leaky_kwh > 0.0);
    assert!(tight_kwh < leaky_kwh, "R-27 {tight_kwh} kWh vs R-11 {leaky_kwh} kWh");
}

#[tokio::test]
async fn test_comparison_against_imported_intensity() {
    let pipeline = GridMixPipeline::new(
        fully_importing_source(),
        ResultCache::in_memory(),
        PipelineSettings::default(),
    );
    let (start, end) = april();
    let intensity = pipeline
        .intensity_series(&Region::new("CISO"), start, end)
        .await
        .unwrap();

    let (lat, lon) = (37.77, -122.42);
    let weather = WeatherSeries::synthetic(
        &SyntheticWeather::year(lat, lon, 2024)
            .with_window(start, 30)
            .with_utc_offset(-7),
    )
    .unwrap();

    let homes = vec![
        ("baseline".to_string(), HomeCharacteristics::baseline_home(lat, lon)),
        ("improved".to_string(), HomeCharacteristics::improved_home(lat, lon)),
    ];
    let comparison = ScenarioComparator::new(SimulationSettings::default())
        .compare(&homes, &weather, &intensity)
        .unwrap();

    assert_eq!(comparison.baseline, "baseline");
    let base = comparison.scenario("baseline").unwrap();
    assert_eq!(base.unmatched_steps, 0);
    assert_eq!(base.timezone_mismatched_steps, 0);
    assert!((base.total_lbs_co2 - base.total_hvac_kwh * 0.3 * 0.97).abs() < 1e-6);
    assert_eq!(comparison.differences.len(), 1);
    assert_eq!(comparison.differences[0].name, "improved");
}
