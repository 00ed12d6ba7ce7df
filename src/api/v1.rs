use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::error::ApiError;
use crate::app::AppState;
use crate::domain::{
    ClockHourIntensity, HomeCharacteristics, HourlyIntensity, IntensitySummary, Region,
    SupplyDemandByHour,
};
use crate::grid_mix::ClockHourWeighting;
use crate::simulation::{ScenarioComparison, SyntheticWeather, WeatherPoint, WeatherSeries};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/carbon-intensity/summary", get(intensity_summary))
        .route("/carbon-intensity/:ba/hourly", get(hourly_intensity))
        .route("/carbon-intensity/:ba/clock-hours", get(clock_hour_intensity))
        .route("/supply-demand/:ba/clock-hours", get(supply_demand))
        .route("/scenarios/compare", post(compare_scenarios))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Missing dates default to the configured window ending today.
fn resolve_window(
    st: &AppState,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    let start = start
        .unwrap_or_else(|| end - Duration::days(i64::from(st.cfg.analysis.default_window_days)));
    check_window(st, start, end)?;
    Ok((start, end))
}

/// Inclusive day count of the window, bounded by `analysis.max_window_days`.
fn check_window(st: &AppState, start: NaiveDate, end: NaiveDate) -> Result<u32, ApiError> {
    if start > end {
        return Err(ApiError::BadRequest(format!(
            "start {start} is after end {end}"
        )));
    }
    let max = st.cfg.analysis.max_window_days;
    let days = (end - start).num_days() + 1;
    match u32::try_from(days) {
        Ok(days) if days <= max => Ok(days),
        _ => Err(ApiError::BadRequest(format!(
            "window of {days} days exceeds the {max} day limit"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct HourlyResponse {
    pub ba: Region,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub hours: Vec<HourlyIntensity>,
}

pub async fn hourly_intensity(
    State(st): State<AppState>,
    Path(ba): Path<String>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<HourlyResponse>, ApiError> {
    let (start, end) = resolve_window(&st, q.start, q.end)?;
    let ba = Region::new(ba);
    let series = st.pipeline.intensity_series(&ba, start, end).await?;
    Ok(Json(HourlyResponse {
        ba,
        start,
        end,
        hours: series.hours,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClockHourQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub weighting: Option<ClockHourWeighting>,
}

pub async fn clock_hour_intensity(
    State(st): State<AppState>,
    Path(ba): Path<String>,
    Query(q): Query<ClockHourQuery>,
) -> Result<Json<Vec<ClockHourIntensity>>, ApiError> {
    let (start, end) = resolve_window(&st, q.start, q.end)?;
    let table = st
        .pipeline
        .clock_hour_intensity(&Region::new(ba), start, end, q.weighting)
        .await?;
    Ok(Json(table))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Comma-separated BA codes
    pub bas: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub async fn intensity_summary(
    State(st): State<AppState>,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<Vec<IntensitySummary>>, ApiError> {
    let (start, end) = resolve_window(&st, q.start, q.end)?;
    let regions: Vec<Region> = q
        .bas
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Region::new)
        .collect();
    if regions.is_empty() {
        return Err(ApiError::BadRequest("bas must name at least one BA".to_string()));
    }
    Ok(Json(st.pipeline.summaries(&regions, start, end).await?))
}

pub async fn supply_demand(
    State(st): State<AppState>,
    Path(ba): Path<String>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Vec<SupplyDemandByHour>>, ApiError> {
    let (start, end) = resolve_window(&st, q.start, q.end)?;
    let rows = st
        .pipeline
        .supply_demand_by_clock_hour(&Region::new(ba), start, end)
        .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub ba: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub homes: BTreeMap<String, HomeCharacteristics>,
    /// Scenario the others are compared against; first by name when omitted
    pub baseline: Option<String>,
    pub weather: Option<Vec<WeatherPoint>>,
    pub step_minutes: Option<u32>,
}

pub async fn compare_scenarios(
    State(st): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ScenarioComparison>, ApiError> {
    let days = check_window(&st, req.start, req.end)?;
    for home in req.homes.values() {
        home.validate()?;
    }

    let mut homes: Vec<(String, HomeCharacteristics)> = req.homes.into_iter().collect();
    if let Some(baseline) = &req.baseline {
        let idx = homes
            .iter()
            .position(|(name, _)| name == baseline)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown baseline scenario {baseline:?}")))?;
        homes.swap(0, idx);
    }
    let Some((_, first_home)) = homes.first() else {
        return Err(ApiError::BadRequest("homes must not be empty".to_string()));
    };

    let mut comparator = st.comparator.clone();
    if let Some(step) = req.step_minutes {
        if step == 0 {
            return Err(ApiError::BadRequest("step_minutes must be positive".to_string()));
        }
        comparator = comparator.with_step_minutes(step);
    }

    let intensity = st
        .pipeline
        .intensity_series(&Region::new(&req.ba), req.start, req.end)
        .await?;

    let weather = match req.weather {
        Some(points) => WeatherSeries::new(points),
        None => {
            // Follow the grid's declared offset so the naive join lines up.
            let offset_hours = intensity
                .declared_offsets
                .values()
                .next()
                .map(|s| s / 3600)
                .unwrap_or_else(|| (first_home.longitude / 15.0).round() as i32);
            let cfg = SyntheticWeather::year(first_home.latitude, first_home.longitude, 2024)
                .with_window(req.start, days)
                .with_utc_offset(offset_hours);
            let cfg = SyntheticWeather {
                step_minutes: comparator.settings().step_minutes,
                ..cfg
            };
            WeatherSeries::synthetic(&cfg)?
        }
    };

    Ok(Json(comparator.compare(&homes, &weather, &intensity)?))
}
