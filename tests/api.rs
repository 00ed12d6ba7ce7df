//! HTTP API over an in-memory source.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use load_shifting_carbon::api;
use load_shifting_carbon::app::AppState;
use load_shifting_carbon::cache::ResultCache;
use load_shifting_carbon::config::Config;
use load_shifting_carbon::domain::{HomeCharacteristics, Region};
use load_shifting_carbon::source::{Dataset, InMemorySource, SourceRow};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

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

/// Two days of CISO data, importing a quarter of its demand from BPAT.
fn source() -> InMemorySource {
    let start = NaiveDate::from_ymd_opt(2024, 4, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut region = Vec::new();
    let mut interchange = Vec::new();
    let mut fuel = Vec::new();
    for h in 0..48 {
        let at = start + Duration::hours(h);
        let demand = 800.0 + 10.0 * (h % 24) as f64;
        region.push(row("CISO", None, at, Some("D"), demand));
        region.push(row("CISO", None, at, Some("NG"), demand * 0.75));
        interchange.push(row("CISO", Some("BPAT"), at, None, demand * 0.25));
        fuel.push(row("CISO", None, at, Some("NG"), demand * 0.5));
        fuel.push(row("CISO", None, at, Some("SUN"), demand * 0.25));
        fuel.push(row("BPAT", None, at, Some("WAT"), 5_000.0));
    }
    InMemorySource::new()
        .with_rows(Dataset::RegionData, region)
        .with_rows(Dataset::InterchangeData, interchange)
        .with_rows(Dataset::FuelTypeData, fuel)
}

fn app() -> Router {
    let cfg = Config::default();
    let state = AppState::from_parts(cfg.clone(), Arc::new(source()), ResultCache::in_memory()).unwrap();
    api::router(state, &cfg)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = get("/api/v1/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_hourly_intensity() {
    let (status, body) = get("/api/v1/carbon-intensity/CISO/hourly?start=2024-04-01&end=2024-04-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ba"], "CISO");
    let hours = body["hours"].as_array().unwrap();
    assert_eq!(hours.len(), 24);
    // Two thirds of the local share is gas, the import is hydro.
    let intensity = hours[0]["lbs_co2_per_kwh"].as_f64().unwrap();
    assert!((intensity - 0.75 * (2.0 / 3.0) * 0.97).abs() < 1e-9);
}

#[tokio::test]
async fn test_clock_hours_with_weighting() {
    let (status, body) = get(
        "/api/v1/carbon-intensity/CISO/clock-hours?start=2024-04-01&end=2024-04-02&weighting=energy_weighted",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let table = body.as_array().unwrap();
    assert_eq!(table.len(), 24);
    assert_eq!(table[0]["hour"], 0);
    assert_eq!(table[23]["hour"], 23);
}

#[tokio::test]
async fn test_summary_skips_missing_bas() {
    let (status, body) = get("/api/v1/carbon-intensity/summary?bas=CISO,ERCO&start=2024-04-01&end=2024-04-02").await;
    assert_eq!(status, StatusCode::OK);
    let summaries = body.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["ba_name"], "CISO");
}

#[tokio::test]
async fn test_supply_demand() {
    let (status, body) = get("/api/v1/supply-demand/CISO/clock-hours?start=2024-04-01&end=2024-04-02").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reversed_window_is_bad_request() {
    let (status, body) = get("/api/v1/carbon-intensity/CISO/hourly?start=2024-04-02&end=2024-04-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn test_unknown_ba_is_not_found() {
    let (status, body) = get("/api/v1/carbon-intensity/ERCO/hourly?start=2024-04-01&end=2024-04-02").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

fn compare_body(step_minutes: u32) -> Value {
    let (lat, lon) = (37.77, -122.42);
    json!({
        "ba": "CISO",
        "start": "2024-04-01",
        "end": "2024-04-02",
        "homes": {
            "old": HomeCharacteristics::baseline_home(lat, lon),
            "retrofit": HomeCharacteristics::improved_home(lat, lon),
        },
        "baseline": "retrofit",
        "step_minutes": step_minutes,
    })
}

#[tokio::test]
async fn test_compare_with_synthetic_weather() {
    let (status, body) = post("/api/v1/scenarios/compare", compare_body(30)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["baseline"], "retrofit");

    let scenarios = body["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0]["name"], "retrofit");
    // Weather follows the grid's declared -07:00 offset.
    assert_eq!(scenarios[0]["unmatched_steps"], 0);
    assert_eq!(scenarios[0]["timezone_mismatched_steps"], 0);
    assert_eq!(scenarios[0]["trace"].as_array().unwrap().len(), 2 * 24 * 2);
    assert_eq!(body["differences"][0]["name"], "old");
}

#[tokio::test]
async fn test_compare_rejects_zero_step() {
    let (status, _) = post("/api/v1/scenarios/compare", compare_body(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_rejects_invalid_home() {
    let mut body = compare_body(30);
    body["homes"]["old"]["heating_setpoint_c"] = json!(30.0);
    let (status, body) = post("/api/v1/scenarios/compare", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_compare_rejects_oversized_window() {
    let mut body = compare_body(30);
    body["start"] = json!("1900-01-01");
    let (status, body) = post("/api/v1/scenarios/compare", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn test_intensity_rejects_oversized_window() {
    let (status, _) = get("/api/v1/carbon-intensity/CISO/hourly?start=2020-01-01&end=2024-04-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
