//! EIA client against a mock upstream.

use chrono::NaiveDate;
use load_shifting_carbon::domain::Region;
use load_shifting_carbon::source::{
    Dataset, EiaClient, EiaClientConfig, FetchRequest, Frequency, TimeseriesSource,
};
use load_shifting_carbon::GridMixError;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer, page_size: usize) -> EiaClient {
    EiaClient::new(EiaClientConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        page_size,
        timeout: Duration::from_secs(5),
        default_timezone_facet: Some("Pacific".to_string()),
    })
    .unwrap()
}

fn april() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )
}

fn region_request() -> FetchRequest {
    let (start, end) = april();
    FetchRequest::hourly(Dataset::RegionData, vec![Region::new("CISO")], start, end)
}

fn x_params(request: &Request) -> Value {
    request
        .headers
        .get("X-Params")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(Value::Null)
}

fn at_offset(offset: u64) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| x_params(request)["offset"] == json!(offset)
}

fn demand_row(hour: u32, value: f64) -> Value {
    json!({
        "period": format!("2024-04-01T{hour:02}-07"),
        "respondent": "CISO",
        "type": "D",
        "type-name": "Demand",
        "value": value,
    })
}

#[tokio::test]
async fn test_fetches_every_page_until_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/region-data/data/"))
        .and(query_param("api_key", "test-key"))
        .and(at_offset(0))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"total": 3, "data": [demand_row(0, 100.0), demand_row(1, 110.0)]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/region-data/data/"))
        .and(at_offset(2))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"total": "3", "data": [demand_row(2, 120.0)]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server, 2).fetch(&region_request()).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.region == Region::new("CISO")));
    assert_eq!(rows[2].value, 120.0);
    assert_eq!(rows[0].utc_offset_seconds, Some(-7 * 3600));
}

#[tokio::test]
async fn test_empty_page_mid_pagination_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(at_offset(0))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"total": 3, "data": [demand_row(0, 100.0), demand_row(1, 110.0)]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(at_offset(2))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": {"total": 3, "data": []}})),
        )
        .mount(&server)
        .await;

    let err = client(&server, 2).fetch(&region_request()).await.unwrap_err();
    assert!(
        matches!(err, GridMixError::Pagination { fetched: 2, total: 3 }),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_empty_first_page_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0, "data": []})))
        .mount(&server)
        .await;

    let err = client(&server, 5000).fetch(&region_request()).await.unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(err.to_string(), "no data rows for region-data (regions: CISO)");
}

#[tokio::test]
async fn test_upstream_rejection_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API_KEY_INVALID"))
        .mount(&server)
        .await;

    let err = client(&server, 5000).fetch(&region_request()).await.unwrap_err();
    match err {
        GridMixError::Upstream { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("API_KEY_INVALID"));
        }
        other => panic!("expected upstream error, got {other}"),
    }
}

#[tokio::test]
async fn test_timezone_facet_only_on_daily_requests() {
    let server = MockServer::start().await;
    let (start, end) = april();

    Mock::given(method("GET"))
        .and(path("/daily-fuel-type-data/data/"))
        .and(|request: &Request| x_params(request)["facets"]["timezone"] == json!(["Pacific"]))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"total": 1, "data": [{
                "period": "2024-04-01",
                "respondent": "CISO",
                "fueltype": "SUN",
                "value": "512.5",
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fuel-type-data/data/"))
        .and(|request: &Request| {
            let params = x_params(request);
            params["facets"].get("timezone").is_none()
                && params["frequency"] == json!("local-hourly")
                && params["facets"]["respondent"] == json!(["CISO"])
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "data": [{
                "period": "2024-04-01T00-07",
                "respondent": "CISO",
                "fueltype": "WAT",
                "value": 40,
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let eia = client(&server, 5000);
    let daily = eia
        .fetch(&FetchRequest {
            frequency: Frequency::Daily,
            ..FetchRequest::hourly(Dataset::FuelTypeData, vec![Region::new("CISO")], start, end)
        })
        .await
        .unwrap();
    assert_eq!(daily[0].label.as_deref(), Some("SUN"));
    assert_eq!(daily[0].value, 512.5);

    let hourly = eia
        .fetch(&FetchRequest::hourly(
            Dataset::FuelTypeData,
            vec![Region::new("CISO")],
            start,
            end,
        ))
        .await
        .unwrap();
    assert_eq!(hourly[0].label.as_deref(), Some("WAT"));
}

#[tokio::test]
async fn test_interchange_rows_keep_sender() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/interchange-data/data/"))
        .and(|request: &Request| x_params(request)["facets"]["toba"] == json!(["CISO"]))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"total": 2, "data": [
                {"period": "2024-04-01T00-07", "fromba": "BPAT", "toba": "CISO", "value": 300},
                {"period": "2024-04-01T00-07", "fromba": "AZPS", "toba": "CISO", "value": null},
            ]}
        })))
        .mount(&server)
        .await;

    let (start, end) = april();
    let rows = client(&server, 5000)
        .fetch(&FetchRequest::hourly(
            Dataset::InterchangeData,
            vec![Region::new("CISO")],
            start,
            end,
        ))
        .await
        .unwrap();
    // The null-valued row carries nothing and is dropped.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].counterpart, Some(Region::new("BPAT")));
    assert_eq!(rows[0].region, Region::new("CISO"));
}
