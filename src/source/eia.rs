//! EIA v2 "electricity/rto" client.
//!
//! Requests are described in an `X-Params` header and paged with
//! `offset`/`length`; the response declares the total row count. Pages are
//! fetched in a loop until that total is reached, and any failure or empty
//! page part-way through aborts the whole fetch.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::period::parse_period;
use super::{Dataset, FetchRequest, Frequency, SourceRow, TimeseriesSource};
use crate::domain::{MeasurementType, Region};
use crate::error::GridMixError;

/// Upstream maximum rows per call.
pub const MAX_PAGE_SIZE: usize = 5000;

#[derive(Debug, Clone)]
pub struct EiaClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_size: usize,
    pub timeout: Duration,
    /// Timezone facet added to daily requests unless the caller set one
    pub default_timezone_facet: Option<String>,
}

impl Default for EiaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.eia.gov/v2/electricity/rto".to_string(),
            api_key: String::new(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(60),
            default_timezone_facet: Some("Pacific".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct EiaClient {
    cfg: EiaClientConfig,
    client: reqwest::Client,
}

/// One decoded page.
struct Page {
    total: usize,
    rows: Vec<Map<String, Value>>,
}

impl EiaClient {
    pub fn new(cfg: EiaClientConfig) -> Result<Self, GridMixError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("load-shifting-carbon/0.1"),
        );
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { cfg, client })
    }

    fn url_for(&self, request: &FetchRequest) -> String {
        format!(
            "{}/{}/data/",
            self.cfg.base_url.trim_end_matches('/'),
            request.dataset.url_segment(request.frequency)
        )
    }

    fn facets_for(&self, request: &FetchRequest) -> BTreeMap<&'static str, Vec<String>> {
        let mut facets = BTreeMap::new();
        facets.insert(
            request.dataset.region_facet(),
            request.regions.iter().map(|r| r.to_string()).collect(),
        );
        if request.dataset == Dataset::RegionData {
            // Leave out the demand forecast (DF) type.
            facets.insert(
                "type",
                [
                    MeasurementType::Demand,
                    MeasurementType::NetGeneration,
                    MeasurementType::TotalInterchange,
                ]
                .iter()
                .map(|m| m.code().to_string())
                .collect(),
            );
        }
        // Hourly "local-hourly" requests reject a timezone facet.
        if request.frequency == Frequency::Daily {
            if let Some(tz) = &self.cfg.default_timezone_facet {
                facets.entry("timezone").or_insert_with(|| vec![tz.clone()]);
            }
        }
        facets
    }

    fn params_for(&self, request: &FetchRequest, offset: usize) -> Value {
        json!({
            "frequency": request.frequency.to_string(),
            "data": ["value"],
            "facets": self.facets_for(request),
            "start": request.start.format("%Y-%m-%d").to_string(),
            "end": request.end.format("%Y-%m-%d").to_string(),
            "sort": [{"column": "period", "direction": "desc"}],
            "offset": offset,
            "length": self.cfg.page_size,
        })
    }

    async fn fetch_page(&self, request: &FetchRequest, offset: usize) -> Result<Page, GridMixError> {
        let params = self.params_for(request, offset);
        let resp = self
            .client
            .get(self.url_for(request))
            .query(&[("api_key", self.cfg.api_key.as_str())])
            .header("X-Params", params.to_string())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(GridMixError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        decode_page(&body)
    }
}

#[async_trait]
impl TimeseriesSource for EiaClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<SourceRow>, GridMixError> {
        let mut rows = Vec::new();
        let mut fetched = 0usize;

        loop {
            let page = match self.fetch_page(request, fetched).await {
                Ok(page) => page,
                Err(e) if fetched > 0 => {
                    debug!(error = %e, fetched, "page fetch failed mid-pagination");
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

            if page.rows.is_empty() {
                if fetched == 0 {
                    return Err(request.no_data());
                }
                return Err(GridMixError::Pagination {
                    fetched,
                    total: page.total,
                });
            }

            fetched += page.rows.len();
            debug!(
                dataset = %request.dataset,
                fetched,
                total = page.total,
                "fetched page"
            );
            for raw in &page.rows {
                if let Some(row) = decode_row(request.dataset, raw)? {
                    rows.push(row);
                }
            }

            if fetched >= page.total {
                break;
            }
        }

        info!(
            dataset = %request.dataset.url_segment(request.frequency),
            regions = %request.regions_label(),
            rows = rows.len(),
            "fetched timeseries"
        );
        Ok(rows)
    }
}

/// Payloads are sometimes nested under `response`, sometimes not.
fn decode_page(body: &str) -> Result<Page, GridMixError> {
    let mut content: Value = serde_json::from_str(body)?;
    if let Some(inner) = content.get_mut("response") {
        content = inner.take();
    }

    let total = match content.get("total") {
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| GridMixError::MalformedRow("response without a row total".to_string()))?;

    let rows = match content.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(GridMixError::MalformedRow(format!("data row is not an object: {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(GridMixError::MalformedRow("response without data".to_string())),
    };

    Ok(Page { total, rows })
}

/// Key casing differs between variants (`fromba` / `fromBA`, `type-name` / `typeName`).
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn field<'a>(row: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let wanted = normalize_key(name);
    row.iter()
        .find(|(k, _)| normalize_key(k) == wanted)
        .map(|(_, v)| v)
}

fn text_field(row: &Map<String, Value>, name: &str) -> Option<String> {
    match field(row, name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `None` when upstream has no value for this row.
fn number_field(row: &Map<String, Value>, name: &str) -> Result<Option<f64>, GridMixError> {
    match field(row, name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GridMixError::MalformedRow(format!("non-numeric {name} {s:?}"))),
        Some(other) => Err(GridMixError::MalformedRow(format!("non-numeric {name} {other}"))),
    }
}

fn decode_row(dataset: Dataset, raw: &Map<String, Value>) -> Result<Option<SourceRow>, GridMixError> {
    let Some(value) = number_field(raw, "value")? else {
        return Ok(None);
    };
    let period = text_field(raw, "period")
        .ok_or_else(|| GridMixError::MalformedRow("row without a period".to_string()))?;
    let (timestamp, utc_offset_seconds) = parse_period(&period)?;

    let (region_key, counterpart_key) = match dataset {
        Dataset::InterchangeData => ("toba", Some("fromba")),
        Dataset::RegionData | Dataset::FuelTypeData => ("respondent", None),
    };
    let region = text_field(raw, region_key)
        .map(Region::new)
        .ok_or_else(|| GridMixError::MalformedRow(format!("row without {region_key}")))?;
    let counterpart = counterpart_key.and_then(|k| text_field(raw, k)).map(Region::new);

    let label = match dataset {
        Dataset::RegionData => text_field(raw, "type-name").or_else(|| text_field(raw, "type")),
        // The code is stable; `type-name` spelling varies between variants.
        Dataset::FuelTypeData => text_field(raw, "fueltype").or_else(|| text_field(raw, "type-name")),
        Dataset::InterchangeData => None,
    };

    Ok(Some(SourceRow {
        region,
        counterpart,
        timestamp,
        utc_offset_seconds,
        label,
        value,
    }))
}
