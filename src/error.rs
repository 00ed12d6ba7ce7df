use thiserror::Error;

/// Failures of the grid-mix pipeline and its collaborators.
///
/// Every variant prevents an intensity result from being produced for the
/// affected BA/window; nothing here is ever turned into a zero.
#[derive(Debug, Error)]
pub enum GridMixError {
    #[error("no data rows for {dataset} (regions: {regions})")]
    NoData { dataset: String, regions: String },

    #[error("unknown fuel type label {0:?}")]
    UnknownFuelType(String),

    #[error("pagination aborted after {fetched} of {total} rows")]
    Pagination { fetched: usize, total: usize },

    #[error("upstream API error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(String),
}

impl GridMixError {
    /// True when upstream simply has nothing for the requested region/window.
    pub fn is_no_data(&self) -> bool {
        matches!(self, GridMixError::NoData { .. })
    }
}

impl From<serde_json::Error> for GridMixError {
    fn from(error: serde_json::Error) -> Self {
        GridMixError::MalformedRow(error.to_string())
    }
}
