use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Dataset, FetchRequest, Frequency, SourceRow, TimeseriesSource};
use crate::error::GridMixError;

/// Serves preloaded rows, filtered the way the upstream API filters them.
///
/// Used for offline analysis and in tests; `request_count` lets callers check
/// that cached results did not trigger a fetch.
#[derive(Default)]
pub struct InMemorySource {
    rows: RwLock<HashMap<(Dataset, Frequency), Vec<SourceRow>>>,
    requests: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hourly rows for a dataset.
    pub fn with_rows(self, dataset: Dataset, rows: impl IntoIterator<Item = SourceRow>) -> Self {
        self.insert(dataset, Frequency::LocalHourly, rows);
        self
    }

    pub fn insert(
        &self,
        dataset: Dataset,
        frequency: Frequency,
        rows: impl IntoIterator<Item = SourceRow>,
    ) {
        self.rows
            .write()
            .entry((dataset, frequency))
            .or_default()
            .extend(rows);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TimeseriesSource for InMemorySource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<SourceRow>, GridMixError> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let guard = self.rows.read();
        let matched: Vec<SourceRow> = guard
            .get(&(request.dataset, request.frequency))
            .map(|rows| {
                rows.iter()
                    .filter(|r| request.regions.contains(&r.region))
                    .filter(|r| {
                        let day = r.timestamp.date();
                        day >= request.start && day <= request.end
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if matched.is_empty() {
            return Err(request.no_data());
        }
        Ok(matched)
    }
}
