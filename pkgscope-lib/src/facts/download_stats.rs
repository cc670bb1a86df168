//! Download statistics service.

use super::resilient_http::{RequestSpec, ResilientClient};
use super::{UpstreamFailure, UpstreamResult, encode_package_path, trim_base};
use crate::downloads::DailyDownloadPoint;
use chrono::{Days, NaiveDate};
use futures_util::future::join_all;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = " downloads";

pub const DOWNLOADS_NOT_FOUND: &str = "Download data not found!";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RangeResponse {
    downloads: Vec<DailyDownloadPoint>,
}

/// Inclusive date span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Split into consecutive, non-overlapping spans of at most `max_days` days each.
    #[must_use]
    pub fn chunks(self, max_days: u32) -> Vec<Self> {
        let step = u64::from(max_days.max(1));
        let mut chunks = Vec::new();
        let mut start = self.start;

        while start <= self.end {
            let end = start
                .checked_add_days(Days::new(step - 1))
                .map_or(self.end, |end| end.min(self.end));
            chunks.push(Self { start, end });

            match end.succ_opt() {
                Some(next) => start = next,
                None => break,
            }
        }

        chunks
    }
}

#[derive(Debug, Clone)]
pub struct DownloadStatsGateway {
    client: ResilientClient,
    base_url: String,
    max_days_per_request: u32,
}

impl DownloadStatsGateway {
    #[must_use]
    pub fn new(client: ResilientClient, base_url: &Url, max_days_per_request: u32) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            max_days_per_request,
        }
    }

    /// Fetch the raw daily series for `range`, issuing one call per sub-range.
    ///
    /// Sub-ranges are requested concurrently and concatenated in chronological order.
    pub async fn daily_downloads(&self, package: &str, range: DateRange) -> UpstreamResult<Vec<DailyDownloadPoint>> {
        if range.start > range.end {
            return UpstreamFailure::rejected(format!("start date {} is after end date {}", range.start, range.end)).into();
        }

        let chunks = range.chunks(self.max_days_per_request);
        log::debug!(target: LOG_TARGET, "Fetching downloads for '{package}' in {} sub-range(s)", chunks.len());

        let results = join_all(chunks.into_iter().map(|chunk| self.fetch_chunk(package, chunk))).await;

        let mut series = Vec::new();
        for result in results {
            match result {
                UpstreamResult::Ok(mut points) => series.append(&mut points),
                UpstreamResult::Failed(failure) => {
                    log::debug!(target: LOG_TARGET, "Could not fetch downloads for '{package}': {failure}");
                    return UpstreamResult::Failed(failure);
                }
            }
        }

        UpstreamResult::Ok(series)
    }

    async fn fetch_chunk(&self, package: &str, chunk: DateRange) -> UpstreamResult<Vec<DailyDownloadPoint>> {
        let url = format!(
            "{}/downloads/range/{}:{}/{}",
            self.base_url,
            chunk.start.format("%Y-%m-%d"),
            chunk.end.format("%Y-%m-%d"),
            encode_package_path(package)
        );
        let spec = RequestSpec::get("downloads", url);

        UpstreamResult::from_http(self.client.request_json::<RangeResponse>(&spec).await, DOWNLOADS_NOT_FOUND).map(|r| r.downloads)
    }
}
