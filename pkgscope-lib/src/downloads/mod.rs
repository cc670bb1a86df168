//! Download time-bucketing.
//!
//! A raw daily series is trimmed of its leading and trailing zero runs, then
//! rolled up over fixed trailing windows and grouped into weekly, monthly, and
//! yearly buckets. All sums are exact integer sums.

mod buckets;
mod series;
mod summary;

pub use buckets::{DownloadBucket, monthly, weekly, yearly};
pub use series::{DailyDownloadPoint, trim};
pub use summary::{DownloadSummary, summarize};

use crate::facts::download_stats::{DOWNLOADS_NOT_FOUND, DateRange, DownloadStatsGateway};
use crate::facts::{UpstreamFailure, UpstreamResult};

/// Fetch a package's daily series and summarize it.
///
/// A series with no downloads at all is reported as not found.
pub async fn download_summary(
    gateway: &DownloadStatsGateway,
    package: &str,
    range: DateRange,
    include_daily: bool,
) -> UpstreamResult<DownloadSummary> {
    match gateway.daily_downloads(package, range).await {
        UpstreamResult::Ok(points) => summarize(&points, include_daily).map_or_else(
            || UpstreamFailure::not_found(DOWNLOADS_NOT_FOUND).into(),
            UpstreamResult::Ok,
        ),
        UpstreamResult::Failed(failure) => UpstreamResult::Failed(failure),
    }
}
