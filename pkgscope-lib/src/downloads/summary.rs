use super::buckets::{self, DownloadBucket};
use super::series::{self, DailyDownloadPoint};
use serde::{Deserialize, Serialize};

/// Rollups and buckets computed from a daily download series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSummary {
    pub total: u64,
    pub last_day: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_day_previous_week: Option<u64>,
    pub last_week: u64,
    pub previous_week: u64,
    pub last_month: u64,
    pub previous_month: u64,
    pub last_year: u64,
    pub previous_year: u64,
    pub weekly: Vec<DownloadBucket>,
    pub monthly: Vec<DownloadBucket>,
    pub yearly: Vec<DownloadBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_downloads: Option<Vec<DailyDownloadPoint>>,
}

/// Summarize a chronologically ordered series.
///
/// Returns `None` when no day has any downloads. The input is not sorted here.
#[must_use]
pub fn summarize(raw: &[DailyDownloadPoint], include_daily: bool) -> Option<DownloadSummary> {
    let trimmed = series::trim(raw);
    let last = trimmed.last()?;

    let total = series::sum(trimmed);
    let window = |from_end, to_end| {
        // a lone day stands in for every window
        if trimmed.len() == 1 {
            last.downloads
        } else {
            series::window(trimmed, from_end, to_end)
        }
    };

    Some(DownloadSummary {
        total,
        last_day: last.downloads,
        last_day_previous_week: trimmed.len().checked_sub(8).map(|i| trimmed[i].downloads),
        last_week: window(7, 0),
        previous_week: window(14, 7),
        last_month: window(30, 0),
        previous_month: window(60, 30),
        last_year: window(365, 0),
        previous_year: window(730, 365),
        weekly: buckets::weekly(trimmed),
        monthly: buckets::monthly(trimmed),
        yearly: buckets::yearly(trimmed),
        daily_downloads: include_daily.then(|| trimmed.to_vec()),
    })
}
