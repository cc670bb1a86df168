use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Downloads recorded on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDownloadPoint {
    pub day: NaiveDate,
    pub downloads: u64,
}

impl DailyDownloadPoint {
    #[must_use]
    pub const fn new(day: NaiveDate, downloads: u64) -> Self {
        Self { day, downloads }
    }
}

/// Drop trailing and leading zero days.
///
/// Trailing zeros are days the service has not reported yet; leading zeros
/// predate the package. Returns an empty slice when no day has downloads.
#[must_use]
pub fn trim(series: &[DailyDownloadPoint]) -> &[DailyDownloadPoint] {
    let Some(last) = series.iter().rposition(|p| p.downloads > 0) else {
        return &[];
    };

    let truncated = &series[..=last];
    let first = truncated.iter().position(|p| p.downloads > 0).unwrap_or(0);
    &truncated[first..]
}

/// Sum downloads exactly, without overflow.
#[must_use]
pub fn sum(points: &[DailyDownloadPoint]) -> u64 {
    points.iter().fold(0_u64, |acc, p| acc.saturating_add(p.downloads))
}

/// Sum over the window `[len - from_end, len - to_end)`, clamped at the start of the series.
///
/// `window(series, 7, 0)` is the last seven days, `window(series, 14, 7)` the seven before those.
#[must_use]
pub fn window(series: &[DailyDownloadPoint], from_end: usize, to_end: usize) -> u64 {
    let len = series.len();
    let start = len.saturating_sub(from_end);
    let end = len.saturating_sub(to_end);
    if start >= end {
        return 0;
    }
    sum(&series[start..end])
}
