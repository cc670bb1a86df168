use super::DailyDownloadPoint;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Downloads summed over one week, month, or year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBucket {
    pub period_start: NaiveDate,
    pub downloads: u64,
}

/// Group consecutive points that share a period key, in input order.
///
/// A new bucket starts whenever the key changes from the previous point.
fn group_by_period(points: &[DailyDownloadPoint], period_start: impl Fn(NaiveDate) -> NaiveDate) -> Vec<DownloadBucket> {
    let mut buckets: Vec<DownloadBucket> = Vec::new();

    for point in points {
        let start = period_start(point.day);
        match buckets.last_mut() {
            Some(bucket) if bucket.period_start == start => {
                bucket.downloads = bucket.downloads.saturating_add(point.downloads);
            }
            _ => buckets.push(DownloadBucket {
                period_start: start,
                downloads: point.downloads,
            }),
        }
    }

    buckets
}

fn monday_of(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_monday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn first_of_year(day: NaiveDate) -> NaiveDate {
    day.with_ordinal(1).unwrap_or(day)
}

/// Weekly buckets keyed by Monday.
///
/// Days before the first Monday in the series are skipped; a trailing partial week is kept.
#[must_use]
pub fn weekly(points: &[DailyDownloadPoint]) -> Vec<DownloadBucket> {
    let Some(first_monday) = points.iter().position(|p| p.day.weekday() == Weekday::Mon) else {
        return Vec::new();
    };

    group_by_period(&points[first_monday..], monday_of)
}

/// Monthly buckets keyed by the first day of the month.
#[must_use]
pub fn monthly(points: &[DailyDownloadPoint]) -> Vec<DownloadBucket> {
    group_by_period(points, first_of_month)
}

/// Yearly buckets keyed by January 1st.
#[must_use]
pub fn yearly(points: &[DailyDownloadPoint]) -> Vec<DownloadBucket> {
    group_by_period(points, first_of_year)
}
