//! Time-window generation and bucketing

use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::models::ReviewUnitRecord;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Bucketing policy for window generation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WindowPolicy {
    Daily,
    Weekly,
    Monthly,
    FixedDays,
}

/// A single half-open window `[start, end)` with its stable label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl Window {
    /// Whether the window contains the timestamp
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// The aligned, contiguous window layout covering a dataset's date span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSet {
    pub policy: WindowPolicy,
    pub n_days: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    windows: Vec<Window>,
}

impl WindowSet {
    /// Build the window layout from the timestamps observed in `records`
    ///
    /// An empty record set defaults to the trailing 30 days ending now.
    pub fn build(
        records: &[ReviewUnitRecord],
        policy: WindowPolicy,
        n_days: u32,
    ) -> AnalyticsResult<Self> {
        match observed_span(records) {
            Some((min, max)) => Self::from_span(min, max, policy, n_days),
            None => {
                let now = Utc::now();
                Self::from_span(now - Duration::days(30), now, policy, n_days)
            }
        }
    }

    /// Build the window layout over an explicit span
    pub fn from_span(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: WindowPolicy,
        n_days: u32,
    ) -> AnalyticsResult<Self> {
        if policy == WindowPolicy::FixedDays && n_days == 0 {
            return Err(AnalyticsError::InvalidConfiguration(
                "fixed-days bucketing requires a window length of at least 1 day".to_string(),
            ));
        }
        if end < start {
            return Err(AnalyticsError::InvalidDateRange(format!(
                "window span ends ({}) before it starts ({})",
                end, start
            )));
        }

        let (start, mut end) = align_span(start, end, policy);

        // A single-instant span still gets one full window so the instant
        // itself is bucketed.
        if end <= start {
            end = advance(start, policy, n_days);
        }

        let mut windows = Vec::new();
        let mut cur = start;
        while cur < end {
            let next = advance(cur, policy, n_days);
            if next <= cur {
                break;
            }
            let window_end = next.min(end);
            windows.push(Window {
                start: cur,
                end: window_end,
                label: label_for(cur, window_end, policy),
            });
            cur = next;
        }

        Ok(Self {
            policy,
            n_days,
            start,
            end,
            windows,
        })
    }

    /// The ordered, contiguous, non-overlapping windows
    pub fn buckets(&self) -> &[Window] {
        &self.windows
    }

    /// Label of the window containing `ts`, or None outside `[start, end)`
    pub fn bucket_for(&self, ts: DateTime<Utc>) -> Option<&str> {
        self.windows
            .iter()
            .find(|w| w.contains(ts))
            .map(|w| w.label.as_str())
    }

    /// Position of the window containing `ts`, or -1 outside the span
    pub fn index_for(&self, ts: DateTime<Utc>) -> i64 {
        self.windows
            .iter()
            .position(|w| w.contains(ts))
            .map(|i| i as i64)
            .unwrap_or(-1)
    }
}

/// Min/max over every relevant timestamp carried by the records
fn observed_span(records: &[ReviewUnitRecord]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    let mut observe = |ts: DateTime<Utc>| {
        span = Some(match span {
            Some((min, max)) => (min.min(ts), max.max(ts)),
            None => (ts, ts),
        });
    };

    for record in records {
        observe(record.created_at);
        for ts in [
            record.merged_at,
            record.first_review_at,
            record.in_progress_at,
            record.resolved_at,
        ]
        .into_iter()
        .flatten()
        {
            observe(ts);
        }
    }
    span
}

fn align_span(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: WindowPolicy,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match policy {
        // Raw min/max, no alignment
        WindowPolicy::Daily | WindowPolicy::FixedDays => (start, end),
        WindowPolicy::Weekly => (
            monday_of(start),
            monday_of(end) + Duration::weeks(1),
        ),
        WindowPolicy::Monthly => {
            let aligned_end = first_of_month(end)
                .checked_add_months(Months::new(1))
                .unwrap_or(end);
            (first_of_month(start), aligned_end)
        }
    }
}

fn advance(cur: DateTime<Utc>, policy: WindowPolicy, n_days: u32) -> DateTime<Utc> {
    match policy {
        WindowPolicy::Daily => cur + Duration::days(1),
        WindowPolicy::Weekly => cur + Duration::weeks(1),
        WindowPolicy::Monthly => cur
            .checked_add_months(Months::new(1))
            .unwrap_or(cur + Duration::days(31)),
        WindowPolicy::FixedDays => cur + Duration::days(n_days as i64),
    }
}

fn label_for(start: DateTime<Utc>, end: DateTime<Utc>, policy: WindowPolicy) -> String {
    match policy {
        WindowPolicy::Daily => start.format("%Y-%m-%d").to_string(),
        WindowPolicy::Weekly => format!(
            "{}-W{:02}",
            start.format("%Y-%m-%d"),
            start.iso_week().week()
        ),
        WindowPolicy::Monthly => start.format("%Y-%m").to_string(),
        WindowPolicy::FixedDays => {
            // Inclusive start/end dates of the window
            let last = end - Duration::seconds(1);
            format!("{}..{}", start.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
        }
    }
}

/// Midnight of the Monday on or before the date
fn monday_of(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    let back = date.weekday().num_days_from_monday() as i64;
    midnight(date - Duration::days(back))
}

/// Midnight of the first day of the timestamp's month
fn first_of_month(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1).unwrap_or(ts.date_naive());
    midnight(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_days_requires_nonzero_length() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(10);
        let result = WindowSet::from_span(start, end, WindowPolicy::FixedDays, 0);
        assert!(matches!(
            result,
            Err(AnalyticsError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_weekly_alignment_to_monday() {
        // 2025-03-19 is a Wednesday
        let start = Utc.with_ymd_and_hms(2025, 3, 19, 15, 30, 0).unwrap();
        let end = start + Duration::days(3);
        let windows = WindowSet::from_span(start, end, WindowPolicy::Weekly, 0).unwrap();

        assert_eq!(
            windows.start,
            Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap()
        );
        assert_eq!(windows.buckets().len(), 1);
        assert_eq!(windows.buckets()[0].label, "2025-03-17-W12");
    }

    #[test]
    fn test_monthly_december_rollover() {
        let start = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let windows = WindowSet::from_span(start, end, WindowPolicy::Monthly, 0).unwrap();

        let labels: Vec<_> = windows.buckets().iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-11", "2024-12", "2025-01"]);
    }

    #[test]
    fn test_daily_labels_sort_chronologically() {
        let start = Utc.with_ymd_and_hms(2025, 2, 27, 6, 0, 0).unwrap();
        let end = start + Duration::days(4);
        let windows = WindowSet::from_span(start, end, WindowPolicy::Daily, 0).unwrap();

        let labels: Vec<_> = windows.buckets().iter().map(|w| w.label.clone()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_windows_contiguous_and_clamped() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(10);
        let windows = WindowSet::from_span(start, end, WindowPolicy::FixedDays, 4).unwrap();

        let buckets = windows.buckets();
        assert_eq!(buckets.len(), 3);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        // Final window truncated to the overall end, never overshooting
        assert_eq!(buckets.last().unwrap().end, end);
        assert_eq!(buckets[0].start, windows.start);
    }

    #[test]
    fn test_bucket_for_is_deterministic_and_exclusive() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(14);
        let windows = WindowSet::from_span(start, end, WindowPolicy::Weekly, 0).unwrap();

        let ts = start + Duration::days(3);
        let first = windows.bucket_for(ts).unwrap().to_string();
        assert_eq!(windows.bucket_for(ts), Some(first.as_str()));

        let containing = windows.buckets().iter().filter(|w| w.contains(ts)).count();
        assert_eq!(containing, 1);

        // Outside [start, end) is unbucketed
        assert_eq!(windows.bucket_for(windows.end), None);
        assert_eq!(windows.bucket_for(windows.start - Duration::seconds(1)), None);
        assert_eq!(windows.index_for(windows.end), -1);
    }

    #[test]
    fn test_empty_records_default_to_trailing_month() {
        let windows = WindowSet::build(&[], WindowPolicy::Daily, 0).unwrap();
        let span = windows.end - windows.start;
        assert_eq!(span.num_days(), 30);
        assert_eq!(windows.buckets().len(), 30);
    }

    #[test]
    fn test_single_instant_span_gets_one_window() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let windows = WindowSet::from_span(start, start, WindowPolicy::Daily, 0).unwrap();
        assert_eq!(windows.buckets().len(), 1);
        assert!(windows.bucket_for(start).is_some());
    }

    #[test]
    fn test_fixed_days_label_encodes_inclusive_dates() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(14);
        let windows = WindowSet::from_span(start, end, WindowPolicy::FixedDays, 7).unwrap();
        assert_eq!(windows.buckets()[0].label, "2025-05-01..2025-05-07");
        assert_eq!(windows.buckets()[1].label, "2025-05-08..2025-05-14");
    }
}
