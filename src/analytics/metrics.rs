//! Aggregate metric structures
//!
//! Averages are arithmetic means over strictly non-null contributing values.
//! An empty contributing set yields 0.0 with a count of 0; the count field is
//! what distinguishes "no data" from a genuine zero-hour duration.

use serde::{Deserialize, Serialize};

/// A null-safe averaged duration in hours, with its contributing count
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationStat {
    pub avg_hours: f64,
    pub count: u64,
}

impl DurationStat {
    /// Average the non-null values of an iterator of optional hours
    pub fn collect<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut sum = 0.0;
        let mut count = 0u64;
        for value in values.into_iter().flatten() {
            sum += value;
            count += 1;
        }
        Self {
            avg_hours: if count > 0 { sum / count as f64 } else { 0.0 },
            count,
        }
    }

    /// Whether any value contributed
    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// The six averaged timing metrics computed for every aggregation scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingMetrics {
    pub time_to_merge: DurationStat,
    pub time_to_first_review: DurationStat,
    pub time_first_review_to_merge: DurationStat,
    pub time_in_progress_to_created: DurationStat,
    pub time_in_progress_to_merged: DurationStat,
    pub time_merged_to_resolved: DurationStat,
}

/// Metrics for one time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Window label
    pub label: String,

    /// Records created in this window
    pub opened: u64,

    /// Records merged in this window, attributed by merge timestamp
    pub merged: u64,

    /// Records created in this window with no merge timestamp
    pub carry_over: u64,

    /// Comment total over records created in this window
    pub comments: u64,

    /// Approval-signal total over records created in this window
    pub approvals: u64,

    /// Reviewer frequency, descending by count
    pub reviewer_distribution: Vec<(String, u64)>,

    /// Sum of per-record reviewer counts
    pub review_instances: u64,

    /// Averaged durations over records created in this window
    pub timings: TimingMetrics,
}

/// Metrics over the full record set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub total_records: u64,
    pub merged_records: u64,
    pub carry_over: u64,

    /// Average size over records with size > 0
    pub avg_size: f64,
    pub sized_records: u64,

    pub timings: TimingMetrics,

    /// Reviewer frequency, descending by count
    pub reviewer_distribution: Vec<(String, u64)>,

    /// Sum of reviewer-set sizes; double-counts a reviewer across records
    /// because it measures load, not reach
    pub total_review_instances: u64,

    /// Records reviewed by at least one human
    pub unique_reviewed: u64,

    /// Distinct human reviewer handles
    pub unique_reviewers: u64,

    /// Distinct-approver count -> merged-record count, including zero,
    /// ascending by approver count
    pub approval_histogram: Vec<(u64, u64)>,
}

/// Metrics for a single contributor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorMetrics {
    pub handle: String,

    /// Authored records
    pub total_records: u64,
    pub merged_records: u64,
    pub carry_over: u64,

    /// Average size over authored records with size > 0
    pub avg_size: f64,

    /// Average comments received per authored record
    pub avg_comments: f64,

    /// Approval signals received across authored records
    pub approvals_received: u64,

    /// Averaged durations over authored records
    pub timings: TimingMetrics,

    /// Distinct records this handle reviewed, across the whole input
    pub reviews_given_records: u64,

    /// Total review instances this handle contributed, across the whole input
    pub reviews_given_instances: u64,
}
