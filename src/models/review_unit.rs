use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single reviewed code change and its timing facts
///
/// Never mutated after construction; aggregation is read-only over
/// collections of these records. Reviewer and approver sets are already
/// deduplicated and automation-filtered when the record is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewUnitRecord {
    /// Number, unique within the source repository
    pub number: u64,

    /// Title of the change
    pub title: String,

    /// Author handle
    pub author: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Merge timestamp, if merged
    pub merged_at: Option<DateTime<Utc>>,

    /// First qualifying review submission, if any
    pub first_review_at: Option<DateTime<Utc>>,

    /// Added plus removed content units
    pub size: u64,

    /// Comment count
    pub comment_count: u64,

    /// Distinct human reviewer handles
    pub reviewers: BTreeSet<String>,

    /// Count of distinct approving handles
    pub approval_count: u64,

    /// Distinct human approving handles
    pub approvers: BTreeSet<String>,

    /// Bucket position assigned at construction against a precomputed
    /// window layout; -1 when no layout applied
    pub window_index: i64,

    /// Key of the originating tracker item
    pub issue_key: String,

    /// When the tracker item first entered an in-progress status
    pub in_progress_at: Option<DateTime<Utc>>,

    /// When the tracker item last entered a resolved status
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReviewUnitRecord {
    /// Hours from creation to merge
    pub fn time_to_merge(&self) -> Option<f64> {
        self.merged_at.map(|m| hours_between(self.created_at, m))
    }

    /// Hours from creation to first review
    pub fn time_to_first_review(&self) -> Option<f64> {
        self.first_review_at
            .map(|r| hours_between(self.created_at, r))
    }

    /// Hours from first review to merge
    pub fn time_first_review_to_merge(&self) -> Option<f64> {
        match (self.first_review_at, self.merged_at) {
            (Some(r), Some(m)) => Some(hours_between(r, m)),
            _ => None,
        }
    }

    /// Hours from workflow in-progress entry to creation
    pub fn time_in_progress_to_created(&self) -> Option<f64> {
        self.in_progress_at
            .map(|p| hours_between(p, self.created_at))
    }

    /// Hours from workflow in-progress entry to merge
    pub fn time_in_progress_to_merged(&self) -> Option<f64> {
        match (self.in_progress_at, self.merged_at) {
            (Some(p), Some(m)) => Some(hours_between(p, m)),
            _ => None,
        }
    }

    /// Hours from merge to workflow resolution
    pub fn time_merged_to_resolved(&self) -> Option<f64> {
        match (self.merged_at, self.resolved_at) {
            (Some(m), Some(r)) => Some(hours_between(m, r)),
            _ => None,
        }
    }

    /// Whether the record is still open at analysis time
    pub fn is_carry_over(&self) -> bool {
        self.merged_at.is_none()
    }
}

/// Signed hours from `a` to `b`; negative when `b` precedes `a`
///
/// Negative values signal out-of-order workflow events and are surfaced,
/// never clamped or discarded.
fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_record() -> ReviewUnitRecord {
        ReviewUnitRecord {
            number: 1,
            title: "test".to_string(),
            author: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap(),
            merged_at: None,
            first_review_at: None,
            size: 0,
            comment_count: 0,
            reviewers: BTreeSet::new(),
            approval_count: 0,
            approvers: BTreeSet::new(),
            window_index: -1,
            issue_key: "PROJ-1".to_string(),
            in_progress_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn test_time_to_merge_exact_hours() {
        let mut record = base_record();
        record.merged_at = Some(record.created_at + Duration::hours(5));
        assert_eq!(record.time_to_merge(), Some(5.0));
    }

    #[test]
    fn test_missing_endpoint_yields_none() {
        let record = base_record();
        assert_eq!(record.time_to_merge(), None);
        assert_eq!(record.time_to_first_review(), None);
        assert_eq!(record.time_first_review_to_merge(), None);
        assert_eq!(record.time_in_progress_to_merged(), None);
    }

    #[test]
    fn test_negative_duration_preserved() {
        // Merge before creation: malformed input whose sign must survive
        let mut record = base_record();
        record.merged_at = Some(record.created_at - Duration::hours(3));
        assert_eq!(record.time_to_merge(), Some(-3.0));
    }

    #[test]
    fn test_workflow_durations() {
        let mut record = base_record();
        record.in_progress_at = Some(record.created_at - Duration::hours(12));
        record.merged_at = Some(record.created_at + Duration::hours(6));
        record.resolved_at = Some(record.created_at + Duration::hours(8));

        assert_eq!(record.time_in_progress_to_created(), Some(12.0));
        assert_eq!(record.time_in_progress_to_merged(), Some(18.0));
        assert_eq!(record.time_merged_to_resolved(), Some(2.0));
    }

    #[test]
    fn test_carry_over() {
        let mut record = base_record();
        assert!(record.is_carry_over());
        record.merged_at = Some(record.created_at);
        assert!(!record.is_carry_over());
    }
}
