//! Statistical roll-up passes over resolved review-unit records
//!
//! All three passes are pure functions over immutable record slices. Every
//! average is null-safe: empty contributing sets yield the 0 sentinel with a
//! count of 0, never a division error.

use crate::analytics::metrics::{
    ContributorMetrics, DurationStat, OverallMetrics, TimingMetrics, WindowMetrics,
};
use crate::analytics::windows::WindowSet;
use crate::models::ReviewUnitRecord;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Reduction passes over review-unit records
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Bucketed pass: one `WindowMetrics` per window, in window order
    ///
    /// Records are partitioned by the window containing their creation
    /// timestamp. Merge counts are attributed to the window containing the
    /// actual merge timestamp; the source system attributed them to the
    /// creation week, which undercounts late merges.
    pub fn aggregate_windows(
        records: &[ReviewUnitRecord],
        windows: &WindowSet,
    ) -> Vec<WindowMetrics> {
        // Single partition pass, then a per-window reduce
        let mut opened_by_label: HashMap<&str, Vec<&ReviewUnitRecord>> = HashMap::new();
        let mut merged_by_label: HashMap<&str, u64> = HashMap::new();

        for record in records {
            if let Some(label) = windows.bucket_for(record.created_at) {
                opened_by_label.entry(label).or_default().push(record);
            }
            if let Some(merged_at) = record.merged_at {
                if let Some(label) = windows.bucket_for(merged_at) {
                    *merged_by_label.entry(label).or_insert(0) += 1;
                }
            }
        }

        windows
            .buckets()
            .iter()
            .map(|window| {
                let opened = opened_by_label
                    .get(window.label.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                let mut reviewer_counts: HashMap<&str, u64> = HashMap::new();
                let mut comments = 0u64;
                let mut approvals = 0u64;
                let mut carry_over = 0u64;
                for record in opened {
                    comments += record.comment_count;
                    approvals += record.approval_count;
                    if record.is_carry_over() {
                        carry_over += 1;
                    }
                    for reviewer in &record.reviewers {
                        *reviewer_counts.entry(reviewer.as_str()).or_insert(0) += 1;
                    }
                }
                let review_instances = reviewer_counts.values().sum();

                WindowMetrics {
                    label: window.label.clone(),
                    opened: opened.len() as u64,
                    merged: merged_by_label
                        .get(window.label.as_str())
                        .copied()
                        .unwrap_or(0),
                    carry_over,
                    comments,
                    approvals,
                    reviewer_distribution: ranked(reviewer_counts),
                    review_instances,
                    timings: timings(opened.iter().copied()),
                }
            })
            .collect()
    }

    /// Overall pass over the full record set
    pub fn aggregate_overall(records: &[ReviewUnitRecord]) -> OverallMetrics {
        let merged: Vec<&ReviewUnitRecord> =
            records.iter().filter(|r| r.merged_at.is_some()).collect();

        let mut reviewer_counts: HashMap<&str, u64> = HashMap::new();
        let mut total_review_instances = 0u64;
        let mut unique_reviewed = 0u64;
        for record in records {
            if !record.reviewers.is_empty() {
                unique_reviewed += 1;
            }
            for reviewer in &record.reviewers {
                *reviewer_counts.entry(reviewer.as_str()).or_insert(0) += 1;
                total_review_instances += 1;
            }
        }

        // Approval-quality histogram over merged records, zero included
        let mut histogram: BTreeMap<u64, u64> = BTreeMap::new();
        for record in &merged {
            *histogram.entry(record.approvers.len() as u64).or_insert(0) += 1;
        }

        let sizes: Vec<f64> = records
            .iter()
            .filter(|r| r.size > 0)
            .map(|r| r.size as f64)
            .collect();

        OverallMetrics {
            total_records: records.len() as u64,
            merged_records: merged.len() as u64,
            carry_over: records.len() as u64 - merged.len() as u64,
            avg_size: mean_or_zero(&sizes),
            sized_records: sizes.len() as u64,
            timings: timings(records.iter()),
            unique_reviewers: reviewer_counts.len() as u64,
            reviewer_distribution: ranked(reviewer_counts),
            total_review_instances,
            unique_reviewed,
            approval_histogram: histogram.into_iter().collect(),
        }
    }

    /// Per-contributor pass, keyed by author handle
    ///
    /// Reviews given are accumulated across the entire input set regardless
    /// of authorship, so a contributor who authored nothing still appears in
    /// no map entry but their review load is counted under authors they
    /// reviewed. Only authors get an entry; review-only handles surface in
    /// the overall reviewer distribution.
    pub fn aggregate_contributors(
        records: &[ReviewUnitRecord],
    ) -> BTreeMap<String, ContributorMetrics> {
        let mut by_author: BTreeMap<&str, Vec<&ReviewUnitRecord>> = BTreeMap::new();
        let mut reviews_given: HashMap<&str, (HashSet<u64>, u64)> = HashMap::new();

        for record in records {
            by_author.entry(record.author.as_str()).or_default().push(record);
            for reviewer in &record.reviewers {
                let entry = reviews_given.entry(reviewer.as_str()).or_default();
                entry.0.insert(record.number);
                entry.1 += 1;
            }
        }

        by_author
            .into_iter()
            .map(|(author, authored)| {
                let merged_count = authored.iter().filter(|r| r.merged_at.is_some()).count();

                let sizes: Vec<f64> = authored
                    .iter()
                    .filter(|r| r.size > 0)
                    .map(|r| r.size as f64)
                    .collect();
                let comments: Vec<f64> =
                    authored.iter().map(|r| r.comment_count as f64).collect();
                let approvals_received =
                    authored.iter().map(|r| r.approval_count).sum();

                let (given_records, given_instances) = reviews_given
                    .get(author)
                    .map(|(prs, instances)| (prs.len() as u64, *instances))
                    .unwrap_or((0, 0));

                let metrics = ContributorMetrics {
                    handle: author.to_string(),
                    total_records: authored.len() as u64,
                    merged_records: merged_count as u64,
                    carry_over: (authored.len() - merged_count) as u64,
                    avg_size: mean_or_zero(&sizes),
                    avg_comments: mean_or_zero(&comments),
                    approvals_received,
                    timings: timings(authored.iter().copied()),
                    reviews_given_records: given_records,
                    reviews_given_instances: given_instances,
                };
                (author.to_string(), metrics)
            })
            .collect()
    }
}

/// The six averaged durations for one scope of records
fn timings<'a, I>(records: I) -> TimingMetrics
where
    I: IntoIterator<Item = &'a ReviewUnitRecord> + Clone,
{
    TimingMetrics {
        time_to_merge: DurationStat::collect(
            records.clone().into_iter().map(|r| r.time_to_merge()),
        ),
        time_to_first_review: DurationStat::collect(
            records.clone().into_iter().map(|r| r.time_to_first_review()),
        ),
        time_first_review_to_merge: DurationStat::collect(
            records
                .clone()
                .into_iter()
                .map(|r| r.time_first_review_to_merge()),
        ),
        time_in_progress_to_created: DurationStat::collect(
            records
                .clone()
                .into_iter()
                .map(|r| r.time_in_progress_to_created()),
        ),
        time_in_progress_to_merged: DurationStat::collect(
            records
                .clone()
                .into_iter()
                .map(|r| r.time_in_progress_to_merged()),
        ),
        time_merged_to_resolved: DurationStat::collect(
            records.into_iter().map(|r| r.time_merged_to_resolved()),
        ),
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Frequency table ordered by descending count, then handle
fn ranked(counts: HashMap<&str, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(handle, count)| (handle.to_string(), count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::windows::WindowPolicy;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn record(number: u64, author: &str) -> ReviewUnitRecord {
        ReviewUnitRecord {
            number,
            title: format!("change {}", number),
            author: author.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
            merged_at: None,
            first_review_at: None,
            size: 0,
            comment_count: 0,
            reviewers: BTreeSet::new(),
            approval_count: 0,
            approvers: BTreeSet::new(),
            window_index: -1,
            issue_key: format!("PROJ-{}", number),
            in_progress_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn test_overall_empty_set_is_null_safe() {
        let overall = MetricsAggregator::aggregate_overall(&[]);
        assert_eq!(overall.total_records, 0);
        assert_eq!(overall.avg_size, 0.0);
        assert_eq!(overall.timings.time_to_merge.avg_hours, 0.0);
        assert_eq!(overall.timings.time_to_merge.count, 0);
        assert!(!overall.avg_size.is_nan());
    }

    #[test]
    fn test_merge_attributed_to_merge_window() {
        // Created in the first week, merged in the second
        let mut r = record(1, "alice");
        r.merged_at = Some(r.created_at + Duration::days(8));
        let records = vec![r];

        let windows = WindowSet::build(&records, WindowPolicy::Weekly, 0).unwrap();
        let per_window = MetricsAggregator::aggregate_windows(&records, &windows);

        assert_eq!(per_window.len(), 2);
        assert_eq!(per_window[0].opened, 1);
        assert_eq!(per_window[0].merged, 0);
        assert_eq!(per_window[1].merged, 1);
        // Carry-over counts records with no merge timestamp at all
        assert_eq!(per_window[0].carry_over, 0);
    }

    #[test]
    fn test_reviews_given_double_counts_instances() {
        let mut a = record(1, "alice");
        a.reviewers = BTreeSet::from(["carol".to_string()]);
        let mut b = record(2, "bob");
        b.reviewers = BTreeSet::from(["carol".to_string()]);
        let records = vec![a, b];

        let contributors = MetricsAggregator::aggregate_contributors(&records);
        // carol authored nothing, so she has no entry of her own
        assert!(!contributors.contains_key("carol"));

        let overall = MetricsAggregator::aggregate_overall(&records);
        assert_eq!(overall.total_review_instances, 2);
        assert_eq!(overall.unique_reviewers, 1);
        assert_eq!(overall.reviewer_distribution, vec![("carol".to_string(), 2)]);
    }

    #[test]
    fn test_contributor_reviews_given() {
        let mut a = record(1, "alice");
        a.reviewers = BTreeSet::from(["bob".to_string()]);
        let mut b = record(2, "bob");
        b.reviewers = BTreeSet::from(["alice".to_string()]);
        let records = vec![a, b];

        let contributors = MetricsAggregator::aggregate_contributors(&records);
        let bob = &contributors["bob"];
        assert_eq!(bob.reviews_given_records, 1);
        assert_eq!(bob.reviews_given_instances, 1);
        assert_eq!(bob.total_records, 1);
    }

    #[test]
    fn test_approval_histogram_includes_zero() {
        let mut a = record(1, "alice");
        a.merged_at = Some(a.created_at + Duration::hours(1));
        let mut b = record(2, "bob");
        b.merged_at = Some(b.created_at + Duration::hours(2));
        b.approvers = BTreeSet::from(["carol".to_string(), "dave".to_string()]);
        b.approval_count = 2;
        // Unmerged records stay out of the histogram
        let c = record(3, "erin");
        let records = vec![a, b, c];

        let overall = MetricsAggregator::aggregate_overall(&records);
        assert_eq!(overall.approval_histogram, vec![(0, 1), (2, 1)]);
    }

    #[test]
    fn test_ranked_orders_by_descending_count() {
        let counts = HashMap::from([("bob", 1u64), ("alice", 3u64), ("carol", 1u64)]);
        let ordered = ranked(counts);
        assert_eq!(ordered[0], ("alice".to_string(), 3));
        assert_eq!(ordered[1], ("bob".to_string(), 1));
        assert_eq!(ordered[2], ("carol".to_string(), 1));
    }
}
