//! Report assembly and text rendering

use crate::analytics::metrics::{ContributorMetrics, DurationStat, OverallMetrics, WindowMetrics};
use crate::analytics::windows::WindowPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// The full analysis output handed to downstream consumers
///
/// Plain nested data only; no remote-handle objects leak outward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub policy: WindowPolicy,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,

    /// Per-window metrics, in window order
    pub windows: Vec<WindowMetrics>,

    /// Metrics over the full record set
    pub overall: OverallMetrics,

    /// Per-contributor metrics, keyed by author handle
    pub contributors: BTreeMap<String, ContributorMetrics>,

    /// Resolution accounting so silent data loss is observable
    pub targets_attempted: u64,
    pub targets_resolved: u64,
    pub targets_dropped: u64,
}

impl VelocityReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy: WindowPolicy,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        windows: Vec<WindowMetrics>,
        overall: OverallMetrics,
        contributors: BTreeMap<String, ContributorMetrics>,
        targets_attempted: u64,
        targets_resolved: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            policy,
            period_start,
            period_end,
            windows,
            overall,
            contributors,
            targets_attempted,
            targets_resolved,
            targets_dropped: targets_attempted.saturating_sub(targets_resolved),
        }
    }

    /// Render the full plain-text report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(78);
        let section = "=".repeat(50);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "REVIEW VELOCITY REPORT");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Analysis period: {} to {} ({} bucketing)",
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d"),
            self.policy
        );
        let _ = writeln!(
            out,
            "Targets: {} attempted, {} resolved, {} dropped",
            self.targets_attempted, self.targets_resolved, self.targets_dropped
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "{}", section);
        let _ = writeln!(out, "WINDOW METRICS");
        let _ = writeln!(out, "{}", section);
        let _ = writeln!(out);
        for window in &self.windows {
            self.render_window(&mut out, window);
        }

        let _ = writeln!(out, "{}", section);
        let _ = writeln!(out, "OVERALL METRICS");
        let _ = writeln!(out, "{}", section);
        self.render_overall(&mut out);

        let _ = writeln!(out, "{}", section);
        let _ = writeln!(out, "PER-CONTRIBUTOR METRICS");
        let _ = writeln!(out, "{}", section);
        let _ = writeln!(out);
        for contributor in self.contributors.values() {
            self.render_contributor(&mut out, contributor);
        }

        out
    }

    fn render_window(&self, out: &mut String, window: &WindowMetrics) {
        let _ = writeln!(out, "--- {} ---", window.label);
        let _ = writeln!(
            out,
            "Opened: {}, Merged: {}, Carry-over: {}",
            window.opened, window.merged, window.carry_over
        );
        let _ = writeln!(
            out,
            "Comments: {}, Approval signals: {}",
            window.comments, window.approvals
        );

        let _ = writeln!(out, "Review distribution ({} instances):", window.review_instances);
        for (reviewer, count) in &window.reviewer_distribution {
            let _ = writeln!(
                out,
                "  {}: {} ({})",
                reviewer,
                count,
                percent(*count, window.review_instances)
            );
        }

        let _ = writeln!(
            out,
            "Average time to merge: {}",
            hours_line(&window.timings.time_to_merge)
        );
        let _ = writeln!(
            out,
            "Average time creation -> first review: {}",
            hours_line(&window.timings.time_to_first_review)
        );
        let _ = writeln!(
            out,
            "Average time first review -> merge: {}",
            hours_line(&window.timings.time_first_review_to_merge)
        );
        let _ = writeln!(out);
    }

    fn render_overall(&self, out: &mut String) {
        let overall = &self.overall;
        let _ = writeln!(
            out,
            "Total records: {} ({} merged, {} carry-over)",
            overall.total_records, overall.merged_records, overall.carry_over
        );
        let _ = writeln!(
            out,
            "Average size: {:.0} lines across {} sized records",
            overall.avg_size, overall.sized_records
        );
        let _ = writeln!(
            out,
            "Average time to merge: {}",
            hours_line(&overall.timings.time_to_merge)
        );
        let _ = writeln!(
            out,
            "Average time creation -> first review: {}",
            hours_line(&overall.timings.time_to_first_review)
        );
        let _ = writeln!(
            out,
            "Average time first review -> merge: {}",
            hours_line(&overall.timings.time_first_review_to_merge)
        );

        let _ = writeln!(out);
        let _ = writeln!(out, "WORKFLOW TIMING:");
        let _ = writeln!(
            out,
            "In progress -> created: {}",
            hours_line(&overall.timings.time_in_progress_to_created)
        );
        let _ = writeln!(
            out,
            "In progress -> merged: {}",
            hours_line(&overall.timings.time_in_progress_to_merged)
        );
        let _ = writeln!(
            out,
            "Merged -> resolved: {}",
            hours_line(&overall.timings.time_merged_to_resolved)
        );

        let _ = writeln!(out);
        let _ = writeln!(out, "Review distribution (bus-factor view):");
        let _ = writeln!(
            out,
            "Total review instances: {} across {} reviewed records by {} reviewers",
            overall.total_review_instances, overall.unique_reviewed, overall.unique_reviewers
        );
        for (reviewer, count) in &overall.reviewer_distribution {
            let _ = writeln!(
                out,
                "  {}: {} instances ({})",
                reviewer,
                count,
                percent(*count, overall.total_review_instances)
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Approval quality over {} merged records:", overall.merged_records);
        let two_plus: u64 = overall
            .approval_histogram
            .iter()
            .filter(|(approvers, _)| *approvers >= 2)
            .map(|(_, count)| count)
            .sum();
        let _ = writeln!(
            out,
            "Records with >=2 distinct approvals before merge: {} ({})",
            two_plus,
            percent(two_plus, overall.merged_records)
        );
        for (approvers, count) in &overall.approval_histogram {
            let noun = if *approvers == 1 { "approver" } else { "approvers" };
            let _ = writeln!(
                out,
                "  {} {}: {} records ({})",
                approvers,
                noun,
                count,
                percent(*count, overall.merged_records)
            );
        }
        let _ = writeln!(out);
    }

    fn render_contributor(&self, out: &mut String, contributor: &ContributorMetrics) {
        let _ = writeln!(out, "--- {} ---", contributor.handle);
        let _ = writeln!(
            out,
            "  Authored: {} ({} merged, {} carry-over)",
            contributor.total_records, contributor.merged_records, contributor.carry_over
        );
        let _ = writeln!(
            out,
            "  Average time to merge: {}",
            hours_line(&contributor.timings.time_to_merge)
        );
        let _ = writeln!(
            out,
            "  Average size: {:.0} lines, average comments received: {:.1}",
            contributor.avg_size, contributor.avg_comments
        );
        let _ = writeln!(
            out,
            "  Approval signals received: {}",
            contributor.approvals_received
        );
        let _ = writeln!(
            out,
            "  Reviews given: {} records, {} instances",
            contributor.reviews_given_records, contributor.reviews_given_instances
        );

        let timings = &contributor.timings;
        if timings.time_in_progress_to_created.has_data()
            || timings.time_in_progress_to_merged.has_data()
            || timings.time_merged_to_resolved.has_data()
        {
            let _ = writeln!(out, "  Workflow timing:");
            let _ = writeln!(
                out,
                "    In progress -> created: {}",
                hours_line(&timings.time_in_progress_to_created)
            );
            let _ = writeln!(
                out,
                "    In progress -> merged: {}",
                hours_line(&timings.time_in_progress_to_merged)
            );
            let _ = writeln!(
                out,
                "    Merged -> resolved: {}",
                hours_line(&timings.time_merged_to_resolved)
            );
        }
        let _ = writeln!(out);
    }
}

/// Format an averaged duration, or mark the 0 sentinel as missing data
fn hours_line(stat: &DurationStat) -> String {
    if stat.has_data() {
        format!(
            "{:.1} hours ({:.1} days) across {} records",
            stat.avg_hours,
            stat.avg_hours / 24.0,
            stat.count
        )
    } else {
        "no data".to_string()
    }
}

/// Percentage with a zero denominator rendered as 0%, never an error
fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", part as f64 / whole as f64 * 100.0)
    }
}
