//! End-to-end analysis pipeline
//!
//! Sequential issue scan, batched remote resolution, window derivation, and
//! the three aggregation passes. Resolution is the only concurrent phase and
//! completes fully before aggregation begins.

use crate::analytics::{MetricsAggregator, VelocityReport, WindowPolicy, WindowSet};
use crate::codehost::{BatchFetchOrchestrator, FetchTarget, IssueContext};
use crate::error::Result;
use crate::tracker::IssueSource;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{error, info};

pub struct AnalysisPipeline {
    tracker: Arc<dyn IssueSource>,
    orchestrator: BatchFetchOrchestrator,
    link_field: String,
}

impl AnalysisPipeline {
    pub fn new(
        tracker: Arc<dyn IssueSource>,
        orchestrator: BatchFetchOrchestrator,
        link_field: String,
    ) -> Self {
        Self {
            tracker,
            orchestrator,
            link_field,
        }
    }

    /// Analyze the given sprints and produce the full report
    ///
    /// When an explicit `span` is given the window layout is precomputed and
    /// records carry their window index from construction; otherwise the
    /// layout is derived from the timestamps observed in the resolved set.
    pub async fn run(
        &self,
        sprints: &[String],
        policy: WindowPolicy,
        n_days: u32,
        span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<VelocityReport> {
        let layout = match span {
            Some((start, end)) => Some(WindowSet::from_span(start, end, policy, n_days)?),
            None => None,
        };

        let targets = self.collect_targets(sprints).await;
        info!(targets = targets.len(), "collected review-unit targets");

        // Synchronization barrier: every batch completes before aggregation
        let fetch = self.orchestrator.resolve(targets, layout.as_ref()).await;

        let windows = match layout {
            Some(layout) => layout,
            None => WindowSet::build(&fetch.records, policy, n_days)?,
        };

        let per_window = MetricsAggregator::aggregate_windows(&fetch.records, &windows);
        let overall = MetricsAggregator::aggregate_overall(&fetch.records);
        let contributors = MetricsAggregator::aggregate_contributors(&fetch.records);

        Ok(VelocityReport::new(
            policy,
            windows.start,
            windows.end,
            per_window,
            overall,
            contributors,
            fetch.attempted as u64,
            fetch.resolved as u64,
        ))
    }

    /// Sequential scan over every sprint's issues
    ///
    /// A failed sprint query degrades to an empty issue list; the first
    /// locator found on an issue wins.
    async fn collect_targets(&self, sprints: &[String]) -> Vec<FetchTarget> {
        let mut targets = Vec::new();

        for sprint in sprints {
            let issues = match self.tracker.sprint_issues(sprint).await {
                Ok(issues) => issues,
                Err(err) => {
                    error!(sprint, error = %err, "sprint query failed, continuing without it");
                    Vec::new()
                }
            };

            let progress = ProgressBar::new(issues.len() as u64);
            let mut sprint_targets = 0usize;
            for issue in &issues {
                progress.inc(1);
                let Some(locator) = issue.pull_locators(&self.link_field).into_iter().next()
                else {
                    continue;
                };
                let transitions = issue.workflow_transitions();
                targets.push(FetchTarget {
                    locator,
                    context: IssueContext {
                        issue_key: issue.key.clone(),
                        in_progress_at: transitions.in_progress_at,
                        resolved_at: transitions.resolved_at,
                    },
                });
                sprint_targets += 1;
            }
            progress.finish_and_clear();

            info!(
                sprint,
                issues = issues.len(),
                targets = sprint_targets,
                "scanned sprint"
            );
        }

        targets
    }
}
