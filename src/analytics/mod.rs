//! Metrics aggregation engine
//!
//! This module is the analytical core: the time-bucketing model, the
//! statistical roll-up passes, and report assembly/export over resolved
//! review-unit records.
//!
//! # Features
//!
//! - **Window generation**: aligned, contiguous, half-open buckets under
//!   daily/weekly/monthly/fixed-days policies
//! - **Aggregation passes**: per-window, overall, and per-contributor
//!   roll-ups, all pure and null-safe over partial timing data
//! - **Report assembly**: plain serializable structures plus text rendering
//! - **Export formats**: text, JSON, CSV
//!
//! # Example
//!
//! ```no_run
//! use review_velocity::analytics::{MetricsAggregator, WindowPolicy, WindowSet};
//!
//! # fn run(records: Vec<review_velocity::models::ReviewUnitRecord>) {
//! let windows = WindowSet::build(&records, WindowPolicy::Weekly, 0).unwrap();
//! let per_window = MetricsAggregator::aggregate_windows(&records, &windows);
//! let overall = MetricsAggregator::aggregate_overall(&records);
//! let per_author = MetricsAggregator::aggregate_contributors(&records);
//! # }
//! ```

mod aggregation;
mod error;
mod export;
mod metrics;
mod reports;
mod windows;

pub use aggregation::MetricsAggregator;
pub use error::{AnalyticsError, AnalyticsResult};
pub use export::{ExportFormat, ReportExporter};
pub use metrics::{
    ContributorMetrics, DurationStat, OverallMetrics, TimingMetrics, WindowMetrics,
};
pub use reports::VelocityReport;
pub use windows::{Window, WindowPolicy, WindowSet};
