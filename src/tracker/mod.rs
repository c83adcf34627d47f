//! Issue-tracker collaborator
//!
//! The query client is a black box returning issue records with their
//! changelog; the extraction rules applied to those records (review-unit
//! locators, workflow transitions) live with the record type.

mod issue;
mod jira;

use crate::error::Result;
use async_trait::async_trait;

pub use issue::{parse_tracker_timestamp, ChangeEvent, IssueRecord, WorkflowTransitions};
pub use jira::{JiraSource, TrackerAuth};

/// Source of issue records for a sprint
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn sprint_issues(&self, sprint: &str) -> Result<Vec<IssueRecord>>;
}
