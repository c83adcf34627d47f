//! Code-host client trait and the raw pull payload it returns

use crate::analytics::WindowSet;
use crate::error::Result;
use crate::identity::IdentityFilter;
use crate::models::{RepoId, ReviewUnitRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Marker substring signalling an explicit reviewer endorsement
pub const APPROVAL_MARKER: &str = "lgtm";

/// Review submission states recognized by the code host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Other,
}

impl ReviewState {
    pub fn from_api(state: &str) -> Self {
        match state {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            _ => ReviewState::Other,
        }
    }

    /// Whether a submission in this state counts as a review
    pub fn counts_as_review(&self) -> bool {
        !matches!(self, ReviewState::Other)
    }
}

/// One comment on a pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullComment {
    pub author: Option<String>,
    pub body: String,
}

/// One review submission on a pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullReview {
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub body: String,
}

/// Raw pull-request payload as returned by the code host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullData {
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    pub comment_total: u64,
    pub comments: Vec<PullComment>,
    pub reviews: Vec<PullReview>,
}

/// Tracker-side context attached to a fetch target
#[derive(Debug, Clone, Default)]
pub struct IssueContext {
    pub issue_key: String,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PullData {
    /// Build the immutable review-unit record
    ///
    /// Reviewer and approver sets are identity-filtered here, at
    /// construction; nothing downstream re-filters. The window index comes
    /// from the precomputed layout when one exists, -1 otherwise.
    pub fn into_record(
        self,
        context: &IssueContext,
        filter: &IdentityFilter,
        layout: Option<&WindowSet>,
    ) -> ReviewUnitRecord {
        let mut reviewers = BTreeSet::new();
        let mut first_review_at: Option<DateTime<Utc>> = None;

        for review in &self.reviews {
            if !review.state.counts_as_review() {
                continue;
            }
            let Some(author) = filter.human(review.author.as_deref()) else {
                continue;
            };
            if let Some(at) = review.submitted_at {
                if first_review_at.map_or(true, |current| at < current) {
                    first_review_at = Some(at);
                }
            }
            reviewers.insert(author.to_string());
        }

        let mut approvers = BTreeSet::new();
        let comment_signals = self
            .comments
            .iter()
            .map(|c| (c.author.as_deref(), c.body.as_str()));
        let review_signals = self
            .reviews
            .iter()
            .map(|r| (r.author.as_deref(), r.body.as_str()));
        for (author, body) in comment_signals.chain(review_signals) {
            if !body.to_lowercase().contains(APPROVAL_MARKER) {
                continue;
            }
            if let Some(author) = filter.human(author) {
                approvers.insert(author.to_string());
            }
        }

        ReviewUnitRecord {
            number: self.number,
            title: self.title,
            author: self.author.unwrap_or_else(|| "unknown".to_string()),
            created_at: self.created_at,
            merged_at: self.merged_at,
            first_review_at,
            size: self.additions + self.deletions,
            comment_count: self.comment_total,
            reviewers,
            approval_count: approvers.len() as u64,
            approvers,
            window_index: layout.map(|w| w.index_for(self.created_at)).unwrap_or(-1),
            issue_key: context.issue_key.clone(),
            in_progress_at: context.in_progress_at,
            resolved_at: context.resolved_at,
        }
    }
}

/// Code-host collaborator resolving pull numbers into raw payloads
#[async_trait]
pub trait CodeHostClient: Send + Sync {
    /// One combined query for up to a batch of numbers
    ///
    /// The map carries one entry per number the response answered for:
    /// `Some(data)` resolved, `None` definitively not found. Numbers absent
    /// from the map were not answered and count as per-element failures.
    async fn fetch_batch(
        &self,
        repo: &RepoId,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Option<PullData>>>;

    /// Single-item fetch path used for fallback
    async fn fetch_pull(&self, repo: &RepoId, number: u64) -> Result<Option<PullData>>;
}
