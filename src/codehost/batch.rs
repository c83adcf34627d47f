//! Batched remote fetch with single-item fallback
//!
//! Targets are grouped by source repository and resolved through combined
//! queries of bounded size. A failed combined query degrades that one batch
//! to the single-item path; an individual failure drops that one record.
//! Failures are terminal per-record, there are no further retries.

use crate::analytics::WindowSet;
use crate::codehost::client::{CodeHostClient, IssueContext, PullData};
use crate::identity::IdentityFilter;
use crate::models::{PullLocator, RepoId, ReviewUnitRecord};
use futures::future;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The upstream API's hard ceiling for combined queries
pub const MAX_COMBINED_QUERY: usize = 20;

/// One locator to resolve, with its tracker-side context
#[derive(Debug, Clone)]
pub struct FetchTarget {
    pub locator: PullLocator,
    pub context: IssueContext,
}

/// Per-element resolution result, correlated by target number
#[derive(Debug)]
pub enum ItemResult {
    Resolved {
        data: Box<PullData>,
        context: IssueContext,
    },
    /// The host answered definitively that the target does not exist
    NotFound { number: u64 },
    /// The target could not be fetched even on the fallback path
    Dropped { number: u64 },
}

/// Outcome of one combined-query batch
#[derive(Debug)]
pub enum BatchOutcome {
    /// The combined query answered for the batch
    Complete(Vec<ItemResult>),
    /// The combined query failed; every element was retried one at a time
    Degraded(Vec<ItemResult>),
}

impl BatchOutcome {
    fn into_items(self) -> (Vec<ItemResult>, bool) {
        match self {
            BatchOutcome::Complete(items) => (items, false),
            BatchOutcome::Degraded(items) => (items, true),
        }
    }
}

/// Resolution accounting handed back to the caller
#[derive(Debug)]
pub struct FetchReport {
    pub records: Vec<ReviewUnitRecord>,
    pub attempted: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub dropped: usize,
    pub degraded_batches: usize,
}

/// Resolves (repository, number) targets into review-unit records
pub struct BatchFetchOrchestrator {
    client: Arc<dyn CodeHostClient>,
    filter: IdentityFilter,
    batch_size: usize,
}

impl BatchFetchOrchestrator {
    pub fn new(
        client: Arc<dyn CodeHostClient>,
        filter: IdentityFilter,
        batch_size: usize,
    ) -> Self {
        Self {
            client,
            filter,
            batch_size: batch_size.clamp(1, MAX_COMBINED_QUERY),
        }
    }

    /// Resolve every target, degrading failures per batch and per record
    ///
    /// Batches for different repositories have no ordering dependency and
    /// run concurrently; all results are collected here before returning,
    /// so the aggregation phase never observes a partial set. Output order
    /// is unspecified.
    pub async fn resolve(
        &self,
        targets: Vec<FetchTarget>,
        layout: Option<&WindowSet>,
    ) -> FetchReport {
        let attempted = targets.len();

        let mut by_repo: HashMap<RepoId, Vec<(u64, IssueContext)>> = HashMap::new();
        for target in targets {
            by_repo
                .entry(target.locator.repo)
                .or_default()
                .push((target.locator.number, target.context));
        }

        let mut batch_futures = Vec::new();
        for (repo, items) in by_repo {
            for chunk in items.chunks(self.batch_size) {
                let client = Arc::clone(&self.client);
                let repo = repo.clone();
                let batch = chunk.to_vec();
                batch_futures.push(async move { resolve_batch(client, repo, batch).await });
            }
        }

        // Each batch returns an independent result list; merging is plain
        // concatenation in this single owning task.
        let outcomes = future::join_all(batch_futures).await;

        let mut records = Vec::new();
        let mut not_found = 0usize;
        let mut dropped = 0usize;
        let mut degraded_batches = 0usize;
        for outcome in outcomes {
            let (items, degraded) = outcome.into_items();
            if degraded {
                degraded_batches += 1;
            }
            for item in items {
                match item {
                    ItemResult::Resolved { data, context } => {
                        records.push(data.into_record(&context, &self.filter, layout));
                    }
                    ItemResult::NotFound { .. } => not_found += 1,
                    ItemResult::Dropped { .. } => dropped += 1,
                }
            }
        }

        info!(
            attempted,
            resolved = records.len(),
            not_found,
            dropped,
            degraded_batches,
            "resolved review-unit targets"
        );

        FetchReport {
            resolved: records.len(),
            records,
            attempted,
            not_found,
            dropped,
            degraded_batches,
        }
    }
}

async fn resolve_batch(
    client: Arc<dyn CodeHostClient>,
    repo: RepoId,
    batch: Vec<(u64, IssueContext)>,
) -> BatchOutcome {
    let numbers: Vec<u64> = batch.iter().map(|(number, _)| *number).collect();

    match client.fetch_batch(&repo, &numbers).await {
        Ok(mut answered) => {
            let mut items = Vec::with_capacity(batch.len());
            for (number, context) in batch {
                match answered.remove(&number) {
                    Some(Some(data)) => items.push(ItemResult::Resolved {
                        data: Box::new(data),
                        context,
                    }),
                    Some(None) => {
                        debug!(%repo, number, "target not found, dropping without error");
                        items.push(ItemResult::NotFound { number });
                    }
                    // Element the combined response did not answer for:
                    // a per-element fetch failure, retried alone
                    None => items.push(resolve_single(client.as_ref(), &repo, number, context).await),
                }
            }
            BatchOutcome::Complete(items)
        }
        Err(error) => {
            warn!(
                %repo,
                batch_len = numbers.len(),
                %error,
                "combined query failed, degrading batch to single-item fetch"
            );
            let mut items = Vec::with_capacity(batch.len());
            for (number, context) in batch {
                items.push(resolve_single(client.as_ref(), &repo, number, context).await);
            }
            BatchOutcome::Degraded(items)
        }
    }
}

async fn resolve_single(
    client: &dyn CodeHostClient,
    repo: &RepoId,
    number: u64,
    context: IssueContext,
) -> ItemResult {
    match client.fetch_pull(repo, number).await {
        Ok(Some(data)) => ItemResult::Resolved {
            data: Box::new(data),
            context,
        },
        Ok(None) => ItemResult::NotFound { number },
        Err(error) => {
            warn!(%repo, number, %error, "single-item fetch failed, record dropped");
            ItemResult::Dropped { number }
        }
    }
}
