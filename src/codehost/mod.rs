//! Code-host collaborator and the batch fetch orchestration built on it

mod batch;
mod client;
mod graphql;

pub use batch::{
    BatchFetchOrchestrator, BatchOutcome, FetchReport, FetchTarget, ItemResult,
    MAX_COMBINED_QUERY,
};
pub use client::{
    CodeHostClient, IssueContext, PullComment, PullData, PullReview, ReviewState,
    APPROVAL_MARKER,
};
pub use graphql::GraphQlCodeHost;
