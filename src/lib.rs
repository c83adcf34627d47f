//! Engineering-velocity analytics over issue-tracker sprints and their
//! linked pull requests
//!
//! The pipeline ingests tracker issue records, extracts linked review-unit
//! locators and workflow timestamps, resolves them against the code host
//! through batched queries with single-item fallback, and reduces the
//! resolved records into per-window, overall, and per-contributor metrics.
//!
//! Remote clients sit behind traits ([`tracker::IssueSource`],
//! [`codehost::CodeHostClient`]) so the aggregation engine runs unchanged
//! against in-memory doubles in tests.

pub mod analytics;
pub mod codehost;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod tracker;
