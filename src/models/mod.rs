//! Core value types shared across the pipeline

mod locator;
mod review_unit;

pub use locator::{extract_pull_locators, PullLocator, RepoId};
pub use review_unit::ReviewUnitRecord;
