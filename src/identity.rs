//! Classification of account handles as automation vs. human
//!
//! Reviewer and approver sets are filtered through this at record
//! construction time, never after the fact. An empty or absent handle is
//! classified as automation so unattributed signals cannot inflate human
//! reviewer counts.

use crate::config::IdentityConfig;
use std::collections::HashSet;

/// Membership filter over a configured set of automation handles
#[derive(Debug, Clone, Default)]
pub struct IdentityFilter {
    automation: HashSet<String>,
}

impl IdentityFilter {
    /// Create a filter from an explicit set of automation handles
    pub fn new<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            automation: handles.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a filter from configuration
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.automation_handles.iter().cloned())
    }

    /// Whether a handle is an automation account
    pub fn is_automation(&self, handle: &str) -> bool {
        handle.trim().is_empty() || self.automation.contains(handle)
    }

    /// Pass a possibly-absent handle through the filter
    ///
    /// Returns the handle only when it is present and human.
    pub fn human<'a>(&self, handle: Option<&'a str>) -> Option<&'a str> {
        match handle {
            Some(h) if !self.is_automation(h) => Some(h),
            _ => None,
        }
    }
}
