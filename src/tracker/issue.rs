//! Issue records and the extraction rules applied to them

use crate::models::{extract_pull_locators, PullLocator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One field-transition event from an issue's changelog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub at: DateTime<Utc>,
    pub field: String,
    pub to_value: String,
}

/// A tracker issue: key, raw field values, and its changelog
///
/// Fields are kept as raw JSON values in a sorted map so fallback scans are
/// deterministic; anything missing or of an unexpected shape extracts to
/// nothing rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub key: String,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub changelog: Vec<ChangeEvent>,
}

/// Workflow timestamps derived from an issue's changelog
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkflowTransitions {
    /// First entry into an in-progress-like status
    pub in_progress_at: Option<DateTime<Utc>>,
    /// Last entry into a resolved-like status
    pub resolved_at: Option<DateTime<Utc>>,
}

impl IssueRecord {
    /// Parse a tracker issue from its JSON representation
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let key = value.get("key")?.as_str()?.to_string();

        let fields = value
            .get("fields")
            .and_then(|f| f.as_object())
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let mut changelog = Vec::new();
        if let Some(histories) = value
            .get("changelog")
            .and_then(|c| c.get("histories"))
            .and_then(|h| h.as_array())
        {
            for history in histories {
                let Some(at) = history
                    .get("created")
                    .and_then(|c| c.as_str())
                    .and_then(parse_tracker_timestamp)
                else {
                    continue;
                };
                let Some(items) = history.get("items").and_then(|i| i.as_array()) else {
                    continue;
                };
                for item in items {
                    let field = item
                        .get("field")
                        .and_then(|f| f.as_str())
                        .unwrap_or_default();
                    let to_value = item
                        .get("toString")
                        .and_then(|t| t.as_str())
                        .unwrap_or_default();
                    changelog.push(ChangeEvent {
                        at,
                        field: field.to_string(),
                        to_value: to_value.to_string(),
                    });
                }
            }
        }

        Some(Self {
            key,
            fields,
            changelog,
        })
    }

    /// Extract review-unit locators from the issue's fields
    ///
    /// The configured link field is consulted first (string or list of
    /// strings), then every other string-valued custom field. Duplicates are
    /// removed preserving discovery order.
    pub fn pull_locators(&self, link_field: &str) -> Vec<PullLocator> {
        let mut found = Vec::new();

        if let Some(value) = self.fields.get(link_field) {
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        if let Some(text) = item.as_str() {
                            found.extend(extract_pull_locators(text));
                        }
                    }
                }
                serde_json::Value::String(text) => found.extend(extract_pull_locators(text)),
                _ => {}
            }
        }

        for (name, value) in &self.fields {
            if name == link_field || !name.starts_with("customfield_") {
                continue;
            }
            if let serde_json::Value::String(text) = value {
                found.extend(extract_pull_locators(text));
            }
        }

        let mut seen = HashSet::new();
        found.retain(|locator| seen.insert(locator.clone()));
        found
    }

    /// Derive workflow transition timestamps from the changelog
    pub fn workflow_transitions(&self) -> WorkflowTransitions {
        let mut transitions = WorkflowTransitions::default();

        for event in &self.changelog {
            if event.field != "status" {
                continue;
            }
            let status = event.to_value.to_lowercase();

            if status.contains("in progress") || status.contains("inprogress") {
                // First entry wins
                match transitions.in_progress_at {
                    Some(existing) if existing <= event.at => {}
                    _ => transitions.in_progress_at = Some(event.at),
                }
            }

            if status.contains("resolved") || status.contains("done") || status.contains("closed")
            {
                // Latest entry wins
                transitions.resolved_at = Some(event.at);
            }
        }

        transitions
    }
}

/// Parse the tracker's timestamp format, tolerating both RFC 3339 and the
/// legacy `+0000` offset shape
pub fn parse_tracker_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
