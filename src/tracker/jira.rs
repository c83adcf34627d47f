//! HTTP implementation of the issue source against a Jira-shaped API

use crate::error::{AppError, Result};
use crate::tracker::issue::IssueRecord;
use crate::tracker::IssueSource;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Authentication modes supported by the tracker
#[derive(Debug, Clone)]
pub enum TrackerAuth {
    /// Bearer token (on-premise instances)
    Token(String),
    /// Username/password (cloud instances)
    Basic { username: String, password: String },
}

/// Issue source backed by a Jira REST search endpoint
pub struct JiraSource {
    base_url: String,
    client: Client,
    auth: TrackerAuth,
    page_size: u32,
}

impl JiraSource {
    pub fn new(base_url: String, auth: TrackerAuth, timeout_secs: u64, page_size: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth,
            page_size: page_size.max(1),
        })
    }

    async fn search_page(&self, jql: &str, start_at: u64) -> Result<serde_json::Value> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("jql", jql),
            ("expand", "changelog"),
            ("startAt", &start_at.to_string()),
            ("maxResults", &self.page_size.to_string()),
        ]);

        request = match &self.auth {
            TrackerAuth::Token(token) => request.bearer_auth(token),
            TrackerAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Tracker(format!("search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Tracker(format!(
                "search returned HTTP {} for jql {:?}",
                status, jql
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Tracker(format!("malformed search response: {}", e)))
    }
}

#[async_trait]
impl IssueSource for JiraSource {
    async fn sprint_issues(&self, sprint: &str) -> Result<Vec<IssueRecord>> {
        let jql = format!("Sprint={}", sprint);
        let mut issues = Vec::new();
        let mut start_at = 0u64;

        loop {
            let page = self.search_page(&jql, start_at).await?;

            let batch = page
                .get("issues")
                .and_then(|i| i.as_array())
                .cloned()
                .unwrap_or_default();
            if batch.is_empty() {
                break;
            }

            for raw in &batch {
                match IssueRecord::from_json(raw) {
                    Some(issue) => issues.push(issue),
                    None => warn!(sprint, "skipping issue without a key"),
                }
            }

            start_at += batch.len() as u64;
            let total = page.get("total").and_then(|t| t.as_u64()).unwrap_or(0);
            if start_at >= total {
                break;
            }
        }

        debug!(sprint, count = issues.len(), "fetched sprint issues");
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = JiraSource::new(
            "https://issues.example.com/".to_string(),
            TrackerAuth::Token("t".to_string()),
            10,
            50,
        )
        .unwrap();
        assert_eq!(source.base_url, "https://issues.example.com");
    }

    #[tokio::test]
    async fn test_sprint_issues_paginates() {
        let mut server = mockito::Server::new_async().await;

        let page1 = serde_json::json!({
            "total": 3,
            "issues": [
                { "key": "PROJ-1", "fields": {} },
                { "key": "PROJ-2", "fields": {} }
            ]
        });
        let page2 = serde_json::json!({
            "total": 3,
            "issues": [ { "key": "PROJ-3", "fields": {} } ]
        });

        let _m1 = server
            .mock("GET", "/rest/api/2/search")
            .match_query(mockito::Matcher::UrlEncoded(
                "startAt".to_string(),
                "0".to_string(),
            ))
            .with_status(200)
            .with_body(page1.to_string())
            .create_async()
            .await;
        let _m2 = server
            .mock("GET", "/rest/api/2/search")
            .match_query(mockito::Matcher::UrlEncoded(
                "startAt".to_string(),
                "2".to_string(),
            ))
            .with_status(200)
            .with_body(page2.to_string())
            .create_async()
            .await;

        let source = JiraSource::new(
            server.url(),
            TrackerAuth::Token("t".to_string()),
            10,
            2,
        )
        .unwrap();

        let issues = source.sprint_issues("901").await.unwrap();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[2].key, "PROJ-3");
    }

    #[tokio::test]
    async fn test_http_error_surfaces_as_tracker_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rest/api/2/search")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let source = JiraSource::new(
            server.url(),
            TrackerAuth::Token("t".to_string()),
            10,
            50,
        )
        .unwrap();

        let result = source.sprint_issues("901").await;
        assert!(matches!(result, Err(AppError::Tracker(_))));
    }
}
