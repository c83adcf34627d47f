//! GraphQL implementation of the code-host client

use crate::codehost::client::{
    CodeHostClient, PullComment, PullData, PullReview, ReviewState,
};
use crate::error::{AppError, Result};
use crate::models::RepoId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Field selection shared by the combined and single-item queries
const PULL_FIELDS: &str = "number title author { login } createdAt mergedAt \
    additions deletions \
    comments(first: 100) { totalCount nodes { body author { login } } } \
    reviews(first: 100) { nodes { state body submittedAt author { login } } }";

/// Code-host client speaking the host's GraphQL API
pub struct GraphQlCodeHost {
    endpoint: String,
    client: Client,
    token: String,
}

impl GraphQlCodeHost {
    pub fn new(endpoint: impl Into<String>, token: String, timeout_secs: u64) -> Result<Self> {
        if token.is_empty() {
            return Err(AppError::Configuration(
                "code host token cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("review-velocity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            token,
        })
    }

    fn batch_query(repo: &RepoId, numbers: &[u64]) -> String {
        let mut selections = String::new();
        for (index, number) in numbers.iter().enumerate() {
            let _ = write!(
                selections,
                "pr{}: pullRequest(number: {}) {{ {} }} ",
                index, number, PULL_FIELDS
            );
        }
        format!(
            "query {{ repository(owner: {}, name: {}) {{ {} }} }}",
            quoted(&repo.owner),
            quoted(&repo.name),
            selections
        )
    }

    fn single_query(repo: &RepoId, number: u64) -> String {
        format!(
            "query {{ repository(owner: {}, name: {}) {{ pullRequest(number: {}) {{ {} }} }} }}",
            quoted(&repo.owner),
            quoted(&repo.name),
            number,
            PULL_FIELDS
        )
    }

    async fn execute(&self, query: String) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| AppError::Network(format!("GraphQL request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::CodeHost(format!(
                "GraphQL endpoint returned HTTP {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::CodeHost(format!("malformed GraphQL response: {}", e)))?;

        if body.get("data").map_or(true, Value::is_null) {
            let detail = body
                .get("errors")
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no data in response".to_string());
            return Err(AppError::CodeHost(format!("GraphQL query failed: {}", detail)));
        }

        Ok(body)
    }

    fn repository<'a>(body: &'a Value) -> Result<&'a Value> {
        let repository = &body["data"]["repository"];
        if repository.is_null() {
            return Err(AppError::CodeHost(
                "repository is missing or not accessible".to_string(),
            ));
        }
        Ok(repository)
    }
}

#[async_trait]
impl CodeHostClient for GraphQlCodeHost {
    async fn fetch_batch(
        &self,
        repo: &RepoId,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Option<PullData>>> {
        if numbers.is_empty() {
            return Ok(HashMap::new());
        }

        let body = self.execute(Self::batch_query(repo, numbers)).await?;
        let repository = Self::repository(&body)?;

        let mut results = HashMap::new();
        for (index, number) in numbers.iter().enumerate() {
            let alias = format!("pr{}", index);
            match repository.get(&alias) {
                // Alias answered with null: definitively not found
                Some(Value::Null) => {
                    results.insert(*number, None);
                }
                // Unparseable payloads are left absent so the caller retries
                Some(value) => {
                    if let Some(pull) = parse_pull(value) {
                        results.insert(*number, Some(pull));
                    }
                }
                None => {}
            }
        }
        Ok(results)
    }

    async fn fetch_pull(&self, repo: &RepoId, number: u64) -> Result<Option<PullData>> {
        let body = self.execute(Self::single_query(repo, number)).await?;
        let repository = Self::repository(&body)?;

        let pull = &repository["pullRequest"];
        if pull.is_null() {
            return Ok(None);
        }
        parse_pull(pull).map(Some).ok_or_else(|| {
            AppError::CodeHost(format!("malformed pull payload for {}#{}", repo, number))
        })
    }
}

/// Quote a string as a GraphQL string literal
fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn parse_pull(value: &Value) -> Option<PullData> {
    let number = value.get("number")?.as_u64()?;
    let created_at = parse_timestamp(value.get("createdAt"))?;
    let merged_at = parse_timestamp(value.get("mergedAt"));

    let comments_node = value.get("comments");
    let comment_total = comments_node
        .and_then(|c| c.get("totalCount"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let comments = comments_node
        .and_then(|c| c.get("nodes"))
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .map(|node| PullComment {
                    author: login(node),
                    body: text(node.get("body")),
                })
                .collect()
        })
        .unwrap_or_default();

    let reviews = value
        .get("reviews")
        .and_then(|r| r.get("nodes"))
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .map(|node| PullReview {
                    state: ReviewState::from_api(
                        node.get("state").and_then(Value::as_str).unwrap_or(""),
                    ),
                    submitted_at: parse_timestamp(node.get("submittedAt")),
                    author: login(node),
                    body: text(node.get("body")),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PullData {
        number,
        title: text(value.get("title")),
        author: login(value),
        created_at,
        merged_at,
        additions: value.get("additions").and_then(Value::as_u64).unwrap_or(0),
        deletions: value.get("deletions").and_then(Value::as_u64).unwrap_or(0),
        comment_total,
        comments,
        reviews,
    })
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn login(node: &Value) -> Option<String> {
    node.get("author")
        .and_then(|a| a.get("login"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pull_json(number: u64) -> Value {
        json!({
            "number": number,
            "title": "fix panic",
            "author": { "login": "alice" },
            "createdAt": "2025-04-01T08:00:00Z",
            "mergedAt": "2025-04-02T08:00:00Z",
            "additions": 10,
            "deletions": 5,
            "comments": { "totalCount": 1, "nodes": [
                { "body": "/lgtm", "author": { "login": "bob" } }
            ]},
            "reviews": { "nodes": [
                { "state": "APPROVED", "body": "", "submittedAt": "2025-04-01T12:00:00Z",
                  "author": { "login": "bob" } }
            ]}
        })
    }

    fn host(server: &mockito::Server) -> GraphQlCodeHost {
        GraphQlCodeHost::new(format!("{}/graphql", server.url()), "token".to_string(), 10)
            .unwrap()
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = GraphQlCodeHost::new("https://api.example.com/graphql", String::new(), 10);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_batch_query_aliases_and_quoting() {
        let repo = RepoId::new("acme", "widgets");
        let query = GraphQlCodeHost::batch_query(&repo, &[5, 9]);
        assert!(query.contains("pr0: pullRequest(number: 5)"));
        assert!(query.contains("pr1: pullRequest(number: 9)"));
        assert!(query.contains(r#"repository(owner: "acme", name: "widgets")"#));
    }

    #[test]
    fn test_parse_pull_payload() {
        let pull = parse_pull(&pull_json(7)).unwrap();
        assert_eq!(pull.number, 7);
        assert_eq!(pull.author.as_deref(), Some("alice"));
        assert_eq!(pull.additions + pull.deletions, 15);
        assert_eq!(pull.reviews.len(), 1);
        assert_eq!(pull.reviews[0].state, ReviewState::Approved);
    }

    #[test]
    fn test_parse_pull_requires_created_at() {
        let mut value = pull_json(7);
        value["createdAt"] = Value::Null;
        assert!(parse_pull(&value).is_none());
    }

    #[tokio::test]
    async fn test_fetch_batch_distinguishes_null_and_absent() {
        let mut server = mockito::Server::new_async().await;
        // pr0 resolved, pr1 null (not found), pr2 missing from the response
        let body = json!({
            "data": { "repository": {
                "pr0": pull_json(5),
                "pr1": Value::Null
            }}
        });
        let _m = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let repo = RepoId::new("acme", "widgets");
        let results = host(&server).fetch_batch(&repo, &[5, 6, 7]).await.unwrap();

        assert!(results.get(&5).and_then(|p| p.as_ref()).is_some());
        assert_eq!(results.get(&6), Some(&None));
        assert!(!results.contains_key(&7));
    }

    #[tokio::test]
    async fn test_fetch_batch_error_response() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({ "data": Value::Null, "errors": [{ "message": "rate limited" }] });
        let _m = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let repo = RepoId::new("acme", "widgets");
        let result = host(&server).fetch_batch(&repo, &[1]).await;
        assert!(matches!(result, Err(AppError::CodeHost(_))));
    }

    #[tokio::test]
    async fn test_fetch_pull_not_found() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({ "data": { "repository": { "pullRequest": Value::Null } } });
        let _m = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let repo = RepoId::new("acme", "widgets");
        let result = host(&server).fetch_pull(&repo, 404).await.unwrap();
        assert!(result.is_none());
    }
}
