use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Issue-tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Code-host configuration
    #[serde(default)]
    pub codehost: CodeHostConfig,

    /// Identity filter configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from an optional file and the environment
    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let path = config_path
            .map(str::to_string)
            .or_else(|| std::env::var("REVIEW_VELOCITY_CONFIG").ok())
            .unwrap_or_else(|| "config/review-velocity.toml".to_string());

        config::Config::builder()
            // Config file is optional; defaults cover everything
            .add_source(config::File::with_name(&path).required(false))
            // Override with environment variables (prefix: RV_)
            .add_source(
                config::Environment::with_prefix("RV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            codehost: CodeHostConfig::default(),
            identity: IdentityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracker base URL
    #[serde(default = "default_tracker_url")]
    pub base_url: String,

    /// Env var holding the access token (on-premise auth)
    pub token_env: Option<String>,

    /// Env var holding the username (cloud auth)
    pub username_env: Option<String>,

    /// Env var holding the password (cloud auth)
    pub password_env: Option<String>,

    /// Custom field id carrying review-request links
    #[serde(default = "default_link_field")]
    pub link_field: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Page size for tracker queries
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_tracker_url(),
            token_env: Some("JIRA_ACCESS_TOKEN".to_string()),
            username_env: Some("JIRA_USERNAME".to_string()),
            password_env: Some("JIRA_PASSWORD".to_string()),
            link_field: default_link_field(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeHostConfig {
    /// GraphQL endpoint of the code host
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    /// Env var holding the API token
    pub token_env: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Combined-query batch size; the upstream API caps this at 20
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CodeHostConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Account handles classified as automation
    #[serde(default = "default_automation_handles")]
    pub automation_handles: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            automation_handles: default_automation_handles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Read a credential from the env var a config field names
pub fn env_credential(var_name: &Option<String>) -> Option<String> {
    var_name
        .as_ref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|value| !value.is_empty())
}

// Default value functions

fn default_tracker_url() -> String {
    "https://issues.redhat.com".to_string()
}

fn default_link_field() -> String {
    "customfield_12310220".to_string()
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_batch_size() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_automation_handles() -> Vec<String> {
    [
        "dependabot[bot]",
        "github-actions[bot]",
        "openshift-ci[bot]",
        "openshift-merge-bot[bot]",
        "openshift-ci-robot",
        "openshift-merge-robot",
        "codecov[bot]",
        "sonarcloud[bot]",
        "renovate[bot]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
