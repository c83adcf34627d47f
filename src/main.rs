use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use review_velocity::{
    analytics::{ExportFormat, ReportExporter, WindowPolicy},
    codehost::{BatchFetchOrchestrator, GraphQlCodeHost},
    config::{env_credential, Config},
    error::AppError,
    identity::IdentityFilter,
    pipeline::AnalysisPipeline,
    tracker::{JiraSource, TrackerAuth},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "review-velocity")]
#[command(
    about = "Engineering-velocity analytics over tracker sprints and their linked pull requests",
    long_about = None
)]
struct Cli {
    /// Sprint identifiers to analyze (e.g. 123 456 789)
    #[arg(required = true)]
    sprints: Vec<String>,

    /// Bucketing policy: daily, weekly, monthly, or fixed-days
    #[arg(short, long, default_value = "weekly")]
    policy: String,

    /// Window length in days for the fixed-days policy
    #[arg(long, default_value = "7")]
    window_days: u32,

    /// Explicit analysis span start (YYYY-MM-DD or RFC 3339)
    #[arg(long, requires = "until")]
    since: Option<String>,

    /// Explicit analysis span end (YYYY-MM-DD or RFC 3339)
    #[arg(long, requires = "since")]
    until: Option<String>,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: text, json, or csv
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Tracker host (e.g. issues.redhat.com)
    #[arg(long, env = "JIRA_HOST")]
    jira_host: Option<String>,

    /// Tracker access token for on-premise authentication
    #[arg(long, env = "JIRA_ACCESS_TOKEN", hide_env_values = true)]
    jira_token: Option<String>,

    /// Code-host API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Tracker custom field carrying review-request links
    #[arg(long)]
    link_field: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("review_velocity={}", config.observability.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting review-velocity v{}", env!("CARGO_PKG_VERSION"));

    let policy: WindowPolicy = cli.policy.parse().map_err(|_| {
        AppError::Configuration(format!("unsupported bucketing policy: {}", cli.policy))
    })?;
    let format: ExportFormat = cli.format.parse().map_err(AppError::from)?;

    let span = match (&cli.since, &cli.until) {
        (Some(since), Some(until)) => {
            let start = parse_date(since)?;
            let end = parse_date(until)?;
            if end <= start {
                return Err(AppError::Configuration(format!(
                    "--until ({}) must be after --since ({})",
                    until, since
                ))
                .into());
            }
            Some((start, end))
        }
        _ => None,
    };

    // Tracker authentication: token first, then username/password
    let tracker_auth = if let Some(token) = cli
        .jira_token
        .clone()
        .or_else(|| env_credential(&config.tracker.token_env))
    {
        TrackerAuth::Token(token)
    } else if let (Some(username), Some(password)) = (
        env_credential(&config.tracker.username_env),
        env_credential(&config.tracker.password_env),
    ) {
        TrackerAuth::Basic { username, password }
    } else {
        return Err(AppError::Configuration(
            "missing tracker credentials: provide --jira-token, JIRA_ACCESS_TOKEN, \
             or JIRA_USERNAME/JIRA_PASSWORD"
                .to_string(),
        )
        .into());
    };

    let codehost_token = cli
        .github_token
        .clone()
        .or_else(|| env_credential(&config.codehost.token_env))
        .ok_or_else(|| {
            AppError::Configuration(
                "missing code host token: provide --github-token or GITHUB_TOKEN".to_string(),
            )
        })?;

    let base_url = cli
        .jira_host
        .as_deref()
        .map(normalize_base_url)
        .unwrap_or_else(|| config.tracker.base_url.clone());

    let tracker = Arc::new(JiraSource::new(
        base_url,
        tracker_auth,
        config.tracker.timeout_secs,
        config.tracker.page_size,
    )?);
    let codehost = Arc::new(GraphQlCodeHost::new(
        config.codehost.graphql_url.clone(),
        codehost_token,
        config.codehost.timeout_secs,
    )?);
    let filter = IdentityFilter::from_config(&config.identity);
    let orchestrator = BatchFetchOrchestrator::new(codehost, filter, config.codehost.batch_size);
    let link_field = cli
        .link_field
        .unwrap_or_else(|| config.tracker.link_field.clone());

    let pipeline = AnalysisPipeline::new(tracker, orchestrator, link_field);
    let report = pipeline
        .run(&cli.sprints, policy, cli.window_days, span)
        .await?;

    match &cli.output {
        Some(path) => {
            ReportExporter::export(&report, format, path)
                .await
                .map_err(AppError::from)?;
            tracing::info!("report written to {}", path.display());
        }
        None => {
            let bytes = ReportExporter::export_to_bytes(&report, format).map_err(AppError::from)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }

    tracing::info!(
        attempted = report.targets_attempted,
        resolved = report.targets_resolved,
        dropped = report.targets_dropped,
        "analysis complete"
    );

    Ok(())
}

/// Accept plain dates or full RFC 3339 timestamps
fn parse_date(s: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::Configuration(format!("unparseable date: {}", s)))
}

fn normalize_base_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
