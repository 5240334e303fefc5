mod backlog;
mod config;
mod error;
mod github;
mod pipeline;

use std::future::Future;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crate::backlog::BacklogIssue;
use crate::config::{
  Config, DEFAULT_API_URL, DEFAULT_BACKLOG_PATH, DEFAULT_LABEL_COLOR, DEFAULT_PER_PAGE,
};
use crate::error::{BacklogError, Result};
use crate::github::{GitHubClient, IssueGateway, ReadOnlyGateway};
use crate::pipeline::report::{self, CheckSummary};

#[derive(Parser)]
#[command(
  name = "backlog-tools",
  about = "Keep a YAML backlog and its GitHub issues in agreement"
)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Path to the backlog document
  #[arg(long, global = true, env = "BACKLOG_PATH", default_value = DEFAULT_BACKLOG_PATH)]
  backlog: PathBuf,

  /// GitHub repository in owner/repo form
  #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
  repo: Option<String>,

  /// GitHub token (falls back to GH_TOKEN)
  #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// GitHub REST API base URL
  #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
  api_url: String,

  /// Page size used when listing repository labels
  #[arg(long, global = true, env = "BACKLOG_LABELS_PER_PAGE", default_value_t = DEFAULT_PER_PAGE)]
  per_page: u32,

  /// Color for labels created by sync
  #[arg(long, global = true, env = "BACKLOG_LABEL_COLOR", default_value = DEFAULT_LABEL_COLOR)]
  label_color: String,

  /// Print the summary as JSON
  #[arg(long, global = true)]
  json: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Push backlog titles, bodies and labels to the matching GitHub issues
  Sync {
    /// Look up issues and report drift without changing anything
    #[arg(long)]
    dry_run: bool,
    /// Do not fail when backlog issues have no GitHub counterpart
    #[arg(
      long,
      env = "BACKLOG_ALLOW_MISSING",
      value_parser = clap::builder::FalseyValueParser::new()
    )]
    allow_missing: bool,
  },
  /// Check that issues with a complete Definition of Done are closed on GitHub
  Verify,
  /// Validate the backlog document without contacting GitHub
  Check,
  /// Rank backlog issues by priority, impact and estimate and keep the best ones
  Top {
    /// Number of issues to keep
    #[arg(long, default_value_t = pipeline::select::DEFAULT_LIMIT)]
    limit: usize,
    /// Write the selection to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(0) => {}
    Ok(code) => std::process::exit(code),
    Err(e) => {
      error!("{e}");
      std::process::exit(1);
    }
  }
}

async fn run(cli: Cli) -> Result<i32> {
  match cli.command {
    Commands::Sync {
      dry_run,
      allow_missing,
    } => {
      let config = resolve_config(&cli)?;
      cmd_sync(&config, cli.json, dry_run, allow_missing).await
    }
    Commands::Verify => {
      let config = resolve_config(&cli)?;
      cmd_verify(&config, cli.json).await
    }
    Commands::Check => cmd_check(&cli.backlog, cli.json),
    Commands::Top { limit, ref output } => cmd_top(&cli.backlog, limit, output.as_deref()),
  }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
  let repo = cli.repo.clone().ok_or_else(|| {
    BacklogError::Config("GITHUB_REPOSITORY (or --repo) must be set to owner/repo".into())
  })?;

  let mut config = Config::new(repo);
  config.token = cli
    .token
    .clone()
    .or_else(|| std::env::var("GH_TOKEN").ok())
    .filter(|t| !t.trim().is_empty());
  config.backlog_path = cli.backlog.clone();
  config.api_url = cli.api_url.clone();
  config.per_page = cli.per_page;
  config.label_color = cli.label_color.clone();
  config.validate()?;

  if config.token.is_none() {
    warn!("no GitHub token configured, requests are anonymous");
  }
  Ok(config)
}

async fn cmd_sync(config: &Config, json: bool, dry_run: bool, allow_missing: bool) -> Result<i32> {
  let issues = backlog::load(&config.backlog_path)?;
  let client = GitHubClient::new(config)?;
  let read_only = ReadOnlyGateway::new(&client);
  let gateway: &dyn IssueGateway = if dry_run { &read_only } else { &client };

  info!("syncing {} issue(s) with {}", issues.len(), config.repo);
  let summary = cancellable(pipeline::sync::sync_backlog(&issues, gateway)).await?;
  info!("sync complete: {summary}");

  if json {
    println!("{}", report::to_json(&summary)?);
  } else {
    print!("{}", report::render_sync(&summary, dry_run));
  }

  if !summary.missing.is_empty() && !allow_missing {
    error!(
      "{} backlog issue(s) missing on GitHub (set BACKLOG_ALLOW_MISSING=1 to ignore)",
      summary.missing.len()
    );
    return Ok(1);
  }
  Ok(0)
}

async fn cmd_verify(config: &Config, json: bool) -> Result<i32> {
  let issues = backlog::load(&config.backlog_path)?;
  let client = GitHubClient::new(config)?;

  info!("verifying {} issue(s) against {}", issues.len(), config.repo);
  let summary = cancellable(pipeline::verify::verify_backlog(&issues, &client)).await?;
  info!("verify complete: {summary}");

  if json {
    println!("{}", report::to_json(&summary)?);
  } else {
    print!("{}", report::render_verify(&summary));
  }

  if !summary.mismatches.is_empty() {
    error!(
      "{} completed backlog issue(s) are not closed on GitHub",
      summary.mismatches.len()
    );
    return Ok(1);
  }
  Ok(0)
}

fn cmd_check(path: &Path, json: bool) -> Result<i32> {
  let issues: Vec<BacklogIssue> = backlog::load(path)?;
  let summary = CheckSummary::from_issues(&issues);

  if json {
    println!("{}", report::to_json(&summary)?);
  } else {
    print!("{}", report::render_check(&summary));
  }
  Ok(0)
}

fn cmd_top(path: &Path, limit: usize, output: Option<&Path>) -> Result<i32> {
  let issues = backlog::load(path)?;
  let selected = pipeline::select::select_top(&issues, limit);

  match output {
    Some(target) => {
      pipeline::select::write_selection(target, &selected)?;
      println!("Top {} issue(s) written to {}", selected.len(), target.display());
    }
    None => print!("{}", pipeline::select::to_yaml(&selected)?),
  }
  Ok(0)
}

/// Runs `work` until it finishes or Ctrl-C arrives. On interrupt the future is
/// dropped, so no further request is issued.
async fn cancellable<T>(work: impl Future<Output = Result<T>>) -> Result<T> {
  tokio::select! {
    result = work => result,
    _ = tokio::signal::ctrl_c() => {
      warn!("interrupted, stopping before the next request");
      Err(BacklogError::Cancelled)
    }
  }
}
