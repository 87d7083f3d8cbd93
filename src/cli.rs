use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::builder::{self, BuildConfig};
use crate::config::{AppConfig, GitHubConfig};
use crate::github::GitHub;
use crate::split;
use crate::sync::{SyncConfig, Synchronizer};
use crate::util::tsv;

/// Join column used by `sync` when neither the flag nor the config names one.
const DEFAULT_ISSUE_COLUMN: &str = "issue_number";

#[derive(Debug, Parser)]
#[command(name = "boardsync", version, about = "Drive GitHub project boards from TSV files")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Token for GraphQL and REST calls
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// User or organization that owns the projects
    #[arg(long, env = "GITHUB_OWNER", global = true)]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set project item fields from the PROJECT_FIELD_* columns of a TSV
    Sync {
        /// Project number
        #[arg(long, env = "PROJECT_ID")]
        project: String,

        /// TSV file to apply
        #[arg(long, env = "TSV_FILE_PATH")]
        file: PathBuf,

        /// Column holding each row's issue number
        #[arg(long, env = "ISSUE_NUMBER_COLUMN")]
        issue_column: Option<String>,

        /// Delay after each row, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Create one project per TSV file in a directory
    CreateProjects {
        /// Repository whose open issues are added (name or owner/name)
        #[arg(long, env = "GITHUB_REPO")]
        repo: Option<String>,

        /// Directory scanned for .tsv files
        #[arg(long, env = "TSV_DIRECTORY")]
        dir: Option<PathBuf>,
    },

    /// Split a `;`-delimited issue body into sub-issues
    SplitIssue {
        /// Repository as owner/name
        #[arg(long, env = "REPO_NAME")]
        repo: Option<String>,

        /// Parent issue number
        #[arg(long, env = "ISSUE_NUMBER")]
        issue: u64,
    },
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

/// Resolve a repository to `owner/name`, filling the owner in when only a
/// name is given.
pub fn qualify_repo(owner: Option<&str>, repo: Option<&str>) -> Result<String> {
    let Some(repo) = repo.filter(|r| !r.is_empty()) else {
        bail!("No repository given. Pass --repo or set [github] repo in config.toml");
    };
    if repo.contains('/') {
        return Ok(repo.to_string());
    }
    match owner.filter(|o| !o.is_empty()) {
        Some(owner) => Ok(format!("{owner}/{repo}")),
        None => bail!("Repository '{repo}' needs an owner. Pass --owner or use owner/name"),
    }
}

fn github_config(cli_owner: Option<String>, cli_token: Option<String>, config: &AppConfig) -> GitHubConfig {
    GitHubConfig {
        owner: cli_owner.or_else(|| config.github.owner.clone()),
        repo: config.github.repo.clone(),
        token: cli_token.or_else(|| config.github.token.clone()),
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let gh_config = github_config(cli.owner, cli.token, &config);
    let github = GitHub::from_config(&gh_config);

    match cli.command {
        Commands::Sync {
            project,
            file,
            issue_column,
            pacing_ms,
        } => {
            let issue_column = issue_column
                .or_else(|| config.sync.issue_column.clone())
                .unwrap_or_else(|| DEFAULT_ISSUE_COLUMN.to_string());
            let pacing = pacing_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.pacing());
            if gh_config.token.is_none() {
                bail!("GITHUB_TOKEN is not set. Project fields are read through the GraphQL API");
            }
            handle_sync(
                &github,
                SyncConfig {
                    project,
                    issue_column,
                    pacing,
                },
                file,
            )
            .await
        }
        Commands::CreateProjects { repo, dir } => {
            let repo = qualify_repo(
                gh_config.owner.as_deref(),
                repo.as_deref().or(gh_config.repo.as_deref()),
            )?;
            let dir = dir.unwrap_or_else(|| config.tsv_dir());
            let build = BuildConfig {
                repo,
                pacing: config.pacing(),
            };
            let built = builder::build_all(&github, &github, &github, &build, &dir).await?;
            info!("All processing complete: {built} project(s) built");
            Ok(())
        }
        Commands::SplitIssue { repo, issue } => {
            let repo = qualify_repo(
                gh_config.owner.as_deref(),
                repo.as_deref().or(gh_config.repo.as_deref()),
            )?;
            let created = split::split_issue(&github, &repo, issue).await?;
            info!("Created {} sub-issue(s)", created.len());
            Ok(())
        }
    }
}

async fn handle_sync(github: &GitHub, config: SyncConfig, file: PathBuf) -> Result<()> {
    let table = tsv::read_file(&file)?;
    let mut sync = Synchronizer::connect(github, github, config).await?;
    let report = sync.run(&table.rows).await;
    if !report.warnings.is_empty() {
        warn!("{} warning(s) during sync", report.warnings.len());
    }
    Ok(())
}
