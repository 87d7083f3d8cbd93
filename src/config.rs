use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pause between remote writes when nothing else is configured.
pub const DEFAULT_PACING_MS: u64 = 1000;
pub const DEFAULT_TSV_DIR: &str = "TSV_HERE";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub projects: ProjectsSection,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GitHubConfig {
    pub owner: Option<String>,
    /// Repository as `owner/name`.
    pub repo: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SyncSection {
    pub issue_column: Option<String>,
    pub pacing_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProjectsSection {
    pub tsv_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.sync.pacing_ms.unwrap_or(DEFAULT_PACING_MS))
    }

    pub fn tsv_dir(&self) -> PathBuf {
        self.projects
            .tsv_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TSV_DIR))
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".boardsync")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}
