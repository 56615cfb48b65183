use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Environment variable read for the ClickUp token when none is persisted.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Base URL of the ClickUp REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Browser URL for a task. `{id}` is replaced with the task id.
    #[serde(default = "default_task_url")]
    pub task_url: String,

    /// Redraws per second. Clamped to 24..=60.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u64,

    /// How long a key counts as held after it arrives. Terminals send no key-up.
    #[serde(default = "default_key_release_ms")]
    pub key_release_ms: u64,

    /// Lifetime of success status messages.
    #[serde(default = "default_status_expiry_ms")]
    pub status_expiry_ms: u64,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Substrings marking a branch as not linked to a task.
    #[serde(default = "default_reserved_branches")]
    pub reserved_branches: Vec<String>,

    /// Parent directory for new worktrees. Defaults to the main worktree's parent.
    #[serde(default)]
    pub worktree_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token_env: default_token_env(),
            api_url: default_api_url(),
            task_url: default_task_url(),
            frame_rate: default_frame_rate(),
            key_release_ms: default_key_release_ms(),
            status_expiry_ms: default_status_expiry_ms(),
            remote: default_remote(),
            base_branch: default_base_branch(),
            reserved_branches: default_reserved_branches(),
            worktree_dir: None,
        }
    }
}

fn default_token_env() -> String {
    "CLICKUP_TOKEN".to_string()
}

fn default_api_url() -> String {
    "https://api.clickup.com/api/v2".to_string()
}

fn default_task_url() -> String {
    "https://app.clickup.com/t/{id}".to_string()
}

fn default_frame_rate() -> u64 {
    30
}

fn default_key_release_ms() -> u64 {
    100
}

fn default_status_expiry_ms() -> u64 {
    3000
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_reserved_branches() -> Vec<String> {
    ["main", "master", "develop", "staging", "release", "hotfix"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.frame_rate.clamp(24, 60))
    }

    pub fn key_release(&self) -> Duration {
        Duration::from_millis(self.key_release_ms)
    }

    pub fn status_expiry(&self) -> Duration {
        Duration::from_millis(self.status_expiry_ms)
    }

    pub fn task_url_for(&self, id: &str) -> String {
        self.task_url.replace("{id}", id)
    }

    /// Directory a new worktree for `branch` is created in.
    pub fn worktree_path(&self, main_worktree: &Path, branch: &str) -> PathBuf {
        let parent = match self.worktree_dir {
            Some(ref dir) => PathBuf::from(dir),
            None => main_worktree
                .parent()
                .map_or_else(|| main_worktree.to_path_buf(), Path::to_path_buf),
        };
        parent.join(branch)
    }
}

/// Returns the base worktask directory: ~/.worktask/
pub fn base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".worktask"))
}

/// Returns the path to the tracing log written while the TUI owns the terminal
pub fn log_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("worktask.log"))
}

/// Ensure all required directories exist
pub fn ensure_dirs() -> Result<()> {
    let base = base_dir()?;
    fs::create_dir_all(&base).context("failed to create ~/.worktask/")?;
    Ok(())
}

/// Load config from ~/.worktask/config.toml (or return defaults if it doesn't exist)
pub fn load() -> Result<Config> {
    load_from(&base_dir()?.join("config.toml"))
}

pub fn load_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}
