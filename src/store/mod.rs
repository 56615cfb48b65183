mod models;

pub use models::*;

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config;

/// One named file holding a single piece of persisted state.
///
/// The backing file (and its directory) is created on first use.
#[derive(Debug, Clone)]
pub struct Slot {
    path: PathBuf,
}

impl Slot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Slot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String> {
        self.ensure_exists()?;
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))
    }

    pub fn write(&self, content: &str) -> Result<()> {
        self.ensure_parent()?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    pub fn append(&self, content: &str) -> Result<()> {
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            self.write("")?;
        }
        Ok(())
    }
}

/// The persisted state of the app: credential, task cache, status cache, error log.
#[derive(Debug, Clone)]
pub struct Store {
    pub token: Slot,
    pub tasks: Slot,
    pub statuses: Slot,
    pub errors: Slot,
}

impl Store {
    pub fn open() -> Result<Self> {
        Ok(Self::at(&config::base_dir()?))
    }

    pub fn at(dir: &Path) -> Self {
        Store {
            token: Slot::new(dir.join("token")),
            tasks: Slot::new(dir.join("tasks.json")),
            statuses: Slot::new(dir.join("statuses.json")),
            errors: Slot::new(dir.join("error.log")),
        }
    }

    pub fn load_token(&self) -> Result<Option<String>> {
        let token = self.token.read()?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.token.write(token.trim())
    }

    /// Cached tasks keyed by task id.
    pub fn load_tasks(&self) -> Result<HashMap<String, Task>> {
        load_json_map(&self.tasks)
    }

    pub fn save_tasks(&self, tasks: &HashMap<String, Task>) -> Result<()> {
        self.tasks.write(&serde_json::to_string_pretty(tasks)?)
    }

    /// Cached status lists keyed by list id.
    pub fn load_statuses(&self) -> Result<HashMap<String, Vec<TaskStatus>>> {
        load_json_map(&self.statuses)
    }

    pub fn save_statuses(&self, statuses: &HashMap<String, Vec<TaskStatus>>) -> Result<()> {
        self.statuses.write(&serde_json::to_string_pretty(statuses)?)
    }

    /// Append a timestamped entry to the error log.
    pub fn log_error(&self, message: &str) -> Result<()> {
        let stamp = chrono::Local::now().to_rfc3339();
        self.errors.append(&format!("{stamp} {message}\n"))
    }
}

fn load_json_map<T: serde::de::DeserializeOwned>(slot: &Slot) -> Result<HashMap<String, T>> {
    let content = slot.read()?;
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    match serde_json::from_str(&content) {
        Ok(map) => Ok(map),
        Err(e) => {
            tracing::warn!("ignoring unreadable cache {}: {}", slot.path().display(), e);
            Ok(HashMap::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task {id}"),
            status: TaskStatus {
                id: "s1".into(),
                label: "to do".into(),
            },
            list: TaskList {
                id: "l1".into(),
                name: "Sprint".into(),
            },
        }
    }

    #[test]
    fn slot_read_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = Slot::new(dir.path().join("nested").join("token"));
        assert_eq!(slot.read().unwrap(), "");
        assert!(slot.path().exists());
    }

    #[test]
    fn slot_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let slot = Slot::new(dir.path().join("log"));
        slot.append("a\n").unwrap();
        slot.append("b\n").unwrap();
        assert_eq!(slot.read().unwrap(), "a\nb\n");
    }

    #[test]
    fn token_is_trimmed_and_empty_means_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());
        assert_eq!(store.load_token().unwrap(), None);
        store.save_token("  pk_123\n").unwrap();
        assert_eq!(store.load_token().unwrap().as_deref(), Some("pk_123"));
    }

    #[test]
    fn tasks_persist_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = HashMap::new();
        tasks.insert("abc1".to_string(), sample_task("abc1"));
        Store::at(dir.path()).save_tasks(&tasks).unwrap();

        let loaded = Store::at(dir.path()).load_tasks().unwrap();
        assert_eq!(loaded.get("abc1"), Some(&sample_task("abc1")));
    }

    #[test]
    fn corrupt_cache_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());
        store.statuses.write("{not json").unwrap();
        assert!(store.load_statuses().unwrap().is_empty());
    }

    #[test]
    fn log_error_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());
        store.log_error("first").unwrap();
        store.log_error("second").unwrap();
        let log = store.errors.read().unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));
    }
}
