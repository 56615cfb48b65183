//! Test doubles for the git and task-tracker collaborators.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};

use crate::provider::{ProviderError, ProviderResult, TaskProvider};
use crate::store::{Task, TaskList, TaskStatus};
use crate::vcs::Vcs;

/// Records every git invocation; `worktree list` answers with canned output.
#[derive(Default)]
pub struct FakeVcs {
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    worktrees: Mutex<String>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worktrees(porcelain: &str) -> Self {
        let vcs = Self::new();
        vcs.set_worktrees(porcelain);
        vcs
    }

    pub fn set_worktrees(&self, porcelain: &str) {
        *self.worktrees.lock().unwrap() = porcelain.to_string();
    }

    /// Fail every invocation whose joined arguments contain `needle`.
    pub fn fail_when(&self, needle: &str) {
        self.failing.lock().unwrap().push(needle.to_string());
    }

    /// Invocations so far, arguments joined by spaces.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Vcs for FakeVcs {
    fn run(&self, args: &[&str]) -> Result<String> {
        let line = args.join(" ");
        self.calls.lock().unwrap().push(line.clone());

        if self.failing.lock().unwrap().iter().any(|n| line.contains(n)) {
            bail!(
                "git {} failed: fatal: refusing `{line}`",
                args.first().copied().unwrap_or_default()
            );
        }
        if line.starts_with("worktree list") {
            return Ok(self.worktrees.lock().unwrap().clone());
        }
        Ok(String::new())
    }
}

/// Workflow statuses every fake list carries, in board order.
pub fn statuses() -> Vec<TaskStatus> {
    [("todo", "to do"), ("doing", "in progress"), ("done", "done")]
        .into_iter()
        .map(|(id, label)| TaskStatus {
            id: id.into(),
            label: label.into(),
        })
        .collect()
}

/// A task in `list1`, status "to do".
pub fn task(id: &str, name: &str) -> Task {
    Task {
        id: id.into(),
        name: name.into(),
        status: statuses()[0].clone(),
        list: TaskList {
            id: "list1".into(),
            name: "Sprint".into(),
        },
    }
}

/// In-memory task tracker.
#[derive(Default)]
pub struct FakeProvider {
    tasks: Mutex<HashMap<String, Task>>,
    failing: Mutex<HashSet<String>>,
    garbled: Mutex<HashSet<String>>,
    reject: AtomicBool,
    no_statuses: AtomicBool,
    status_requests: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: Task) -> Self {
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
        self
    }

    /// Answer requests for `id` with a server error.
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Answer requests for `id` with a body that does not parse.
    pub fn garble(&self, id: &str) {
        self.garbled.lock().unwrap().insert(id.to_string());
    }

    /// Treat every token as revoked.
    pub fn reject_tokens(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    /// Report every list as having no workflow statuses.
    pub fn without_statuses(&self) {
        self.no_statuses.store(true, Ordering::SeqCst);
    }

    pub fn status_requests(&self) -> usize {
        self.status_requests.load(Ordering::SeqCst)
    }

    fn check(&self, token: &str, id: &str) -> ProviderResult<()> {
        if token.is_empty() {
            return Err(ProviderError::MissingToken);
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized);
        }
        if self.failing.lock().unwrap().contains(id) {
            return Err(ProviderError::Status(500));
        }
        if self.garbled.lock().unwrap().contains(id) {
            return Err(ProviderError::InvalidResponse {
                payload: "<html>bad gateway</html>".into(),
                reason: "expected value at line 1 column 1".into(),
            });
        }
        Ok(())
    }
}

impl TaskProvider for FakeProvider {
    fn get_task(&self, token: &str, id: &str) -> ProviderResult<Task> {
        self.check(token, id)?;
        self.tasks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(ProviderError::Status(404))
    }

    fn get_task_list(&self, token: &str, list_id: &str) -> ProviderResult<Vec<Task>> {
        self.check(token, list_id)?;
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.list.id == list_id)
            .cloned()
            .collect())
    }

    fn update_task(&self, token: &str, id: &str, status: &TaskStatus) -> ProviderResult<()> {
        self.check(token, id)?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(id).ok_or(ProviderError::Status(404))?;
        task.status = status.clone();
        Ok(())
    }

    fn get_statuses(&self, token: &str, list_id: &str) -> ProviderResult<Vec<TaskStatus>> {
        self.check(token, list_id)?;
        self.status_requests.fetch_add(1, Ordering::SeqCst);
        if self.no_statuses.load(Ordering::SeqCst) {
            return Ok(vec![]);
        }
        Ok(statuses())
    }
}
