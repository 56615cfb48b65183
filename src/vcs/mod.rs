use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

static TASK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("task id regex is valid"));

/// Runs git commands against one repository.
///
/// Implementations return stdout on success and an error carrying the
/// command's stderr otherwise.
pub trait Vcs: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String>;
}

/// The real executor: shells out to the `git` binary.
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        GitCli { repo: repo.into() }
    }
}

impl Vcs for GitCli {
    fn run(&self, args: &[&str]) -> Result<String> {
        let repo_str = self
            .repo
            .to_str()
            .context("repo path contains invalid UTF-8")?;
        let output = Command::new("git")
            .arg("-C")
            .arg(repo_str)
            .args(args)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A worktree of the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// Checked-out branch, `None` when detached.
    pub branch: Option<String>,
    pub is_main: bool,
}

impl Worktree {
    /// The trailing path component, which names the task branch.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The branch to delete alongside this worktree.
    pub fn branch_name(&self) -> String {
        self.branch.clone().unwrap_or_else(|| self.name())
    }
}

/// Whether a branch name looks like a task id: alphanumeric and not one of
/// the reserved non-task names.
pub fn is_task_branch(name: &str, reserved: &[String]) -> bool {
    if !TASK_ID_RE.is_match(name) {
        return false;
    }
    let lower = name.to_lowercase();
    !reserved
        .iter()
        .any(|r| !r.is_empty() && lower.contains(&r.to_lowercase()))
}

/// Parse `git worktree list --porcelain`. The first entry is the main worktree.
pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            current = Some(Worktree {
                path: PathBuf::from(path),
                branch: None,
                is_main: worktrees.is_empty(),
            });
        } else if let Some(branch) = line.strip_prefix("branch ")
            && let Some(wt) = current.as_mut()
        {
            let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
            wt.branch = Some(branch.to_string());
        }
    }
    if let Some(wt) = current {
        worktrees.push(wt);
    }
    worktrees
}

pub fn list_worktrees(vcs: &dyn Vcs) -> Result<Vec<Worktree>> {
    let output = vcs.run(&["worktree", "list", "--porcelain"])?;
    Ok(parse_worktree_list(&output))
}

/// Create a worktree on a new branch off `base`, or check out `branch` if it already exists.
pub fn add_worktree(vcs: &dyn Vcs, path: &Path, branch: &str, base: &str) -> Result<()> {
    let wt_str = path
        .to_str()
        .context("worktree path contains invalid UTF-8")?;
    if vcs
        .run(&["worktree", "add", "-b", branch, wt_str, base])
        .is_ok()
    {
        return Ok(());
    }
    // Branch might already exist, try without -b
    vcs.run(&["worktree", "add", wt_str, branch])?;
    Ok(())
}

pub fn remove_worktree(vcs: &dyn Vcs, path: &Path) -> Result<()> {
    let wt_str = path
        .to_str()
        .context("worktree path contains invalid UTF-8")?;
    vcs.run(&["worktree", "remove", wt_str])?;
    Ok(())
}

pub fn delete_branch(vcs: &dyn Vcs, branch: &str) -> Result<()> {
    vcs.run(&["branch", "-D", branch])?;
    Ok(())
}

pub fn delete_remote_branch(vcs: &dyn Vcs, remote: &str, branch: &str) -> Result<()> {
    vcs.run(&["push", remote, "--delete", branch])?;
    Ok(())
}

pub fn push_branch(vcs: &dyn Vcs, remote: &str, branch: &str) -> Result<()> {
    vcs.run(&["push", "-u", remote, branch])?;
    Ok(())
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(text.to_string())
        .context("failed to copy to clipboard")?;
    Ok(())
}

pub fn open_url(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let status = Command::new(opener)
        .arg(url)
        .status()
        .with_context(|| format!("failed to run {opener}"))?;
    if !status.success() {
        bail!("{opener} exited with status {}", status.code().unwrap_or(-1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserved() -> Vec<String> {
        crate::config::Config::default().reserved_branches
    }

    const PORCELAIN: &str = "worktree /src/repo
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main

worktree /src/86a1b2c3
HEAD 2222222222222222222222222222222222222222
branch refs/heads/86a1b2c3

worktree /src/scratch
HEAD 3333333333333333333333333333333333333333
detached
";

    #[test]
    fn parse_porcelain_marks_main_and_branches() {
        let wts = parse_worktree_list(PORCELAIN);
        assert_eq!(wts.len(), 3);
        assert!(wts[0].is_main);
        assert!(!wts[1].is_main);
        assert_eq!(wts[1].branch.as_deref(), Some("86a1b2c3"));
        assert_eq!(wts[2].branch, None);
        assert_eq!(wts[2].branch_name(), "scratch");
    }

    #[test]
    fn parse_empty_output() {
        assert!(parse_worktree_list("").is_empty());
    }

    #[test]
    fn name_is_trailing_path_component() {
        let wt = Worktree {
            path: PathBuf::from("/src/repo/abc123"),
            branch: Some("feature/abc123".into()),
            is_main: false,
        };
        assert_eq!(wt.name(), "abc123");
        assert_eq!(wt.branch_name(), "feature/abc123");
    }

    #[test]
    fn task_branch_detection() {
        let reserved = reserved();
        assert!(is_task_branch("86a1b2c3", &reserved));
        assert!(is_task_branch("ABC123", &reserved));
        assert!(!is_task_branch("main", &reserved));
        assert!(!is_task_branch("Master", &reserved));
        assert!(!is_task_branch("releasev2", &reserved));
        assert!(!is_task_branch("fix-login", &reserved));
        assert!(!is_task_branch("", &reserved));
    }

    #[test]
    fn add_worktree_falls_back_to_existing_branch() {
        let vcs = crate::test_support::FakeVcs::new();
        vcs.fail_when("-b");
        add_worktree(&vcs, Path::new("/src/abc1"), "abc1", "main").unwrap();
        let calls = vcs.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], "worktree add /src/abc1 abc1");
    }

    #[test]
    fn remove_worktree_surfaces_error_text() {
        let vcs = crate::test_support::FakeVcs::new();
        vcs.fail_when("worktree remove");
        let err = remove_worktree(&vcs, Path::new("/src/abc1")).unwrap_err();
        assert!(err.to_string().contains("worktree remove"));
    }
}
