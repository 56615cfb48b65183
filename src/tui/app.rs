use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Instant;

use anyhow::{Result, bail};
use ratatui::DefaultTerminal;

use crate::config::Config;
use crate::provider::{ProviderError, ProviderResult, TaskProvider};
use crate::store::{Store, Task, TaskStatus};
use crate::vcs::{self, Vcs, Worktree};

use super::event::{self, AppEvent};
use super::form::{Field, Form, SelectOption, Value, non_empty};
use super::key_state::KeyState;
use super::keymap::{ActionContext, ActionId, ActionRegistry};
use super::keys::Key;
use super::page::{Navigator, Page};
use super::theme::Theme;
use super::ui;

// ── Status messages ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
    Prompt,
}

#[derive(Debug, Clone)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
    /// Only successes expire; everything else stays until replaced or cleared.
    expires_at: Option<Instant>,
}

impl Status {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// ── Background job results ───────────────────────────────────────────

/// Completion of a background job, applied at the start of the next tick.
enum Message {
    Worktrees(Result<Vec<Worktree>, String>),
    Added {
        branch: String,
        result: Result<Vec<Worktree>, String>,
    },
    WorktreeRemoved {
        worktree: Worktree,
        result: Result<(), String>,
    },
    /// `Ok` carries the remote deletion error, if only that step failed.
    BranchDeleted {
        worktree: Worktree,
        result: Result<Option<String>, String>,
    },
    Task {
        id: String,
        result: ProviderResult<Task>,
    },
    TasksRefreshed(Vec<(String, ProviderResult<Task>)>),
    ListRefreshed {
        list: String,
        result: ProviderResult<Vec<Task>>,
    },
    TaskUpdated {
        id: String,
        result: ProviderResult<Task>,
    },
    Statuses {
        list_id: String,
        result: ProviderResult<Vec<TaskStatus>>,
    },
    Outcome(Result<String, String>),
    Fatal(String),
}

// ── Application state ────────────────────────────────────────────────

pub struct App {
    pub config: Config,
    store: Store,
    vcs: Arc<dyn Vcs>,
    provider: Arc<dyn TaskProvider>,
    token: Option<String>,

    pub nav: Navigator,
    pub keys: KeyState,
    pub actions: ActionRegistry,
    pub theme: Theme,

    // Data
    pub worktrees: Vec<Worktree>,
    pub selected: usize,
    /// Task metadata keyed by task id (the worktree name).
    pub tasks: HashMap<String, Task>,
    /// Workflow statuses keyed by list id.
    statuses: HashMap<String, Vec<TaskStatus>>,

    pub status: Option<Status>,
    /// Per-row statuses keyed by worktree name.
    pub row_status: HashMap<String, Status>,

    // Page-scoped forms, reused across visits
    pub add_form: Form,
    pub token_form: Form,
    pub edit_form: Form,

    /// Worktree going through the two-step delete.
    deleting: Option<Worktree>,

    tx: Sender<Message>,
    rx: Receiver<Message>,
    in_flight: usize,
    /// Run-once guard for outstanding requests, e.g. `statuses:<list>`.
    running: HashSet<String>,

    now: Instant,
    fatal: Option<String>,
    pub should_quit: bool,
}

/// Branch names become the worktree directory name, so no spaces or slashes.
fn valid_branch(value: &Value) -> bool {
    matches!(value, Value::Text(text) if !text.is_empty() && !text.contains([' ', '/']))
}

impl App {
    pub fn new(
        config: Config,
        store: Store,
        vcs: Arc<dyn Vcs>,
        provider: Arc<dyn TaskProvider>,
    ) -> Result<Self> {
        let worktrees = vcs::list_worktrees(vcs.as_ref())?;
        let tasks = store.load_tasks()?;
        let statuses = store.load_statuses()?;
        let token = match store.load_token()? {
            Some(token) => Some(token),
            None => std::env::var(&config.token_env)
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        };

        let add_form = Form::new()
            .with(Field::text("branch", 24).validate(valid_branch))
            .with(Field::text("base", 24).validate(non_empty))
            .with(Field::checkbox("push"))
            .with_default("base", Value::Text(config.base_branch.clone()));
        let token_form = Form::new().with(Field::secret("token", 32).validate(non_empty));
        let edit_form = Form::new().with(Field::select("status", 20));

        let (tx, rx) = channel();
        let now = Instant::now();
        let mut app = App {
            keys: KeyState::new(config.key_release()),
            config,
            store,
            vcs,
            provider,
            token,
            nav: Navigator::default(),
            actions: ActionRegistry::default(),
            theme: Theme::default(),
            worktrees,
            selected: 0,
            tasks,
            statuses,
            status: None,
            row_status: HashMap::new(),
            add_form,
            token_form,
            edit_form,
            deleting: None,
            tx,
            rx,
            in_flight: 0,
            running: HashSet::new(),
            now,
            fatal: None,
            should_quit: false,
        };

        if app.token.is_none() {
            let text = format!("missing {}: press t to enter a token", app.config.token_env);
            app.set_status(StatusKind::Error, text);
        }
        tracing::info!(
            worktrees = app.worktrees.len(),
            cached_tasks = app.tasks.len(),
            has_token = app.token.is_some(),
            "app started"
        );
        Ok(app)
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_interval = self.config.frame_interval();

        loop {
            self.tick(Instant::now());
            terminal.draw(|frame| ui::draw(frame, self))?;

            if let AppEvent::Key(key) = event::poll(frame_interval)? {
                self.handle_key(key, Instant::now());
            }

            if self.should_quit {
                break;
            }
        }

        if let Some(message) = self.fatal.take() {
            bail!("background job panicked: {message}");
        }
        Ok(())
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// One frame of state maintenance, run before every draw.
    pub fn tick(&mut self, now: Instant) {
        self.now = now;

        while let Ok(message) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.apply(message);
        }

        self.keys.release_expired(now);
        self.keys.update_key_states();

        match self.nav.current() {
            Page::Add => self.add_form.update(&mut self.keys),
            Page::Token => self.token_form.update(&mut self.keys),
            Page::EditTask => self.edit_form.update(&mut self.keys),
            _ => {}
        }

        self.load_status_options();
        self.actions = ActionRegistry::for_page(self.nav.current(), &self.context());

        if self.status.as_ref().is_some_and(|s| s.expired(now)) {
            self.status = None;
        }
        self.row_status.retain(|_, s| !s.expired(now));
    }

    /// One keystroke: hold it, run list navigation, then dispatch.
    pub fn handle_key(&mut self, key: Key, now: Instant) {
        self.now = now;
        self.keys.press(key, now);

        if self.nav.current().is_browsing() && self.navigate(key) {
            return;
        }

        if let Some(id) = self.actions.dispatch(key) {
            tracing::debug!(?id, page = ?self.nav.current(), "dispatch");
            self.perform(id);
        }
    }

    fn navigate(&mut self, key: Key) -> bool {
        let last = self.worktrees.len().saturating_sub(1);
        match key {
            Key::Up | Key::Char('k') => self.selected = self.selected.saturating_sub(1),
            Key::Down | Key::Char('j') => self.selected = (self.selected + 1).min(last),
            Key::Left | Key::Char('g') => self.selected = 0,
            Key::Right | Key::Char('G') => self.selected = last,
            Key::Esc => self.status = None,
            _ => return false,
        }
        true
    }

    fn context(&self) -> ActionContext {
        let selected = self.selected_worktree();
        ActionContext {
            has_token: self.token.is_some(),
            has_selection: selected.is_some(),
            selected_is_main: selected.is_some_and(|w| w.is_main),
            selected_is_task: selected.is_some_and(|w| self.is_task(w)),
            selected_has_task: selected.is_some_and(|w| self.tasks.contains_key(&w.name())),
            any_task_worktrees: self.worktrees.iter().any(|w| self.is_task(w)),
            form_valid: self.form().is_some_and(Form::is_valid),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn selected_worktree(&self) -> Option<&Worktree> {
        self.worktrees.get(self.selected)
    }

    pub fn is_task(&self, worktree: &Worktree) -> bool {
        !worktree.is_main && vcs::is_task_branch(&worktree.name(), &self.config.reserved_branches)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.selected_worktree()
            .and_then(|w| self.tasks.get(&w.name()))
    }

    /// The form shown on the current page.
    pub fn form(&self) -> Option<&Form> {
        match self.nav.current() {
            Page::Add => Some(&self.add_form),
            Page::Token => Some(&self.token_form),
            Page::EditTask => Some(&self.edit_form),
            _ => None,
        }
    }

    // ── Status helpers ───────────────────────────────────────────────

    fn make_status(&self, kind: StatusKind, text: impl Into<String>) -> Status {
        let expires_at = (kind == StatusKind::Success).then(|| self.now + self.config.status_expiry());
        Status {
            kind,
            text: text.into(),
            expires_at,
        }
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(self.make_status(kind, text));
    }

    fn set_row_status(&mut self, row: &str, kind: StatusKind, text: impl Into<String>) {
        let status = self.make_status(kind, text);
        self.row_status.insert(row.to_string(), status);
    }

    fn log_error(&self, message: &str) {
        if let Err(e) = self.store.log_error(message) {
            tracing::error!("failed to write error log: {e:#}");
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    fn go(&mut self, page: Page) {
        if self.nav.to_page(page) {
            self.token_form.reset();
        }
        self.keys.clear();
    }

    /// Leave a form or menu: back to the remembered page when that is a
    /// browsing page, otherwise to the list.
    fn back(&mut self) {
        match self.nav.previous() {
            Some(Page::Idle | Page::Update) => {
                self.nav.previous_page();
                self.keys.clear();
            }
            _ => self.go(Page::Idle),
        }
    }

    // ── Actions ──────────────────────────────────────────────────────

    fn perform(&mut self, id: ActionId) {
        match id {
            ActionId::Open => self.open_selected(),
            ActionId::Add => {
                self.add_form.reset();
                self.go(Page::Add);
            }
            ActionId::Delete => self.start_delete(),
            ActionId::Update => self.go(Page::Update),
            ActionId::Edit => self.start_edit(),
            ActionId::Token => self.go(Page::Token),
            ActionId::Copy => self.copy_selected(),
            ActionId::Refresh => self.refresh_worktrees(),
            ActionId::UpdateAll => {
                self.update_all();
                self.go(Page::Idle);
            }
            ActionId::UpdateSelected => {
                if let Some(id) = self.selected_worktree().map(Worktree::name) {
                    self.fetch_task(id);
                }
                self.go(Page::Idle);
            }
            ActionId::UpdateList => {
                self.update_list();
                self.go(Page::Idle);
            }
            ActionId::Submit => self.submit(),
            ActionId::Cancel => {
                match self.nav.current() {
                    Page::Add => self.add_form.reset(),
                    Page::Token => self.token_form.reset(),
                    Page::EditTask => self.edit_form.reset(),
                    _ => {}
                }
                self.back();
            }
            ActionId::Yes => self.confirm_delete(),
            ActionId::No => {
                if let Some(worktree) = self.deleting.take() {
                    self.row_status.remove(&worktree.name());
                    // The worktree itself is already gone at the branch step
                    if self.nav.current() == Page::DeleteBranch {
                        self.remove_entry(&worktree.path);
                    }
                }
                self.go(Page::Idle);
            }
            ActionId::Quit => self.should_quit = true,
        }
    }

    fn submit(&mut self) {
        match self.nav.current() {
            Page::Add => self.submit_add(),
            Page::Token => self.submit_token(),
            Page::EditTask => self.submit_edit(),
            _ => {}
        }
    }

    fn open_selected(&mut self) {
        let Some(name) = self.selected_worktree().map(Worktree::name) else {
            return;
        };
        let url = self.config.task_url_for(&name);
        self.set_status(StatusKind::Info, format!("opening {url}…"));
        self.spawn(move || {
            Message::Outcome(
                vcs::open_url(&url)
                    .map(|()| format!("opened {url}"))
                    .map_err(|e| format!("{e:#}")),
            )
        });
    }

    fn copy_selected(&mut self) {
        let Some(branch) = self.selected_worktree().map(Worktree::branch_name) else {
            return;
        };
        self.spawn(move || {
            Message::Outcome(
                vcs::copy_to_clipboard(&branch)
                    .map(|()| format!("copied {branch}"))
                    .map_err(|e| format!("{e:#}")),
            )
        });
    }

    fn refresh_worktrees(&mut self) {
        if !self.running.insert("worktrees".to_string()) {
            return;
        }
        self.set_status(StatusKind::Info, "refreshing worktrees…");
        let vcs = Arc::clone(&self.vcs);
        self.spawn(move || {
            Message::Worktrees(vcs::list_worktrees(vcs.as_ref()).map_err(|e| format!("{e:#}")))
        });
    }

    // ── Add ──────────────────────────────────────────────────────────

    fn submit_add(&mut self) {
        let branch = self.add_form.text("branch").to_string();
        let base = self.add_form.text("base").trim().to_string();
        let push = self.add_form.flag("push");

        let Some(main) = self.worktrees.iter().find(|w| w.is_main) else {
            self.set_status(StatusKind::Error, "no main worktree found");
            return;
        };
        let path = self.config.worktree_path(&main.path, &branch);
        let remote = self.config.remote.clone();

        self.add_form.reset();
        self.go(Page::Idle);
        self.set_status(StatusKind::Info, format!("creating worktree {branch}…"));
        tracing::info!(%branch, %base, push, path = %path.display(), "adding worktree");

        let vcs = Arc::clone(&self.vcs);
        self.spawn(move || {
            let result = (|| {
                vcs::add_worktree(vcs.as_ref(), &path, &branch, &base)?;
                if push {
                    vcs::push_branch(vcs.as_ref(), &remote, &branch)?;
                }
                vcs::list_worktrees(vcs.as_ref())
            })()
            .map_err(|e| format!("{e:#}"));
            Message::Added { branch, result }
        });
    }

    // ── Token ────────────────────────────────────────────────────────

    fn submit_token(&mut self) {
        let token = self.token_form.text("token").trim().to_string();
        self.token_form.reset();
        match self.store.save_token(&token) {
            Ok(()) => {
                tracing::info!("token updated");
                self.token = Some(token);
                self.set_status(StatusKind::Success, "token saved");
                self.go(Page::Idle);
            }
            Err(e) => {
                self.log_error(&format!("failed to save token: {e:#}"));
                self.set_status(StatusKind::Error, format!("{e:#}"));
            }
        }
    }

    // ── Edit task status ─────────────────────────────────────────────

    fn start_edit(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let current = task.status.id.clone();
        let options = self.statuses.get(&task.list.id).cloned().unwrap_or_default();

        self.edit_form.set_options("status", to_options(&options));
        self.edit_form.set_default("status", Value::Choice(Some(current)));
        self.edit_form.reset();
        self.go(Page::EditTask);
    }

    /// Fill the status select once per list; cached lists are reused.
    fn load_status_options(&mut self) {
        if self.nav.current() != Page::EditTask || self.edit_form.has_options("status") {
            return;
        }
        let Some(list_id) = self.selected_task().map(|t| t.list.id.clone()) else {
            return;
        };
        if let Some(cached) = self.statuses.get(&list_id) {
            if cached.is_empty() {
                self.set_status(StatusKind::Error, format!("list {list_id} has no statuses"));
                self.back();
            } else {
                let options = to_options(cached);
                self.edit_form.set_options("status", options);
            }
            return;
        }
        let Some(token) = self.token.clone() else {
            return;
        };
        if !self.running.insert(format!("statuses:{list_id}")) {
            return;
        }
        let provider = Arc::clone(&self.provider);
        self.spawn(move || {
            let result = provider.get_statuses(&token, &list_id);
            Message::Statuses { list_id, result }
        });
    }

    fn submit_edit(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let id = task.id.clone();
        let choice = self.edit_form.choice("status").map(str::to_string);
        let status = self
            .statuses
            .get(&task.list.id)
            .and_then(|list| list.iter().find(|s| Some(&s.id) == choice.as_ref()))
            .cloned();
        let (Some(status), Some(token)) = (status, self.token.clone()) else {
            self.set_status(StatusKind::Error, "no status selected");
            return;
        };

        self.edit_form.reset();
        self.go(Page::Idle);
        self.set_row_status(&id, StatusKind::Info, format!("setting status to {}…", status.label));

        let provider = Arc::clone(&self.provider);
        self.spawn(move || {
            let result = provider
                .update_task(&token, &id, &status)
                .and_then(|()| provider.get_task(&token, &id));
            Message::TaskUpdated { id, result }
        });
    }

    // ── Task refresh ─────────────────────────────────────────────────

    fn fetch_task(&mut self, id: String) {
        let Some(token) = self.token.clone() else {
            return;
        };
        self.set_row_status(&id, StatusKind::Info, "fetching…");
        let provider = Arc::clone(&self.provider);
        self.spawn(move || {
            let result = provider.get_task(&token, &id);
            Message::Task { id, result }
        });
    }

    /// Fetch every task-linked worktree concurrently; one aggregate completion.
    fn update_all(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };
        let ids: Vec<String> = self
            .worktrees
            .iter()
            .filter(|w| self.is_task(w))
            .map(Worktree::name)
            .collect();
        for id in &ids {
            self.set_row_status(id, StatusKind::Info, "fetching…");
        }
        self.set_status(StatusKind::Info, format!("updating {} tasks…", ids.len()));

        let provider = Arc::clone(&self.provider);
        self.spawn(move || {
            let results: Vec<(String, ProviderResult<Task>)> = thread::scope(|s| {
                let handles: Vec<_> = ids
                    .iter()
                    .map(|id| {
                        let provider = &provider;
                        let token = &token;
                        s.spawn(move || (id.clone(), provider.get_task(token, id)))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|p| panic::resume_unwind(p)))
                    .collect()
            });
            Message::TasksRefreshed(results)
        });
    }

    fn update_list(&mut self) {
        let (Some(task), Some(token)) = (self.selected_task(), self.token.clone()) else {
            return;
        };
        let list = task.list.clone();
        self.set_status(StatusKind::Info, format!("updating list {}…", list.name));
        let provider = Arc::clone(&self.provider);
        self.spawn(move || {
            let result = provider.get_task_list(&token, &list.id);
            Message::ListRefreshed {
                list: list.name,
                result,
            }
        });
    }

    // ── Delete ───────────────────────────────────────────────────────

    fn start_delete(&mut self) {
        let Some(worktree) = self.selected_worktree().cloned() else {
            return;
        };
        self.set_row_status(&worktree.name(), StatusKind::Prompt, "are you sure?");
        self.deleting = Some(worktree);
        self.go(Page::DeleteWorktree);
    }

    fn confirm_delete(&mut self) {
        let Some(worktree) = self.deleting.clone() else {
            self.go(Page::Idle);
            return;
        };
        let name = worktree.name();
        let vcs = Arc::clone(&self.vcs);

        match self.nav.current() {
            Page::DeleteWorktree => {
                if !self.running.insert(format!("remove:{name}")) {
                    return;
                }
                self.set_row_status(&name, StatusKind::Info, "removing worktree…");
                self.spawn(move || {
                    let result =
                        vcs::remove_worktree(vcs.as_ref(), &worktree.path).map_err(|e| format!("{e:#}"));
                    Message::WorktreeRemoved { worktree, result }
                });
            }
            Page::DeleteBranch => {
                if !self.running.insert(format!("delete-branch:{name}")) {
                    return;
                }
                let remote = self.config.remote.clone();
                self.set_row_status(&name, StatusKind::Info, "deleting branch…");
                self.spawn(move || {
                    let branch = worktree.branch_name();
                    let result = vcs::delete_branch(vcs.as_ref(), &branch)
                        .map(|()| {
                            vcs::delete_remote_branch(vcs.as_ref(), &remote, &branch)
                                .err()
                                .map(|e| format!("{e:#}"))
                        })
                        .map_err(|e| format!("{e:#}"));
                    Message::BranchDeleted { worktree, result }
                });
            }
            _ => {}
        }
    }

    fn is_deleting(&self, path: &Path) -> bool {
        self.deleting.as_ref().is_some_and(|d| d.path == path)
    }

    /// Drop a row, keeping the cursor on the same worktree when it survives.
    fn remove_entry(&mut self, path: &Path) {
        let keep = self.selected_worktree().map(|w| w.path.clone());
        self.worktrees.retain(|w| w.path != path);
        self.selected = keep
            .and_then(|p| self.worktrees.iter().position(|w| w.path == p))
            .unwrap_or(self.selected)
            .min(self.worktrees.len().saturating_sub(1));
    }

    // ── Background jobs ──────────────────────────────────────────────

    /// Run `job` on a worker thread; its message is applied on a later tick.
    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> Message + Send + 'static,
    {
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let message = panic::catch_unwind(AssertUnwindSafe(job))
                .unwrap_or_else(|payload| Message::Fatal(panic_text(payload.as_ref())));
            let _ = tx.send(message);
        });
    }

    fn apply(&mut self, message: Message) {
        match message {
            Message::Worktrees(result) => {
                self.running.remove("worktrees");
                match result {
                    Ok(worktrees) => {
                        self.set_worktrees(worktrees);
                        self.set_status(StatusKind::Success, "worktrees refreshed");
                    }
                    Err(e) => self.set_status(StatusKind::Error, e),
                }
            }
            Message::Added { branch, result } => match result {
                Ok(worktrees) => {
                    self.set_worktrees(worktrees);
                    if let Some(i) = self.worktrees.iter().position(|w| w.name() == branch) {
                        self.selected = i;
                    }
                    self.set_status(StatusKind::Success, format!("created {branch}"));
                    let linked = self
                        .selected_worktree()
                        .is_some_and(|w| w.name() == branch && self.is_task(w));
                    if linked {
                        self.fetch_task(branch);
                    }
                }
                Err(e) => {
                    tracing::warn!(%branch, "add worktree failed: {e}");
                    self.set_status(StatusKind::Error, e);
                }
            },
            Message::WorktreeRemoved { worktree, result } => {
                let name = worktree.name();
                self.running.remove(&format!("remove:{name}"));
                // Only the confirmation for this worktree may advance or close
                let confirming = self.nav.current() == Page::DeleteWorktree
                    && self.is_deleting(&worktree.path);
                match result {
                    Ok(()) if confirming => {
                        self.set_row_status(&name, StatusKind::Prompt, "delete branch too? are you sure?");
                        self.deleting = Some(worktree);
                        self.go(Page::DeleteBranch);
                    }
                    Ok(()) => {
                        self.row_status.remove(&name);
                        self.remove_entry(&worktree.path);
                        self.set_status(StatusKind::Success, format!("removed {name}"));
                    }
                    Err(e) => {
                        tracing::warn!(%name, "remove worktree failed: {e}");
                        self.set_row_status(&name, StatusKind::Error, e);
                        if confirming {
                            self.deleting = None;
                            self.go(Page::Idle);
                        }
                    }
                }
            }
            Message::BranchDeleted { worktree, result } => {
                let name = worktree.name();
                let branch = worktree.branch_name();
                self.running.remove(&format!("delete-branch:{name}"));
                self.row_status.remove(&name);
                self.remove_entry(&worktree.path);
                match result {
                    Ok(None) => self.set_status(StatusKind::Success, format!("deleted {branch}")),
                    Ok(Some(remote)) => self.set_status(
                        StatusKind::Error,
                        format!("deleted {branch} locally; remote: {remote}"),
                    ),
                    Err(e) => self.set_status(StatusKind::Error, e),
                }
                if self.is_deleting(&worktree.path) {
                    self.deleting = None;
                    if self.nav.current() == Page::DeleteBranch {
                        self.go(Page::Idle);
                    }
                }
            }
            Message::Task { id, result } => match result {
                Ok(task) => {
                    self.tasks.insert(id.clone(), task);
                    self.persist_tasks();
                    self.set_row_status(&id, StatusKind::Success, "updated");
                }
                Err(e) => self.provider_failed(Some(&id), e),
            },
            Message::TasksRefreshed(results) => {
                let total = results.len();
                let mut failed = 0;
                for (id, result) in results {
                    match result {
                        Ok(task) => {
                            self.tasks.insert(id.clone(), task);
                            self.row_status.remove(&id);
                        }
                        Err(e) => {
                            failed += 1;
                            self.provider_failed(Some(&id), e);
                        }
                    }
                }
                if failed < total {
                    self.persist_tasks();
                }
                if failed == 0 {
                    self.set_status(StatusKind::Success, format!("updated {total} tasks"));
                } else {
                    tracing::warn!(failed, total, "task refresh incomplete");
                    self.set_status(StatusKind::Error, "unable to update tasks");
                }
            }
            Message::ListRefreshed { list, result } => match result {
                Ok(tasks) => {
                    let names: HashSet<String> = self.worktrees.iter().map(Worktree::name).collect();
                    let mut count = 0;
                    for task in tasks.into_iter().filter(|t| names.contains(&t.id)) {
                        self.tasks.insert(task.id.clone(), task);
                        count += 1;
                    }
                    self.persist_tasks();
                    self.set_status(StatusKind::Success, format!("updated {count} tasks from {list}"));
                }
                Err(e) => self.provider_failed(None, e),
            },
            Message::TaskUpdated { id, result } => match result {
                Ok(task) => {
                    let label = task.status.label.clone();
                    self.tasks.insert(id.clone(), task);
                    self.persist_tasks();
                    self.set_row_status(&id, StatusKind::Success, format!("status set to {label}"));
                }
                Err(e) => self.provider_failed(Some(&id), e),
            },
            Message::Statuses { list_id, result } => {
                self.running.remove(&format!("statuses:{list_id}"));
                self.apply_statuses(list_id, result);
            }
            Message::Outcome(Ok(text)) => self.set_status(StatusKind::Success, text),
            Message::Outcome(Err(e)) => self.set_status(StatusKind::Error, e),
            Message::Fatal(text) => {
                tracing::error!("background job panicked: {text}");
                self.fatal = Some(text);
                self.should_quit = true;
            }
        }
    }

    /// Cache a loaded status list; a failure leaves the list uncached so the
    /// next visit retries.
    fn apply_statuses(&mut self, list_id: String, result: ProviderResult<Vec<TaskStatus>>) {
        match result {
            Ok(statuses) => {
                let selected_list = self.selected_task().map(|t| t.list.id.clone());
                if self.nav.current() == Page::EditTask
                    && selected_list.as_ref() == Some(&list_id)
                    && !statuses.is_empty()
                {
                    self.edit_form.set_options("status", to_options(&statuses));
                }
                self.statuses.insert(list_id, statuses);
                if let Err(e) = self.store.save_statuses(&self.statuses) {
                    tracing::warn!("failed to persist statuses: {e:#}");
                }
            }
            Err(e) => self.provider_failed(None, e),
        }
    }

    fn set_worktrees(&mut self, worktrees: Vec<Worktree>) {
        self.worktrees = worktrees;
        self.selected = self.selected.min(self.worktrees.len().saturating_sub(1));
    }

    fn persist_tasks(&mut self) {
        if let Err(e) = self.store.save_tasks(&self.tasks) {
            self.log_error(&format!("failed to persist tasks: {e:#}"));
            self.set_status(StatusKind::Error, format!("{e:#}"));
        }
    }

    fn provider_failed(&mut self, row: Option<&str>, err: ProviderError) {
        tracing::warn!(row, "provider call failed: {err}");
        let text = match &err {
            ProviderError::InvalidResponse { payload, reason } => {
                self.log_error(&format!("invalid response ({reason}): {payload}"));
                "invalid response".to_string()
            }
            other => other.to_string(),
        };
        if err.is_credential() {
            self.set_status(StatusKind::Error, format!("{text}: enter a new token"));
            self.go(Page::Token);
        }
        match row {
            Some(row) => self.set_row_status(row, StatusKind::Error, text),
            None if !err.is_credential() => self.set_status(StatusKind::Error, text),
            None => {}
        }
    }

    #[cfg(test)]
    fn settle(&mut self) {
        while self.in_flight > 0 {
            let message = self
                .rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("background job finished");
            self.in_flight -= 1;
            self.apply(message);
        }
        self.tick(self.now);
    }
}

fn to_options(statuses: &[TaskStatus]) -> Vec<SelectOption> {
    statuses
        .iter()
        .map(|s| SelectOption {
            id: s.id.clone(),
            label: s.label.clone(),
        })
        .collect()
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
