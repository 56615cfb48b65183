use super::keys::Key;
use super::page::Page;

// ── Actions ──────────────────────────────────────────────────────────

/// Every operation a key press can trigger.
///
/// Actions are identifiers only; `App::perform` decides what happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    // Worktree list
    Open,
    Add,
    Delete,
    Update,
    Edit,
    Token,
    Copy,
    Refresh,

    // Update menu
    UpdateAll,
    UpdateSelected,
    UpdateList,

    // Forms and confirmations
    Submit,
    Cancel,
    Yes,
    No,

    // Global
    Quit,
}

/// A single entry of the live action list.
#[derive(Debug, Clone)]
pub struct Action {
    pub id: ActionId,
    /// Hint bar text; unique within a page.
    pub label: &'static str,
    pub shortcuts: Vec<Key>,
    /// Hidden actions are left out of the hint bar but still dispatch.
    pub hidden: bool,
    /// Disabled actions never dispatch.
    pub disabled: bool,
}

impl Action {
    /// New action whose shortcut is the first character of its label.
    pub fn new(id: ActionId, label: &'static str) -> Self {
        Action {
            id,
            label,
            shortcuts: label.chars().next().map(Key::Char).into_iter().collect(),
            hidden: false,
            disabled: false,
        }
    }

    pub fn keys(mut self, keys: &[Key]) -> Self {
        self.shortcuts = keys.to_vec();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled_if(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn matches(&self, key: Key) -> bool {
        !self.disabled && self.shortcuts.contains(&key)
    }
}

/// Facts about the app an action table needs to decide enablement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionContext {
    pub has_token: bool,
    pub has_selection: bool,
    pub selected_is_main: bool,
    /// Selected worktree's name looks like a task id.
    pub selected_is_task: bool,
    /// Task metadata for the selected worktree is cached.
    pub selected_has_task: bool,
    pub any_task_worktrees: bool,
    pub form_valid: bool,
}

// ── Registry ─────────────────────────────────────────────────────────

/// The actions live on the current page, rebuilt every frame.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Vec<Action>,
}

impl ActionRegistry {
    /// Build the live list for `page`: the page table, then the global defaults.
    pub fn for_page(page: Page, ctx: &ActionContext) -> Self {
        let mut registry = ActionRegistry::default();
        for action in page_actions(page, ctx) {
            registry.register(action);
        }
        for action in default_actions(page) {
            registry.register(action);
        }
        registry
    }

    /// Append an action. Returns `false` (and registers nothing) if the label is taken.
    pub fn register(&mut self, action: Action) -> bool {
        if self.actions.iter().any(|a| a.label == action.label) {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Resolve a key to at most one action: the first enabled registration
    /// whose shortcuts contain the key.
    pub fn dispatch(&self, key: Key) -> Option<ActionId> {
        self.actions.iter().find(|a| a.matches(key)).map(|a| a.id)
    }

    /// Visible `(key label, action label, disabled)` triples for the hint bar.
    pub fn hints(&self) -> Vec<(String, &'static str, bool)> {
        self.actions
            .iter()
            .filter(|a| !a.hidden)
            .map(|a| {
                let key = a.shortcuts.first().map(|k| k.label()).unwrap_or_default();
                (key, a.label, a.disabled)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ── Page tables ──────────────────────────────────────────────────────

fn page_actions(page: Page, ctx: &ActionContext) -> Vec<Action> {
    use ActionId as A;

    match page {
        Page::Idle => vec![
            Action::new(A::Open, "open")
                .keys(&[Key::Enter])
                .hidden()
                .disabled_if(!ctx.selected_is_task),
            Action::new(A::Add, "add"),
            Action::new(A::Delete, "delete")
                .disabled_if(!ctx.has_selection || ctx.selected_is_main),
            Action::new(A::Update, "update").disabled_if(!ctx.has_token),
            Action::new(A::Edit, "edit status")
                .disabled_if(!ctx.has_token || !ctx.selected_has_task),
            Action::new(A::Token, "token"),
            Action::new(A::Copy, "copy branch").disabled_if(!ctx.has_selection),
            Action::new(A::Refresh, "refresh"),
        ],
        Page::Update => vec![
            Action::new(A::UpdateAll, "all").disabled_if(!ctx.any_task_worktrees),
            Action::new(A::UpdateSelected, "selected").disabled_if(!ctx.selected_is_task),
            Action::new(A::UpdateList, "list").disabled_if(!ctx.selected_has_task),
            Action::new(A::Cancel, "back").keys(&[Key::Esc]),
        ],
        Page::Add | Page::Token | Page::EditTask => vec![
            Action::new(A::Submit, "submit")
                .keys(&[Key::Enter])
                .disabled_if(!ctx.form_valid),
            Action::new(A::Cancel, "cancel").keys(&[Key::Esc]),
        ],
        Page::DeleteWorktree | Page::DeleteBranch => vec![
            Action::new(A::Yes, "yes").hidden(),
            Action::new(A::No, "no").keys(&[Key::Char('n'), Key::Esc]).hidden(),
        ],
    }
}

fn default_actions(page: Page) -> Vec<Action> {
    vec![
        // `q` would be typed into a field on text-entry pages
        Action::new(ActionId::Quit, "quit").disabled_if(page.is_text_entry()),
        Action::new(ActionId::Quit, "interrupt")
            .keys(&[Key::CtrlC])
            .hidden(),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn full_ctx() -> ActionContext {
        ActionContext {
            has_token: true,
            has_selection: true,
            selected_is_main: false,
            selected_is_task: true,
            selected_has_task: true,
            any_task_worktrees: true,
            form_valid: true,
        }
    }

    #[test]
    fn shortcut_defaults_to_first_letter() {
        let action = Action::new(ActionId::Add, "add");
        assert_eq!(action.shortcuts, vec![Key::Char('a')]);
    }

    #[test]
    fn earlier_registration_wins_on_shared_shortcut() {
        let mut reg = ActionRegistry::default();
        reg.register(Action::new(ActionId::Yes, "first").keys(&[Key::Char('x')]));
        reg.register(Action::new(ActionId::No, "second").keys(&[Key::Char('x')]));

        let mut calls = Vec::new();
        for _ in 0..3 {
            if let Some(id) = reg.dispatch(Key::Char('x')) {
                calls.push(id);
            }
        }
        assert_eq!(calls, vec![ActionId::Yes; 3]);
    }

    #[test]
    fn disabled_action_falls_through() {
        let mut reg = ActionRegistry::default();
        reg.register(
            Action::new(ActionId::Yes, "first")
                .keys(&[Key::Char('x')])
                .disabled_if(true),
        );
        reg.register(Action::new(ActionId::No, "second").keys(&[Key::Char('x')]));
        assert_eq!(reg.dispatch(Key::Char('x')), Some(ActionId::No));
    }

    #[test]
    fn disabled_only_match_is_noop() {
        let mut reg = ActionRegistry::default();
        reg.register(Action::new(ActionId::Yes, "yes").disabled_if(true));
        assert_eq!(reg.dispatch(Key::Char('y')), None);
    }

    #[test]
    fn hidden_actions_dispatch_but_are_not_hinted() {
        let reg = ActionRegistry::for_page(Page::DeleteWorktree, &full_ctx());
        assert_eq!(reg.dispatch(Key::Char('y')), Some(ActionId::Yes));
        assert_eq!(reg.dispatch(Key::Esc), Some(ActionId::No));
        assert!(reg.hints().iter().all(|(_, label, _)| *label != "yes"));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut reg = ActionRegistry::default();
        assert!(reg.register(Action::new(ActionId::Add, "add")));
        assert!(!reg.register(Action::new(ActionId::Copy, "add")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn quit_is_appended_on_every_page() {
        for page in [Page::Idle, Page::Update, Page::DeleteBranch] {
            let reg = ActionRegistry::for_page(page, &full_ctx());
            assert_eq!(reg.dispatch(Key::Char('q')), Some(ActionId::Quit));
        }
    }

    #[test]
    fn q_does_not_quit_while_typing() {
        let reg = ActionRegistry::for_page(Page::Add, &full_ctx());
        assert_eq!(reg.dispatch(Key::Char('q')), None);
        assert_eq!(reg.dispatch(Key::CtrlC), Some(ActionId::Quit));
    }

    #[test]
    fn without_token_only_token_entry_is_remote_enabled() {
        let ctx = ActionContext {
            has_token: false,
            ..full_ctx()
        };
        let reg = ActionRegistry::for_page(Page::Idle, &ctx);
        assert_eq!(reg.dispatch(Key::Char('u')), None);
        assert_eq!(reg.dispatch(Key::Char('e')), None);
        assert_eq!(reg.dispatch(Key::Char('t')), Some(ActionId::Token));
    }

    #[test]
    fn invalid_form_blocks_submit() {
        let ctx = ActionContext {
            form_valid: false,
            ..full_ctx()
        };
        let reg = ActionRegistry::for_page(Page::Token, &ctx);
        assert_eq!(reg.dispatch(Key::Enter), None);
        assert_eq!(reg.dispatch(Key::Esc), Some(ActionId::Cancel));
    }

    #[test]
    fn idle_mnemonics() {
        let reg = ActionRegistry::for_page(Page::Idle, &full_ctx());
        assert_eq!(reg.dispatch(Key::Char('a')), Some(ActionId::Add));
        assert_eq!(reg.dispatch(Key::Char('d')), Some(ActionId::Delete));
        assert_eq!(reg.dispatch(Key::Char('e')), Some(ActionId::Edit));
        assert_eq!(reg.dispatch(Key::Char('c')), Some(ActionId::Copy));
        assert_eq!(reg.dispatch(Key::Enter), Some(ActionId::Open));
    }
}
