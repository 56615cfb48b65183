/// Top-level UI mode. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Worktree list
    Idle,
    Add,
    Update,
    Token,
    EditTask,
    DeleteWorktree,
    DeleteBranch,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Idle => "Worktrees",
            Page::Add => "New worktree",
            Page::Update => "Update tasks",
            Page::Token => "ClickUp token",
            Page::EditTask => "Task status",
            Page::DeleteWorktree => "Delete worktree",
            Page::DeleteBranch => "Delete branch",
        }
    }

    /// Pages where printable keys go into a text field.
    pub fn is_text_entry(self) -> bool {
        matches!(self, Page::Add | Page::Token)
    }

    /// Pages that browse the worktree list.
    pub fn is_browsing(self) -> bool {
        self == Page::Idle
    }
}

/// Current page plus a single remembered previous page.
///
/// Entering the same page twice loses deeper history; this is a one-slot
/// "back", not a stack.
#[derive(Debug)]
pub struct Navigator {
    current: Page,
    previous: Option<Page>,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator {
            current: Page::Idle,
            previous: None,
        }
    }
}

impl Navigator {
    pub fn current(&self) -> Page {
        self.current
    }

    pub fn previous(&self) -> Option<Page> {
        self.previous
    }

    /// Switch to `page`, remembering the current one.
    ///
    /// Returns `true` when the token page was entered, in which case the
    /// caller must clear the token input.
    pub fn to_page(&mut self, page: Page) -> bool {
        self.previous = Some(self.current);
        self.current = page;
        page == Page::Token
    }

    /// Go back to the remembered page. No-op when nothing is remembered.
    pub fn previous_page(&mut self) -> Option<Page> {
        let page = self.previous.take()?;
        self.previous = Some(self.current);
        self.current = page;
        Some(page)
    }
}
