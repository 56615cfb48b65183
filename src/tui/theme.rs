use ratatui::style::{Color, Modifier, Style};

use super::app::StatusKind;

/// Semantic colour theme for the entire TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Text ──────────────────────────────────────────────────
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_accent: Color,

    // ── Status messages ───────────────────────────────────────
    pub status_info: Color,
    pub status_success: Color,
    pub status_error: Color,
    pub status_prompt: Color,

    // ── Forms ─────────────────────────────────────────────────
    pub field_invalid: Color,
    pub form_dim: Color,

    // ── Misc ──────────────────────────────────────────────────
    pub selection_indicator: Color,
    pub hint_key: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text_primary: Color::White,
            text_secondary: Color::DarkGray,
            text_accent: Color::Cyan,

            status_info: Color::Cyan,
            status_success: Color::Green,
            status_error: Color::Red,
            status_prompt: Color::Yellow,

            field_invalid: Color::Red,
            form_dim: Color::DarkGray,

            selection_indicator: Color::Cyan,
            hint_key: Color::Cyan,
        }
    }
}

impl Theme {
    pub fn status_style(&self, kind: StatusKind) -> Style {
        let color = match kind {
            StatusKind::Info => self.status_info,
            StatusKind::Success => self.status_success,
            StatusKind::Error => self.status_error,
            StatusKind::Prompt => self.status_prompt,
        };
        Style::default().fg(color)
    }

    /// Style of a form field given its focus and validity.
    pub fn field_style(&self, focused: bool, valid: bool) -> Style {
        let base = if valid {
            Style::default().fg(self.text_primary)
        } else {
            Style::default().fg(self.field_invalid)
        };
        if focused {
            base.add_modifier(Modifier::REVERSED)
        } else {
            base
        }
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.form_dim)
    }

    pub fn accent(&self) -> Style {
        Style::default()
            .fg(self.text_accent)
            .add_modifier(Modifier::BOLD)
    }
}
