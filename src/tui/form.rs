use std::collections::HashMap;

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::key_state::KeyState;
use super::keys::Key;
use super::theme::Theme;

// ── Values and field kinds ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Bool(bool),
    /// Id of the selected option.
    Choice(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Free text. `secret` masks rendering, not the stored value.
    Text { secret: bool },
    Checkbox,
    /// Options arrive after construction; empty means still loading.
    Select { options: Vec<SelectOption> },
}

impl FieldKind {
    fn empty_value(&self) -> Value {
        match self {
            FieldKind::Text { .. } => Value::Text(String::new()),
            FieldKind::Checkbox => Value::Bool(false),
            FieldKind::Select { .. } => Value::Choice(None),
        }
    }

    /// Keys this kind reacts to when focused (besides focus movement).
    fn wants_any_key(&self) -> bool {
        matches!(self, FieldKind::Text { .. })
    }

    fn keys(&self) -> &'static [Key] {
        match self {
            FieldKind::Text { .. } => &[],
            FieldKind::Checkbox => &[Key::Space],
            FieldKind::Select { .. } => &[Key::Up, Key::Down, Key::Left, Key::Right],
        }
    }

    /// Apply a key to `value`. Returns whether the value changed.
    fn edit(&self, value: &mut Value, key: Key) -> bool {
        match (self, value) {
            (FieldKind::Text { .. }, Value::Text(text)) => match key {
                Key::Backspace => text.pop().is_some(),
                _ => match key.as_char() {
                    Some(c) if is_text_char(c) => {
                        text.push(c);
                        true
                    }
                    _ => false,
                },
            },
            (FieldKind::Checkbox, Value::Bool(checked)) if key == Key::Space => {
                *checked = !*checked;
                true
            }
            (FieldKind::Select { options }, Value::Choice(choice)) => {
                if options.is_empty() {
                    return false;
                }
                let current = choice
                    .as_deref()
                    .and_then(|id| options.iter().position(|o| o.id == id));
                let next = match (key, current) {
                    (Key::Up | Key::Left, Some(i)) => i.saturating_sub(1),
                    (Key::Down | Key::Right, Some(i)) => (i + 1).min(options.len() - 1),
                    (Key::Up | Key::Left | Key::Down | Key::Right, None) => 0,
                    _ => return false,
                };
                *choice = Some(options[next].id.clone());
                current != Some(next)
            }
            _ => false,
        }
    }
}

/// Characters accepted by text fields: word characters, space, hyphen, slash.
fn is_text_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ' ' | '-' | '/')
}

// ── Field ─────────────────────────────────────────────────────────────

pub type Validator = fn(&Value) -> bool;

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    /// Minimum rendered width of the value.
    pub width: usize,
    pub focused: bool,
    pub valid: bool,
    pub kind: FieldKind,
    value: Value,
    validator: Option<Validator>,
}

impl Field {
    fn new(name: &'static str, width: usize, kind: FieldKind) -> Self {
        let value = kind.empty_value();
        let mut field = Field {
            name,
            width,
            focused: false,
            valid: true,
            kind,
            value,
            validator: None,
        };
        field.revalidate();
        field
    }

    pub fn text(name: &'static str, width: usize) -> Self {
        Self::new(name, width, FieldKind::Text { secret: false })
    }

    pub fn secret(name: &'static str, width: usize) -> Self {
        Self::new(name, width, FieldKind::Text { secret: true })
    }

    pub fn checkbox(name: &'static str) -> Self {
        Self::new(name, 3, FieldKind::Checkbox)
    }

    pub fn select(name: &'static str, width: usize) -> Self {
        Self::new(name, width, FieldKind::Select { options: vec![] })
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self.revalidate();
        self
    }

    fn revalidate(&mut self) {
        self.valid = match self.validator {
            Some(check) => check(&self.value),
            None => match (&self.kind, &self.value) {
                (FieldKind::Select { options }, Value::Choice(choice)) => choice
                    .as_deref()
                    .is_some_and(|id| options.iter().any(|o| o.id == id)),
                _ => true,
            },
        };
    }

    /// The text between the brackets of `name: [value]`.
    pub fn display(&self) -> String {
        let shown = match (&self.kind, &self.value) {
            (FieldKind::Text { secret: true }, Value::Text(text)) => "*".repeat(text.chars().count()),
            (FieldKind::Text { secret: false }, Value::Text(text)) => text.clone(),
            (FieldKind::Checkbox, Value::Bool(checked)) => {
                (if *checked { "x" } else { " " }).to_string()
            }
            (FieldKind::Select { options }, Value::Choice(choice)) => {
                if options.is_empty() {
                    "loading…".to_string()
                } else {
                    choice
                        .as_deref()
                        .and_then(|id| options.iter().find(|o| o.id == id))
                        .map_or_else(|| "select…".to_string(), |o| o.label.clone())
                }
            }
            _ => String::new(),
        };
        let shown = if self.focused && matches!(self.kind, FieldKind::Text { .. }) {
            format_with_cursor(&shown, shown.len())
        } else {
            shown
        };
        format!("{shown:<width$}", width = self.width)
    }

    pub fn line(&self, theme: &Theme) -> Line<'static> {
        let label_style = if self.focused {
            theme.accent()
        } else {
            Style::default().fg(theme.text_secondary)
        };
        Line::from(vec![
            Span::styled(format!("{}: ", self.name), label_style),
            Span::styled(
                format!("[{}]", self.display()),
                theme.field_style(self.focused, self.valid),
            ),
        ])
    }
}

// ── Form ──────────────────────────────────────────────────────────────

/// An ordered group of fields with one focus and a single value map.
///
/// The value map is authoritative: key handling edits it, and every
/// `update` pushes it back down into the fields before they render.
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<Field>,
    focus: usize,
    values: HashMap<&'static str, Value>,
    defaults: HashMap<&'static str, Value>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A name already present is ignored; returns whether it was added.
    pub fn add(&mut self, field: Field) -> bool {
        if self.values.contains_key(field.name) {
            return false;
        }
        let value = self
            .defaults
            .get(field.name)
            .cloned()
            .unwrap_or_else(|| field.kind.empty_value());
        self.values.insert(field.name, value);
        self.fields.push(field);
        self.sync();
        true
    }

    pub fn with(mut self, field: Field) -> Self {
        self.add(field);
        self
    }

    /// Declare the value `reset` restores for `name`, and apply it now.
    pub fn with_default(mut self, name: &'static str, value: Value) -> Self {
        self.defaults.insert(name, value.clone());
        if self.values.contains_key(name) {
            self.values.insert(name, value);
            self.sync();
        }
        self
    }

    pub fn set_default(&mut self, name: &'static str, value: Value) {
        self.defaults.insert(name, value);
    }

    /// Clear values back to the declared defaults and focus the first field.
    pub fn reset(&mut self) {
        for field in &self.fields {
            let value = self
                .defaults
                .get(field.name)
                .cloned()
                .unwrap_or_else(|| field.kind.empty_value());
            self.values.insert(field.name, value);
        }
        self.focus = 0;
        self.sync();
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1).min(self.fields.len().saturating_sub(1));
        self.sync();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.saturating_sub(1);
        self.sync();
    }

    /// Consume this frame's keys for the focused field, then push values down.
    pub fn update(&mut self, keys: &mut KeyState) {
        keys.consume_key(Key::Tab, || self.focus_next());
        keys.consume_key(Key::BackTab, || self.focus_prev());

        if let Some(field) = self.fields.get(self.focus) {
            let kind = field.kind.clone();
            let name = field.name;
            if let Some(value) = self.values.get_mut(name) {
                if kind.wants_any_key() {
                    while keys.consume_any_key(|key| {
                        kind.edit(value, key);
                    }) {}
                } else {
                    // Checkboxes and selects step once per press edge
                    for &key in kind.keys() {
                        if keys.just_pressed(key) {
                            keys.consume_key(key, || {
                                kind.edit(value, key);
                            });
                        }
                    }
                }
            }
        }
        self.sync();
    }

    /// Push the value map into the fields and refresh focus/validity.
    fn sync(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            if let Some(value) = self.values.get(field.name) {
                field.value = value.clone();
            }
            field.focused = i == self.focus;
            field.revalidate();
        }
    }

    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(Value::Text(text)) => text,
            _ => "",
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Bool(true)))
    }

    pub fn choice(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::Choice(choice)) => choice.as_deref(),
            _ => None,
        }
    }

    pub fn set_value(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            self.sync();
        }
    }

    /// Fill a select field's options.
    pub fn set_options(&mut self, name: &str, options: Vec<SelectOption>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name)
            && let FieldKind::Select { options: slot } = &mut field.kind
        {
            *slot = options;
        }
        self.sync();
    }

    pub fn has_options(&self, name: &str) -> bool {
        self.fields.iter().any(|f| {
            f.name == name && matches!(&f.kind, FieldKind::Select { options } if !options.is_empty())
        })
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.valid)
    }

    pub fn lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        self.fields.iter().map(|f| f.line(theme)).collect()
    }
}

/// Validator: non-empty text.
pub fn non_empty(value: &Value) -> bool {
    matches!(value, Value::Text(text) if !text.trim().is_empty())
}

// ── Rendering helpers ─────────────────────────────────────────────────

/// Format a text buffer with a visible block cursor at the given position.
pub fn format_with_cursor(buf: &str, cursor: usize) -> String {
    let pos = cursor.min(buf.len());
    let (before, after) = buf.split_at(pos);
    format!("{before}\u{2588}{after}")
}

/// Render a centered modal overlay: `Clear` background, bordered block, returns inner `Rect`.
///
/// Centres a panel of the given `width`×`height` on screen, clamping to available space.
pub fn render_modal(
    frame: &mut Frame,
    title: &str,
    border_color: Style,
    width: u16,
    height: u16,
) -> Rect {
    let area = frame.area();
    let w = width.min(area.width.saturating_sub(4));
    let h = height.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(w)) / 2;
    let y = (area.height.saturating_sub(h)) / 2;
    let panel = Rect::new(x, y, w, h);

    frame.render_widget(Clear, panel);

    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(border_color);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    inner
}

/// Render the hint bar: `key label` pairs, disabled ones dimmed.
pub fn render_hints(frame: &mut Frame, area: Rect, hints: &[(String, &str, bool)], theme: &Theme) {
    let spans: Vec<Span<'_>> = hints
        .iter()
        .flat_map(|(key, desc, disabled)| {
            let (key_style, desc_style) = if *disabled {
                (theme.dim(), theme.dim())
            } else {
                (
                    Style::default().fg(theme.hint_key),
                    Style::default().fg(theme.text_primary),
                )
            };
            [
                Span::styled(format!(" {key}"), key_style),
                Span::styled(format!(" {desc} "), desc_style),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Tests ─────────────────────────────────────────────────────────────
