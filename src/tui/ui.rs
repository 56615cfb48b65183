use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::app::{App, StatusKind};
use super::form::{render_hints, render_modal};
use super::page::Page;

pub fn draw(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(size);

    draw_title(frame, app, outer[0]);
    draw_worktrees(frame, app, outer[1]);
    draw_status(frame, app, outer[2]);
    render_hints(frame, outer[3], &app.actions.hints(), &app.theme);

    match app.nav.current() {
        Page::Add | Page::Token | Page::EditTask => draw_form(frame, app),
        Page::Update => draw_update_menu(frame, app),
        Page::Idle | Page::DeleteWorktree | Page::DeleteBranch => {}
    }
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" worktask ", app.theme.accent()),
        Span::styled(
            format!("{} ", env!("WORKTASK_VERSION")),
            Style::default().fg(app.theme.text_secondary),
        ),
        Span::styled(
            format!("· {}", app.nav.current().title()),
            Style::default().fg(app.theme.text_primary),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn draw_worktrees(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let confirming = matches!(
        app.nav.current(),
        Page::DeleteWorktree | Page::DeleteBranch
    );

    let items: Vec<ListItem> = app
        .worktrees
        .iter()
        .enumerate()
        .map(|(i, wt)| {
            let name = wt.name();
            let selected = i == app.selected;
            let indicator = if selected { "▸ " } else { "  " };
            let name_style = if selected {
                Style::default()
                    .fg(theme.selection_indicator)
                    .add_modifier(Modifier::BOLD)
            } else if wt.is_main || !app.is_task(wt) {
                Style::default().fg(theme.text_secondary)
            } else {
                Style::default().fg(theme.text_primary)
            };

            let mut spans = vec![
                Span::styled(indicator, Style::default().fg(theme.selection_indicator)),
                Span::styled(format!("{name:<16}"), name_style),
            ];

            if let Some(task) = app.tasks.get(&name) {
                spans.push(Span::styled(
                    format!(" [{}]", task.status.label),
                    Style::default().fg(theme.text_accent),
                ));
                spans.push(Span::styled(
                    format!(" {}", task.name),
                    Style::default().fg(theme.text_primary),
                ));
            } else if wt.is_main {
                spans.push(Span::styled(" (main)", theme.dim()));
            }

            if let Some(status) = app.row_status.get(&name) {
                spans.push(Span::styled(
                    format!("  {}", status.text),
                    theme.status_style(status.kind),
                ));
                if confirming && selected && status.kind == StatusKind::Prompt {
                    spans.push(Span::styled(" (y/n)", theme.dim()));
                }
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .title(format!(" Worktrees ({}) ", app.worktrees.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.text_secondary));

    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let Some(status) = &app.status else {
        return;
    };
    let prefix = match status.kind {
        StatusKind::Info => "info",
        StatusKind::Success => "ok",
        StatusKind::Error => "error",
        StatusKind::Prompt => "?",
    };
    let line = Line::from(vec![
        Span::styled(format!(" {prefix}: "), app.theme.status_style(status.kind)),
        Span::styled(status.text.as_str(), Style::default().fg(app.theme.text_primary)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_form(frame: &mut Frame, app: &App) {
    let Some(form) = app.form() else {
        return;
    };
    let height = form.len() as u16 + 4;
    let inner = render_modal(
        frame,
        app.nav.current().title(),
        Style::default().fg(app.theme.text_accent),
        56,
        height,
    );

    let mut lines = form.lines(&app.theme);
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Tab/Shift-Tab: move  Enter: submit  Esc: cancel",
        app.theme.dim(),
    )));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_update_menu(frame: &mut Frame, app: &App) {
    let inner = render_modal(
        frame,
        Page::Update.title(),
        Style::default().fg(app.theme.text_accent),
        44,
        6,
    );
    let lines: Vec<Line> = app
        .actions
        .hints()
        .into_iter()
        .filter(|(_, label, _)| *label != "quit")
        .map(|(key, label, disabled)| {
            let style = if disabled {
                app.theme.dim()
            } else {
                Style::default().fg(app.theme.text_primary)
            };
            Line::from(vec![
                Span::styled(format!(" {key:>3}  "), Style::default().fg(app.theme.hint_key)),
                Span::styled(label, style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
