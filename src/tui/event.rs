use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};

use super::keys::Key;

pub enum AppEvent {
    Key(Key),
    Tick,
}

/// Wait up to `timeout` for a key. Anything that is not a recognised key
/// press (resizes, releases, unmapped keys) becomes a `Tick`.
pub fn poll(timeout: Duration) -> Result<AppEvent> {
    if event::poll(timeout)?
        && let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
        && let Some(key) = Key::from_event(key)
    {
        return Ok(AppEvent::Key(key));
    }
    Ok(AppEvent::Tick)
}
