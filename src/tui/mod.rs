mod app;
mod event;
pub mod form;
pub mod key_state;
pub mod keymap;
pub mod keys;
pub mod page;
mod theme;
mod ui;

pub use app::App;

use anyhow::Result;

/// Take over the terminal, run the app until it quits, then restore the terminal.
pub fn run(app: &mut App) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
