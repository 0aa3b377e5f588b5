// Views module - screen-level rendering logic
//
// - Chat: transcript and composer for the current simulation
// - Simulations: remote listing to switch between personas
//
// Shell (title bar, status bar), modal overlay and toast are drawn here for
// every screen.

mod chat;
mod modal;
mod simulations;

use super::app::{App, Screen};
use crate::tui::components;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::Frame;

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &mut App) {
    let bg_block = Block::default().style(Style::default().bg(app.theme.background));
    f.render_widget(bg_block, f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(2),
        ])
        .split(f.area());

    components::title_bar::render(f, chunks[0], app);

    match app.screen {
        Screen::Chat => chat::render(f, chunks[1], app),
        Screen::Simulations => simulations::render(f, chunks[1], app),
    }

    components::status_bar::render(f, chunks[2], app);

    if let Some(overlay) = &app.modal {
        modal::render(f, overlay, app);
    }

    if let Some(toast) = &app.toast {
        toast.render(f, f.area(), &app.theme);
    }
}
