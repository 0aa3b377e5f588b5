// Status bar component
//
// Key hints for the current screen. A warning or error logged in the last
// half minute replaces the hints so network trouble is visible without
// opening the log overlay.

use crate::session::Phase;
use crate::tui::app::{App, Screen};
use chrono::{Duration, Local};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// How long a logged problem stays in the status bar
const PROBLEM_WINDOW_SECS: i64 = 30;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;

    let recent_problem = app
        .log_buffer
        .latest_problem()
        .filter(|entry| Local::now() - entry.timestamp < Duration::seconds(PROBLEM_WINDOW_SECS));

    let line = match recent_problem {
        Some(entry) => Line::from(vec![
            Span::styled(
                format!(" ⚠ {} ", entry.level.as_str()),
                Style::default().fg(theme.log_color(entry.level)),
            ),
            Span::styled(entry.message, Style::default().fg(theme.foreground)),
            Span::styled("  (Ctrl+L logs)", Style::default().fg(theme.muted)),
        ]),
        None => Line::from(Span::styled(
            hints(app),
            Style::default().fg(theme.status_bar),
        )),
    };

    let status = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.border)),
    );

    f.render_widget(status, area);
}

fn hints(app: &App) -> &'static str {
    match app.screen {
        Screen::Simulations => {
            " ↑↓ select │ Enter open │ n new persona │ r refresh │ Esc back │ q quit"
        }
        Screen::Chat if app.lifecycle.phase() == Phase::Error => {
            " Enter retry │ Ctrl+C quit"
        }
        Screen::Chat => {
            " Enter send │ Tab simulations │ Ctrl+T reset │ Ctrl+N new │ PgUp/PgDn scroll │ Ctrl+C quit"
        }
    }
}
