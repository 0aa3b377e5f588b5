// Chat view
//
// Transcript over composer once a conversation exists. Before that, a
// placeholder for the phase the lifecycle is in.

use crate::session::Phase;
use crate::tui::app::App;
use crate::tui::components::{composer, transcript};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &mut App) {
    let phase = app.lifecycle.phase();

    if phase == Phase::Error || app.lifecycle.conversation().is_none() {
        render_placeholder(f, area, app, phase);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let max_scroll = transcript::render(f, chunks[0], app);
    app.scroll_back = app.scroll_back.min(max_scroll);
    composer::render(f, chunks[1], app);
}

fn render_placeholder(f: &mut Frame, area: Rect, app: &App, phase: Phase) {
    let theme = &app.theme;

    let lines = match phase {
        Phase::Error => vec![
            Line::from(Span::styled(
                app.lifecycle.error().unwrap_or("Something went wrong.").to_string(),
                Style::default()
                    .fg(theme.broken)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Press Enter to try again, Ctrl+C to quit.",
                Style::default().fg(theme.muted),
            )),
        ],
        Phase::Creating => vec![
            Line::from(Span::styled(
                format!("{} Calibrating a new persona...", app.spinner_char()),
                Style::default().fg(theme.calibrating),
            )),
            Line::default(),
            Line::from(Span::styled(
                "The first contact can take a minute.",
                Style::default().fg(theme.muted),
            )),
        ],
        _ => vec![Line::from(Span::styled(
            format!("{} Establishing connection...", app.spinner_char()),
            Style::default().fg(theme.muted),
        ))],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border));

    // Nudge the message toward the middle of the pane
    let pad = (area.height.saturating_sub(2 + lines.len() as u16)) / 2;
    let mut padded = vec![Line::default(); pad as usize];
    padded.extend(lines);

    f.render_widget(
        Paragraph::new(padded)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}
