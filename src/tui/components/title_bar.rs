// Title bar component
//
// App name, then the current persona with relationship status and trust
// score. A spinner shows while anything is in flight.

use crate::session::Phase;
use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = vec![Span::styled(
        " ♥ nomi",
        Style::default()
            .fg(theme.title)
            .add_modifier(Modifier::BOLD),
    )];

    match (app.lifecycle.phase(), app.lifecycle.conversation()) {
        (Phase::Creating, _) => {
            spans.push(Span::styled(
                " ──── calibrating a new persona",
                Style::default().fg(theme.muted),
            ));
        }
        (Phase::Error, _) => {
            spans.push(Span::styled(
                " ──── offline",
                Style::default().fg(theme.broken),
            ));
        }
        (_, Some(conversation)) => {
            let status = conversation.status();
            let status_label = if status.is_broken() {
                status.label()
            } else {
                "Online"
            };
            spans.push(Span::styled(" ──── ", Style::default().fg(theme.muted)));
            spans.push(Span::styled(
                conversation.persona_name().to_string(),
                Style::default()
                    .fg(theme.persona)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(" · ", Style::default().fg(theme.muted)));
            spans.push(Span::styled(
                status_label,
                Style::default().fg(theme.status_color(status)),
            ));
            spans.push(Span::styled(
                format!(" · trust {}", conversation.score()),
                Style::default().fg(theme.muted),
            ));
            if !conversation.is_calibrated() {
                spans.push(Span::styled(
                    " · calibrating",
                    Style::default().fg(theme.calibrating),
                ));
            }
        }
        (_, None) => {}
    }

    if app.is_busy() {
        spans.push(Span::styled(
            format!(" {}", app.spinner_char()),
            Style::default().fg(theme.highlight),
        ));
    }

    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.title))
            .title_top(Line::from(" F1 help ").right_aligned()),
    );

    f.render_widget(title, area);
}
