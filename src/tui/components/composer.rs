// Composer component
//
// The one-line message input. Replaced by a banner while the relationship is
// broken, and by a progress line during a timeline reset.

use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let Some(conversation) = app.lifecycle.conversation() else {
        return;
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border));

    let line = if conversation.status().is_broken() {
        block = block.border_style(Style::default().fg(theme.broken));
        Line::from(Span::styled(
            "CONNECTION SEVERED. Press Ctrl+T to reset the timeline.",
            Style::default()
                .fg(theme.broken)
                .add_modifier(Modifier::BOLD),
        ))
    } else if conversation.is_resetting() {
        Line::from(Span::styled(
            format!("Rewinding the timeline {}", app.spinner_char()),
            Style::default().fg(theme.system),
        ))
    } else {
        let title = if conversation.is_sending() {
            " waiting for reply "
        } else {
            " message "
        };
        block = block.title(Span::styled(title, Style::default().fg(theme.muted)));

        // Keep the cursor in view by showing the tail of long input
        let room = area.width.saturating_sub(3) as usize;
        let mut shown = app.input.as_str();
        while shown.width() > room {
            let mut chars = shown.chars();
            chars.next();
            shown = chars.as_str();
        }

        let cursor = if conversation.can_send() {
            theme.highlight
        } else {
            theme.muted
        };
        Line::from(vec![
            Span::styled(shown.to_string(), Style::default().fg(theme.foreground)),
            Span::styled("█", Style::default().fg(cursor)),
        ])
    };

    f.render_widget(Paragraph::new(line).block(block), area);
}
