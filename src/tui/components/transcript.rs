// Transcript component
//
// Renders the conversation bottom-anchored: the newest line sits on the last
// row unless the user has scrolled back. Lines are pre-wrapped so the scroll
// offset counts screen rows, not messages.

use super::wrap;
use crate::session::{Conversation, MessageKind};
use crate::tui::app::App;
use crate::tui::theme::Theme;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Indent for message bodies under their speaker label
const INDENT: &str = "  ";

/// Render the transcript; returns the largest useful scroll-back offset
pub fn render(f: &mut Frame, area: Rect, app: &App) -> usize {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(area);

    let Some(conversation) = app.lifecycle.conversation() else {
        f.render_widget(block, area);
        return 0;
    };

    let mut lines = layout(conversation, theme, inner.width as usize);
    if conversation.is_typing() {
        lines.push(Line::from(Span::styled(
            format!(
                "{} is typing {}",
                conversation.persona_name(),
                app.spinner_char()
            ),
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let height = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let scroll_back = app.scroll_back.min(max_scroll);
    let end = lines.len() - scroll_back;
    let start = end.saturating_sub(height);

    let title = if scroll_back > 0 {
        format!(" ↑ {} more ", scroll_back)
    } else {
        String::new()
    };

    let visible: Vec<Line> = lines.drain(start..end).collect();
    f.render_widget(
        Paragraph::new(visible).block(block.title_bottom(Line::from(title).right_aligned())),
        area,
    );

    max_scroll
}

/// Flatten the transcript into wrapped screen lines
fn layout(conversation: &Conversation, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let body_width = width.saturating_sub(INDENT.len());
    let mut lines = Vec::new();

    for (i, message) in conversation.messages().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }

        match message.kind {
            MessageKind::System => {
                let style = Style::default()
                    .fg(theme.system)
                    .add_modifier(Modifier::ITALIC);
                for text in wrap(&message.text, width.saturating_sub(2)) {
                    lines.push(Line::from(Span::styled(format!("* {}", text), style)));
                }
            }
            MessageKind::User | MessageKind::Ai => {
                let (label, color) = if message.kind == MessageKind::User {
                    ("you".to_string(), theme.user)
                } else {
                    (conversation.persona_name().to_string(), theme.persona)
                };
                lines.push(Line::from(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )));
                for text in wrap(&message.text, body_width) {
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", INDENT, text),
                        Style::default().fg(theme.foreground),
                    )));
                }
            }
        }
    }

    lines
}
