// Modal overlay rendering
//
// Modals are rendered centered on top of the current screen:
// - Help: keyboard shortcuts
// - Confirmations: reset timeline, start a new persona
// - Reset failed: blocking notice
// - Logs: tail of the in-memory log buffer

use crate::tui::app::App;
use crate::tui::modal::Modal;
use crate::tui::theme::Theme;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Log lines kept in view by the overlay
const LOG_TAIL: usize = 200;

pub fn render(f: &mut Frame, modal: &Modal, app: &App) {
    match modal {
        Modal::Help => render_help(f, &app.theme),
        Modal::ConfirmReset => {
            let name = app
                .lifecycle
                .conversation()
                .map(|c| c.persona_name().to_string())
                .unwrap_or_default();
            render_dialog(
                f,
                &app.theme,
                " Reset Timeline? ",
                &format!(
                    "This will wipe all memories of your relationship. {} will forget \
                     everything that happened. Are you sure?",
                    name
                ),
                "[y] Reset   [n] Cancel",
                app.theme.broken,
            )
        }
        Modal::ConfirmNew { keep_history } => {
            let body = if *keep_history {
                "A new persona will be created. The current simulation stays on the \
                 server and can be opened again from this list."
            } else {
                "A new persona will be created. The current conversation and its local \
                 history will be discarded."
            };
            render_dialog(
                f,
                &app.theme,
                " Start a new persona? ",
                body,
                "[y] Create   [n] Cancel",
                app.theme.highlight,
            )
        }
        Modal::ResetFailed(message) => render_dialog(
            f,
            &app.theme,
            " Reset Failed ",
            message,
            "Press Enter to close",
            app.theme.broken,
        ),
        Modal::Logs { scroll } => render_logs(f, app, *scroll),
    }
}

/// Calculate centered rect for modal dialog
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn render_help(f: &mut Frame, theme: &Theme) {
    let key_style = Style::default().fg(theme.highlight);
    let desc_style = Style::default().fg(theme.foreground);
    let header_style = Style::default()
        .fg(theme.title)
        .add_modifier(Modifier::BOLD);

    let kb = |key: &str, desc: &str| -> Line {
        Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("{:<12}", key), key_style),
            Span::styled(desc.to_string(), desc_style),
        ])
    };

    let content = Text::from(vec![
        Line::raw(""),
        Line::from(Span::styled("  Chat", header_style)),
        kb("Enter", "Send message"),
        kb("Esc", "Clear input"),
        kb("↑/↓ PgUp/Dn", "Scroll transcript"),
        kb("End", "Jump to newest"),
        kb("Ctrl+T", "Reset timeline"),
        kb("Ctrl+N", "Start a new persona"),
        Line::raw(""),
        Line::from(Span::styled("  Simulations", header_style)),
        kb("Tab", "Switch chat / simulations"),
        kb("↑/↓, j/k", "Move selection"),
        kb("Enter", "Open simulation"),
        kb("n", "New persona (keep current)"),
        kb("r", "Refresh list"),
        Line::raw(""),
        Line::from(Span::styled("  General", header_style)),
        kb("F1", "Toggle this help"),
        kb("Ctrl+L, F2", "Show logs"),
        kb("Ctrl+C", "Quit"),
    ]);

    let area = centered_rect(46, 25, f.area());
    f.render_widget(Clear, area);

    let paragraph = Paragraph::new(content)
        .style(Style::default().bg(theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.highlight))
                .border_type(theme.border_type)
                .title(" Help ")
                .title_bottom(Line::from(" Press F1 or Esc to close ").centered()),
        );

    f.render_widget(paragraph, area);
}

fn render_dialog(
    f: &mut Frame,
    theme: &Theme,
    title: &str,
    body: &str,
    footer: &str,
    accent: ratatui::style::Color,
) {
    let area = centered_rect(56, 11, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![Line::raw("")];
    let text_style = Style::default().fg(theme.foreground);
    lines.extend(
        body.split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), text_style))),
    );

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(theme.border_type)
                .border_style(Style::default().fg(accent))
                .title(Span::styled(
                    title.to_string(),
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ))
                .title_bottom(Line::from(format!(" {} ", footer)).centered()),
        );

    f.render_widget(paragraph, area);
}

fn render_logs(f: &mut Frame, app: &App, scroll: usize) {
    let theme = &app.theme;
    let frame_area = f.area();
    let width = (frame_area.width * 90 / 100).max(40);
    let height = (frame_area.height * 80 / 100).max(10);
    let area = centered_rect(width, height, frame_area);
    f.render_widget(Clear, area);

    let entries = app.log_buffer.tail(LOG_TAIL);
    let viewport = area.height.saturating_sub(2) as usize;
    let scroll = scroll.min(entries.len().saturating_sub(viewport));
    let end = entries.len() - scroll;
    let start = end.saturating_sub(viewport);

    let lines: Vec<Line> = entries[start..end]
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    entry.timestamp.format("%H:%M:%S ").to_string(),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    format!("{:<5} ", entry.level.as_str()),
                    Style::default().fg(theme.log_color(entry.level)),
                ),
                Span::styled(
                    format!("{} ", entry.source()),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(theme.foreground)),
            ])
        })
        .collect();

    let body = if lines.is_empty() {
        vec![Line::from(Span::styled(
            "Nothing logged yet.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        lines
    };

    let paragraph = Paragraph::new(body)
        .style(Style::default().bg(theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(theme.border_type)
                .border_style(Style::default().fg(theme.highlight))
                .title(format!(" Logs ({}) ", app.log_buffer.len()))
                .title_bottom(Line::from(" ↑/↓ scroll · Esc close ").centered()),
        );

    f.render_widget(paragraph, area);
}
