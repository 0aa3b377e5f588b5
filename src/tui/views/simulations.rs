// Simulations view
//
// Every simulation the backend knows about, with status and trust score.
// The current one is marked; the highlighted row follows the picker cursor.

use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let picker = &app.picker;

    let title = if picker.is_loading() {
        format!(" Simulations {} ", app.spinner_char())
    } else {
        format!(" Simulations ({}) ", picker.simulations().len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(title, Style::default().fg(theme.title)));

    if let Some(error) = picker.error() {
        let text = vec![
            Line::from(Span::styled(error.to_string(), Style::default().fg(theme.broken))),
            Line::from(Span::styled(
                "Press r to retry.",
                Style::default().fg(theme.muted),
            )),
        ];
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    if picker.simulations().is_empty() {
        let text = if picker.is_loading() {
            "Loading..."
        } else {
            "No simulations yet. Press n to start one."
        };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(theme.muted))).block(block),
            area,
        );
        return;
    }

    let current = app.lifecycle.session().get();
    let items: Vec<ListItem> = picker
        .simulations()
        .iter()
        .map(|sim| {
            let marker = if current == Some(sim.id.as_str()) {
                "● "
            } else {
                "  "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.highlight)),
                Span::styled(
                    format!("{:<20}", sim.display_name()),
                    Style::default()
                        .fg(theme.persona)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:<14}", sim.status.label()),
                    Style::default().fg(theme.status_color(sim.status)),
                ),
                Span::styled(
                    format!("trust {:>5}  ", sim.emotional_bank_account),
                    Style::default().fg(theme.foreground),
                ),
                Span::styled(sim.id.clone(), Style::default().fg(theme.muted)),
            ]))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(theme.selection)
            .fg(theme.selection_fg),
    );

    let mut state = ListState::default().with_selected(Some(picker.selected_index()));
    f.render_stateful_widget(list, area, &mut state);
}
