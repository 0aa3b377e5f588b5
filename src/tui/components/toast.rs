// Toast component
//
// Short-lived notices over the chat: calibration results, refused keys,
// and alerts when the relationship breaks or the backend is unreachable.
// Alerts stay up longer and take the broken colour.

use super::wrap;
use crate::tui::theme::Theme;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

/// Widest a toast grows before its text wraps
const MAX_WIDTH: u16 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Alert,
}

impl Tone {
    fn lifetime(self) -> Duration {
        match self {
            Self::Info => Duration::from_secs(3),
            Self::Alert => Duration::from_secs(6),
        }
    }
}

#[derive(Debug)]
pub struct Toast {
    pub message: String,
    pub tone: Tone,
    shown_at: Instant,
    lifetime: Duration,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_tone(message, Tone::Info)
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self::with_tone(message, Tone::Alert)
    }

    fn with_tone(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
            shown_at: Instant::now(),
            lifetime: tone.lifetime(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= self.lifetime
    }

    /// Draw in the lower right of `area`, clear of the composer and status bar
    pub fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let width = MAX_WIDTH.min(area.width.saturating_sub(4));
        if width < 5 {
            return;
        }
        let lines = wrap(&self.message, width.saturating_sub(4) as usize);
        let text_width = lines
            .iter()
            .map(|l| l.width())
            .max()
            .unwrap_or(0) as u16;
        let width = (text_width + 4).min(width);
        let height = lines.len() as u16 + 2;

        // Composer (3) and status bar (1) sit below
        let x = area.right().saturating_sub(width + 2);
        let y = area.bottom().saturating_sub(height + 4);
        let toast_area = Rect::new(x, y, width, height).intersection(area);

        let (accent, text_style) = match self.tone {
            Tone::Info => (theme.highlight, Style::default().fg(theme.foreground)),
            Tone::Alert => (
                theme.broken,
                Style::default()
                    .fg(theme.broken)
                    .add_modifier(Modifier::BOLD),
            ),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(theme.background));

        let text = Paragraph::new(lines.join("\n"))
            .alignment(Alignment::Center)
            .style(text_style)
            .block(block);

        f.render_widget(Clear, toast_area);
        f.render_widget(text, toast_area);
    }
}
