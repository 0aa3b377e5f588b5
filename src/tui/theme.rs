// Theme for the TUI
//
// One fixed palette. Colors are named by what they mark on screen rather
// than by hue.

use ratatui::style::Color;
use ratatui::widgets::BorderType;

/// Colors and border style used by every component
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub border_type: BorderType,
    pub title: Color,
    pub highlight: Color,
    pub status_bar: Color,

    // Selection in lists
    pub selection: Color,
    pub selection_fg: Color,

    // Transcript
    pub user: Color,
    pub persona: Color,
    pub system: Color,

    // Relationship state
    pub online: Color,
    pub broken: Color,
    pub calibrating: Color,

    // Log levels
    pub log_error: Color,
    pub log_warn: Color,
    pub log_info: Color,
    pub log_debug: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            foreground: Color::White,
            muted: Color::DarkGray,
            border: Color::Gray,
            border_type: BorderType::Rounded,
            title: Color::Magenta,
            highlight: Color::LightMagenta,
            status_bar: Color::Gray,

            selection: Color::DarkGray,
            selection_fg: Color::Yellow,

            user: Color::Cyan,
            persona: Color::LightMagenta,
            system: Color::Yellow,

            online: Color::Green,
            broken: Color::Red,
            calibrating: Color::Yellow,

            log_error: Color::Red,
            log_warn: Color::Yellow,
            log_info: Color::Blue,
            log_debug: Color::DarkGray,
        }
    }
}

impl Theme {
    /// Color for a simulation status label
    pub fn status_color(&self, status: crate::session::SimulationStatus) -> Color {
        use crate::session::SimulationStatus;
        match status {
            SimulationStatus::Broken => self.broken,
            SimulationStatus::Calibrating => self.calibrating,
            SimulationStatus::Archived => self.muted,
            SimulationStatus::Active | SimulationStatus::Unknown => self.online,
        }
    }

    pub fn log_color(&self, level: crate::logging::LogLevel) -> Color {
        use crate::logging::LogLevel;
        match level {
            LogLevel::Error => self.log_error,
            LogLevel::Warn => self.log_warn,
            LogLevel::Info => self.log_info,
            LogLevel::Debug | LogLevel::Trace => self.log_debug,
        }
    }
}
