// Modal system for TUI overlays
//
// Self-contained modal dialogs that handle their own input and return actions.
// App just holds Option<Modal>, input routing acts on returned ModalAction.

use crossterm::event::KeyCode;

/// Actions returned by modal input handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalAction {
    /// Input consumed, no state change needed
    None,
    /// Close the modal
    Close,
    /// The user accepted a confirmation
    Confirm,
    /// Scroll content up / down (log overlay)
    ScrollUp,
    ScrollDown,
}

/// Available modal types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    /// Help overlay - shows keyboard shortcuts
    Help,
    /// "Reset Timeline?" confirmation
    ConfirmReset,
    /// "Start a new persona?" confirmation; `keep_history` is true when
    /// coming from the simulations screen, where the old one stays listed
    ConfirmNew { keep_history: bool },
    /// Blocking notice after a failed reset
    ResetFailed(String),
    /// Recent log lines, with scroll offset from the newest
    Logs { scroll: usize },
}

impl Modal {
    pub fn help() -> Self {
        Modal::Help
    }

    pub fn logs() -> Self {
        Modal::Logs { scroll: 0 }
    }

    /// Handle keyboard input, return action for caller to execute
    pub fn handle_input(&mut self, key: KeyCode) -> ModalAction {
        match self {
            Modal::Help => match key {
                KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q') | KeyCode::Enter => {
                    ModalAction::Close
                }
                _ => ModalAction::None,
            },
            Modal::ConfirmReset | Modal::ConfirmNew { .. } => match key {
                KeyCode::Char('y') | KeyCode::Char('Y') => ModalAction::Confirm,
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('q') => {
                    ModalAction::Close
                }
                _ => ModalAction::None,
            },
            Modal::ResetFailed(_) => match key {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => ModalAction::Close,
                _ => ModalAction::None,
            },
            Modal::Logs { scroll } => match key {
                KeyCode::Esc | KeyCode::Char('q') => ModalAction::Close,
                KeyCode::Up | KeyCode::Char('k') => {
                    *scroll = scroll.saturating_add(1);
                    ModalAction::ScrollUp
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    *scroll = scroll.saturating_sub(1);
                    ModalAction::ScrollDown
                }
                _ => ModalAction::None,
            },
        }
    }
}
