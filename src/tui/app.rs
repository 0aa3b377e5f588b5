// TUI application state
//
// App owns the lifecycle and the picker and turns key presses into state
// changes. Anything that needs the backend comes back out as a `Request`;
// the event loop runs it on a spawned task and feeds the result in again as
// an `AppEvent`. All mutation happens here, on the UI task.

use super::components::Toast;
use super::modal::{Modal, ModalAction};
use super::theme::Theme;
use crate::api::{ApiError, ChatReply, SimulationSummary, StartedSimulation};
use crate::logging::LogBuffer;
use crate::session::{
    Blocked, Conversation, Lifecycle, PendingSend, Phase, SimulationPicker, Step,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Spinner frames for in-flight work
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Lines moved per PageUp / PageDown
const PAGE: usize = 10;

/// Full-screen views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Chat,
    Simulations,
}

/// Remote work for the event loop to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List simulations to finish resuming this one
    Resume(String),
    Create,
    Send(PendingSend),
    Reset(String),
    /// Listing for the simulations screen
    List,
    /// Opportunistic status refresh when the chat regains focus
    FocusSync(String),
}

impl From<Step> for Request {
    fn from(step: Step) -> Self {
        match step {
            Step::Sync(id) => Request::Resume(id),
            Step::Create => Request::Create,
        }
    }
}

/// Result of a `Request`, tagged with the simulation it was issued for
#[derive(Debug)]
pub enum AppEvent {
    Resumed {
        simulation_id: String,
        result: Result<Vec<SimulationSummary>, ApiError>,
    },
    Created(Result<StartedSimulation, ApiError>),
    Replied {
        simulation_id: String,
        result: Result<ChatReply, ApiError>,
    },
    ResetDone {
        simulation_id: String,
        result: Result<(), ApiError>,
    },
    Listed(Result<Vec<SimulationSummary>, ApiError>),
    FocusSynced {
        simulation_id: String,
        result: Result<Vec<SimulationSummary>, ApiError>,
    },
}

/// Outcome of the global key layer
enum Handled {
    Yes(Option<Request>),
    No,
}

/// Main application state for the TUI
pub struct App {
    pub lifecycle: Lifecycle,
    pub picker: SimulationPicker,
    pub screen: Screen,

    /// Composer contents
    pub input: String,

    /// Transcript lines scrolled back from the bottom (0 = follow)
    pub scroll_back: usize,

    pub modal: Option<Modal>,
    pub toast: Option<Toast>,
    pub log_buffer: LogBuffer,
    pub theme: Theme,
    pub should_quit: bool,

    sync_on_focus: bool,
    frame: usize,
}

impl App {
    pub fn new(lifecycle: Lifecycle, log_buffer: LogBuffer, sync_on_focus: bool) -> Self {
        Self {
            lifecycle,
            picker: SimulationPicker::new(),
            screen: Screen::Chat,
            input: String::new(),
            scroll_back: 0,
            modal: None,
            toast: None,
            log_buffer,
            theme: Theme::default(),
            should_quit: false,
            sync_on_focus,
            frame: 0,
        }
    }

    /// Kick off the lifecycle; returns the first remote call to make
    pub fn start(&mut self) -> Request {
        self.lifecycle.initialize().into()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Animation & toasts
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    pub fn spinner_char(&self) -> char {
        SPINNER[self.frame % SPINNER.len()]
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::info(message));
    }

    fn show_alert(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::alert(message));
    }

    /// Anything outstanding that deserves a spinner
    pub fn is_busy(&self) -> bool {
        self.lifecycle.phase().is_busy()
            || self.picker.is_loading()
            || self
                .lifecycle
                .conversation()
                .is_some_and(|c| c.is_sending() || c.is_resetting())
    }

    /// Why the active simulation can't be left right now, if it can't
    ///
    /// Switching or starting over mid-request would orphan the reply or the
    /// reset, so both wait until the backend has answered.
    fn leave_blocked(&self) -> Option<String> {
        if self.lifecycle.phase().is_busy() {
            return Some("Still connecting...".to_string());
        }
        let conversation = self.lifecycle.conversation()?;
        if conversation.is_sending() {
            Some(Blocked::SendInFlight.to_string())
        } else if conversation.is_resetting() {
            Some(Blocked::ResetInFlight.to_string())
        } else {
            None
        }
    }

    /// Show why leaving is refused; true when it is
    fn refuse_leave(&mut self) -> bool {
        match self.leave_blocked() {
            Some(reason) => {
                self.show_toast(reason);
                true
            }
            None => false,
        }
    }

    fn current_id(&self) -> Option<String> {
        self.lifecycle
            .conversation()
            .map(|c| c.simulation_id().to_string())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keyboard input
    // Layered dispatch: Modal → Global → Screen
    // ─────────────────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Request> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if self.modal.is_some() {
            return self.handle_modal_key(key.code);
        }

        if let Handled::Yes(request) = self.handle_global_key(&key) {
            return request;
        }

        match self.screen {
            Screen::Chat => self.handle_chat_key(&key),
            Screen::Simulations => self.handle_simulations_key(key.code),
        }
    }

    fn handle_modal_key(&mut self, key: KeyCode) -> Option<Request> {
        let modal = self.modal.as_mut()?;
        match modal.handle_input(key) {
            ModalAction::Close => {
                self.modal = None;
                None
            }
            ModalAction::Confirm => {
                let confirmed = self.modal.take()?;
                self.confirm(confirmed)
            }
            ModalAction::None | ModalAction::ScrollUp | ModalAction::ScrollDown => None,
        }
    }

    fn confirm(&mut self, modal: Modal) -> Option<Request> {
        match modal {
            Modal::ConfirmReset => {
                let conversation = self.lifecycle.conversation_mut()?;
                match conversation.begin_reset() {
                    Ok(id) => Some(Request::Reset(id)),
                    Err(blocked) => {
                        self.show_toast(blocked.to_string());
                        None
                    }
                }
            }
            Modal::ConfirmNew { keep_history } => {
                if self.refuse_leave() {
                    return None;
                }
                let step = if keep_history {
                    SimulationPicker::detach(self.lifecycle.session_mut());
                    self.lifecycle.initialize()
                } else {
                    self.lifecycle.start_new()
                };
                self.screen = Screen::Chat;
                self.input.clear();
                self.scroll_back = 0;
                Some(step.into())
            }
            _ => None,
        }
    }

    fn handle_global_key(&mut self, key: &KeyEvent) -> Handled {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                Handled::Yes(None)
            }
            KeyCode::F(1) => {
                self.modal = Some(Modal::help());
                Handled::Yes(None)
            }
            KeyCode::Char('l') if ctrl => {
                self.modal = Some(Modal::logs());
                Handled::Yes(None)
            }
            KeyCode::F(2) => {
                self.modal = Some(Modal::logs());
                Handled::Yes(None)
            }
            KeyCode::Tab => Handled::Yes(self.toggle_screen()),
            KeyCode::Char('n') if ctrl => {
                if !self.refuse_leave() {
                    self.modal = Some(Modal::ConfirmNew {
                        keep_history: self.screen == Screen::Simulations,
                    });
                }
                Handled::Yes(None)
            }
            KeyCode::Char('t') if ctrl => {
                if self.screen == Screen::Chat
                    && self.lifecycle.phase() == Phase::Ready
                    && self.lifecycle.conversation().is_some()
                {
                    self.modal = Some(Modal::ConfirmReset);
                }
                Handled::Yes(None)
            }
            _ => Handled::No,
        }
    }

    fn toggle_screen(&mut self) -> Option<Request> {
        match self.screen {
            Screen::Chat => self.open_simulations(),
            Screen::Simulations => self.back_to_chat(),
        }
    }

    fn open_simulations(&mut self) -> Option<Request> {
        self.screen = Screen::Simulations;
        self.picker.begin_load();
        Some(Request::List)
    }

    fn back_to_chat(&mut self) -> Option<Request> {
        self.screen = Screen::Chat;
        if self.sync_on_focus && self.lifecycle.phase() == Phase::Ready {
            self.current_id().map(Request::FocusSync)
        } else {
            None
        }
    }

    fn handle_chat_key(&mut self, key: &KeyEvent) -> Option<Request> {
        if self.lifecycle.phase() == Phase::Error {
            return match key.code {
                KeyCode::Enter | KeyCode::Char('r') => Some(self.lifecycle.start_new().into()),
                _ => None,
            };
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);

        match key.code {
            KeyCode::Char(c) if plain => {
                let open = self
                    .lifecycle
                    .conversation()
                    .is_some_and(|conversation| !conversation.status().is_broken());
                if open {
                    self.input.push(c);
                }
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Esc => {
                self.input.clear();
                None
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Up => {
                self.scroll_back = self.scroll_back.saturating_add(1);
                None
            }
            KeyCode::Down => {
                self.scroll_back = self.scroll_back.saturating_sub(1);
                None
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(PAGE);
                None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(PAGE);
                None
            }
            KeyCode::End => {
                self.scroll_back = 0;
                None
            }
            _ => None,
        }
    }

    fn submit(&mut self) -> Option<Request> {
        if self.lifecycle.phase() != Phase::Ready {
            self.show_toast("Still connecting...");
            return None;
        }
        let conversation = self.lifecycle.conversation_mut()?;

        match conversation.begin_send(&self.input) {
            Ok(pending) => {
                self.input.clear();
                self.scroll_back = 0;
                Some(Request::Send(pending))
            }
            Err(Blocked::BlankInput) => None,
            Err(blocked) => {
                self.show_toast(blocked.to_string());
                None
            }
        }
    }

    fn handle_simulations_key(&mut self, key: KeyCode) -> Option<Request> {
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                self.picker.select_next();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.picker.select_previous();
                None
            }
            KeyCode::Char('r') => {
                self.picker.begin_load();
                Some(Request::List)
            }
            KeyCode::Char('n') => {
                if !self.refuse_leave() {
                    self.modal = Some(Modal::ConfirmNew { keep_history: true });
                }
                None
            }
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Esc => self.back_to_chat(),
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            _ => None,
        }
    }

    fn activate_selected(&mut self) -> Option<Request> {
        let chosen = self.picker.selected()?.id.clone();
        if self.current_id().as_deref() == Some(chosen.as_str()) {
            return self.back_to_chat();
        }
        if self.refuse_leave() {
            return None;
        }

        self.picker.activate(self.lifecycle.session_mut())?;
        self.screen = Screen::Chat;
        self.input.clear();
        self.scroll_back = 0;
        Some(self.lifecycle.initialize().into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote results
    // ─────────────────────────────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Resumed {
                simulation_id,
                result,
            } => self.lifecycle.on_synced(&simulation_id, result),

            AppEvent::Created(result) => {
                self.lifecycle.on_created(result);
                if let Some(conversation) = self.lifecycle.conversation() {
                    if self.lifecycle.phase() == Phase::Ready {
                        tracing::debug!("New persona in {}", conversation.simulation_id());
                        self.scroll_back = 0;
                    }
                }
            }

            AppEvent::Replied {
                simulation_id,
                result,
            } => {
                let Some(conversation) = self.conversation_for(&simulation_id) else {
                    tracing::debug!("Dropping reply for inactive simulation {}", simulation_id);
                    return;
                };
                let outcome = conversation.complete_send(result);
                self.scroll_back = 0;
                if let Some(name) = outcome.calibrated_as {
                    self.show_toast(format!("Calibration complete: {}", name));
                }
                if outcome.broke {
                    self.show_alert("Connection severed");
                }
                if outcome.error.as_ref().is_some_and(ApiError::is_network) {
                    self.show_alert("Server unreachable");
                }
            }

            AppEvent::ResetDone {
                simulation_id,
                result,
            } => {
                let Some(conversation) = self.conversation_for(&simulation_id) else {
                    tracing::debug!("Dropping reset for inactive simulation {}", simulation_id);
                    return;
                };
                match conversation.complete_reset(result) {
                    Ok(()) => {
                        self.scroll_back = 0;
                        self.show_toast("Timeline reset");
                    }
                    Err(e) => {
                        self.modal = Some(Modal::ResetFailed(format!(
                            "Could not connect to the Time Machine.\n\n{}",
                            e
                        )));
                    }
                }
            }

            AppEvent::Listed(result) => {
                let current = self.current_id();
                self.picker.on_listed(result, current.as_deref());
            }

            AppEvent::FocusSynced {
                simulation_id,
                result,
            } => {
                if self.lifecycle.phase() != Phase::Ready {
                    return;
                }
                let Some(conversation) = self.conversation_for(&simulation_id) else {
                    return;
                };
                match result {
                    Ok(simulations) => {
                        conversation.apply_sync(&simulations);
                    }
                    Err(e) => tracing::debug!("Focus sync failed: {}", e),
                }
            }
        }
    }

    fn conversation_for(&mut self, simulation_id: &str) -> Option<&mut Conversation> {
        self.lifecycle
            .conversation_mut()
            .filter(|c| c.simulation_id() == simulation_id)
    }
}
