// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, remote results)
// - Running backend calls off the UI task

pub mod app;
pub mod components;
pub mod modal;
pub mod theme;
pub mod views;

use crate::api::SimulationApi;
use crate::config::Config;
use crate::logging::LogBuffer;
use crate::session::Lifecycle;
use anyhow::{Context, Result};
use app::{App, AppEvent, Request};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run the TUI
///
/// Sets up the terminal, runs the event loop until the user quits, and
/// restores the terminal even if the loop failed.
pub async fn run_tui<A: SimulationApi>(
    config: &Config,
    api: A,
    lifecycle: Lifecycle,
    log_buffer: LogBuffer,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(lifecycle, log_buffer, config.sync_on_focus);
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    let result = run_event_loop(&mut terminal, &mut app, api, tick_rate).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// Waits on three sources with tokio::select!:
/// 1. Keyboard input, which may produce a remote request
/// 2. Timer ticks (spinner frames, toast expiry)
/// 3. Results of remote requests spawned earlier
async fn run_event_loop<A: SimulationApi>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    api: A,
    tick_rate: Duration,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tick_interval = tokio::time::interval(tick_rate);

    dispatch(&api, &tx, app.start());

    loop {
        terminal
            .draw(|f| views::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            request = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key_event)) = event::read() {
                        return app.handle_key(key_event);
                    }
                }
                None
            } => {
                if let Some(request) = request {
                    dispatch(&api, &tx, request);
                }
            }

            _ = tick_interval.tick() => {
                app.tick();
            }

            Some(event) = rx.recv() => {
                app.handle_event(event);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run `request` on its own task and post the result back to the loop
///
/// A send error only means the loop has already exited.
fn dispatch<A: SimulationApi>(api: &A, tx: &mpsc::UnboundedSender<AppEvent>, request: Request) {
    tracing::debug!("Dispatching {:?}", request);
    let api = api.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let event = match request {
            Request::Resume(simulation_id) => AppEvent::Resumed {
                result: api.list_simulations().await,
                simulation_id,
            },
            Request::Create => AppEvent::Created(api.start_chat().await),
            Request::Send(pending) => AppEvent::Replied {
                result: api
                    .send_message(&pending.simulation_id, &pending.text)
                    .await,
                simulation_id: pending.simulation_id,
            },
            Request::Reset(simulation_id) => AppEvent::ResetDone {
                result: api.reset_simulation(&simulation_id).await,
                simulation_id,
            },
            Request::List => AppEvent::Listed(api.list_simulations().await),
            Request::FocusSync(simulation_id) => AppEvent::FocusSynced {
                result: api.list_simulations().await,
                simulation_id,
            },
        };
        let _ = tx.send(event);
    });
}
