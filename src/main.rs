// nomi - terminal client for Project Nomi relationship simulations
//
// Talks to the Nomi backend over HTTP and keeps the transcript and the
// current simulation pointer in a local store, so a conversation survives
// restarts.
//
// Architecture:
// - API (reqwest): typed client for the backend's REST endpoints
// - Session: lifecycle (resume or create), chat turns, reset, switching
// - Storage (SQLite): key-value persistence for the session and transcripts
// - TUI (ratatui): interactive chat; remote calls run on spawned tasks
// - Commands: one-shot subcommands and a line-based chat for scripting

mod api;
mod cli;
mod commands;
mod config;
mod logging;
mod session;
mod storage;
mod tui;

use anyhow::{Context, Result};
use api::HttpClient;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Headless;
use config::Config;
use logging::LogBuffer;
use session::Lifecycle;
use std::time::Duration;
use storage::{ChatHistoryStore, SessionContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config subcommands run before anything touches the store or the network
    if let Some(Commands::Config {
        show,
        reset,
        edit,
        path,
    }) = cli.command
    {
        cli::handle_config(show, reset, edit, path);
        return Ok(());
    }

    Config::ensure_config_exists();
    let config = Config::from_env();

    // The TUI only runs without a subcommand; everything else logs to stderr
    let interactive = cli.command.is_none() && config.enable_tui;
    let log_buffer = LogBuffer::new();
    let _log_guard = logging::init(&config.logging, interactive, &log_buffer);

    tracing::info!("nomi {} starting (backend {})", config::VERSION, config.api_url);

    let store = storage::open_store(&config.data_dir);
    let api = HttpClient::new(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to create the backend client")?;
    tracing::debug!("Backend client ready for {}", api.base_url());

    if interactive {
        let lifecycle = Lifecycle::new(
            SessionContext::load(store.clone()),
            ChatHistoryStore::new(store),
        );
        return tui::run_tui(&config, api, lifecycle, log_buffer).await;
    }

    let stdin = std::io::stdin();
    let mut headless = Headless {
        config: &config,
        api: &api,
        store,
        input: stdin.lock(),
        out: std::io::stdout(),
    };

    match cli.command {
        Some(command) => headless.run(command).await,
        None => headless.chat().await,
    }
}
