//! Remote client for the simulation backend
//!
//! # Architecture
//!
//! ```text
//! SimulationApi trait
//! ├── HttpClient (reqwest, production)
//! └── FakeApi    (scripted, tests only)
//! ```
//!
//! Every operation resolves to `Result<_, ApiError>`. Callers only need to
//! tell "never reached the server" apart from "server said no"; decoding
//! problems are reported separately so they show up clearly in logs.

mod http;
pub mod models;

pub use http::HttpClient;
pub use models::{
    ChatReply, Diagnostics, Genesis, OracleScene, ServerConfig, SimulationSummary,
    StartedSimulation, VibeAnalysis,
};

use std::fmt;
use std::future::Future;

/// Default request timeout; persona generation can take well over a minute
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors surfaced by the remote client
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No response reached us (connection refused, DNS, timeout)
    Network(String),
    /// The server answered with a non-2xx status
    Server { status: u16, body: Option<String> },
    /// The server answered 2xx but the body wasn't what we expected
    Decode(String),
}

impl ApiError {
    /// True when the request never got an answer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Server { status, body } => match body {
                Some(body) => write!(f, "Server rejected request ({}): {}", status, body),
                None => write!(f, "Server rejected request ({})", status),
            },
            Self::Decode(msg) => write!(f, "Unexpected response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Operations the client performs against the backend
///
/// Futures are `Send` so the TUI can run calls on spawned tasks while it
/// keeps drawing.
pub trait SimulationApi: Clone + Send + Sync + 'static {
    /// `POST /chat/start` - create a simulation in calibration mode
    fn start_chat(&self) -> impl Future<Output = Result<StartedSimulation, ApiError>> + Send;

    /// `POST /chat/message` - one chat turn
    fn send_message(
        &self,
        simulation_id: &str,
        user_message: &str,
    ) -> impl Future<Output = Result<ChatReply, ApiError>> + Send;

    /// `GET /simulations/list`
    fn list_simulations(
        &self,
    ) -> impl Future<Output = Result<Vec<SimulationSummary>, ApiError>> + Send;

    /// `POST /simulations/reset` - the time machine
    fn reset_simulation(
        &self,
        simulation_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /oracle/init` (legacy onboarding)
    fn oracle_init(&self) -> impl Future<Output = Result<OracleScene, ApiError>> + Send;

    /// `POST /oracle/analyze` (legacy onboarding)
    fn oracle_analyze(
        &self,
        scenario: &str,
        user_reaction: &str,
    ) -> impl Future<Output = Result<VibeAnalysis, ApiError>> + Send;

    /// `POST /foundry/genesis` (legacy onboarding)
    fn foundry_genesis(
        &self,
        user_vibe: &serde_json::Value,
    ) -> impl Future<Output = Result<Genesis, ApiError>> + Send;

    /// `GET /system/diagnostics`
    fn diagnostics(&self) -> impl Future<Output = Result<Diagnostics, ApiError>> + Send;

    /// `GET /system/config`
    fn server_config(&self) -> impl Future<Output = Result<ServerConfig, ApiError>> + Send;
}

#[cfg(test)]
pub(crate) mod fake;
