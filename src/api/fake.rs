//! Scripted in-process backend for tests
//!
//! Responses are queued per operation and consumed in order. Every call is
//! recorded so tests can assert what was (and wasn't) sent.

use super::models::{NewState, SimulationSummary};
use super::{
    ApiError, ChatReply, Diagnostics, Genesis, OracleScene, ServerConfig, SimulationApi,
    StartedSimulation, VibeAnalysis,
};
use crate::session::SimulationStatus;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A recorded remote call
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    StartChat,
    SendMessage { simulation_id: String, text: String },
    ListSimulations,
    Reset(String),
    OracleInit,
    OracleAnalyze { scenario: String, reaction: String },
    FoundryGenesis,
    Diagnostics,
    ServerConfig,
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    starts: VecDeque<Result<StartedSimulation, ApiError>>,
    replies: VecDeque<Result<ChatReply, ApiError>>,
    /// Repeated for every list call; empty list when unset
    listing: Option<Result<Vec<SimulationSummary>, ApiError>>,
    /// Consumed in order; success when exhausted
    resets: VecDeque<Result<(), ApiError>>,
    oracle_scene: Option<Result<OracleScene, ApiError>>,
    vibe: Option<Result<VibeAnalysis, ApiError>>,
    genesis: Option<Result<Genesis, ApiError>>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeApi {
    script: Arc<Mutex<Script>>,
}

fn unscripted(what: &str) -> ApiError {
    ApiError::Network(format!("no scripted response for {}", what))
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub(crate) fn push_start(&self, result: Result<StartedSimulation, ApiError>) -> &Self {
        self.script().starts.push_back(result);
        self
    }

    pub(crate) fn push_reply(&self, result: Result<ChatReply, ApiError>) -> &Self {
        self.script().replies.push_back(result);
        self
    }

    pub(crate) fn set_listing(&self, result: Result<Vec<SimulationSummary>, ApiError>) -> &Self {
        self.script().listing = Some(result);
        self
    }

    pub(crate) fn push_reset(&self, result: Result<(), ApiError>) -> &Self {
        self.script().resets.push_back(result);
        self
    }

    pub(crate) fn set_oracle(
        &self,
        scene: Result<OracleScene, ApiError>,
        vibe: Result<VibeAnalysis, ApiError>,
        genesis: Result<Genesis, ApiError>,
    ) -> &Self {
        let mut script = self.script();
        script.oracle_scene = Some(scene);
        script.vibe = Some(vibe);
        script.genesis = Some(genesis);
        drop(script);
        self
    }

    /// Every call made so far, in order
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.script().calls.iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: Call) -> MutexGuard<'_, Script> {
        let mut script = self.script();
        script.calls.push(call);
        script
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builders for scripted payloads
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn started(id: &str, reply: &str) -> StartedSimulation {
    StartedSimulation {
        simulation_id: id.to_string(),
        reply_text: reply.to_string(),
    }
}

pub(crate) fn reply(text: &str) -> ChatReply {
    ChatReply {
        reply_text: Some(text.to_string()),
        ..Default::default()
    }
}

pub(crate) fn reply_with(text: &str, aside: Option<&str>, score: Option<i64>) -> ChatReply {
    ChatReply {
        reply_text: Some(text.to_string()),
        narrative_bridge: aside.map(str::to_string),
        new_state: score.map(|score| NewState {
            simulation_id: None,
            emotional_bank_account: Some(score),
        }),
        ..Default::default()
    }
}

pub(crate) fn summary(id: &str, name: &str, status: SimulationStatus, score: i64) -> SimulationSummary {
    SimulationSummary {
        id: id.to_string(),
        name: name.to_string(),
        status,
        emotional_bank_account: score,
        is_calibrated: !name.is_empty(),
    }
}

impl SimulationApi for FakeApi {
    async fn start_chat(&self) -> Result<StartedSimulation, ApiError> {
        self.record(Call::StartChat)
            .starts
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("start_chat")))
    }

    async fn send_message(
        &self,
        simulation_id: &str,
        user_message: &str,
    ) -> Result<ChatReply, ApiError> {
        self.record(Call::SendMessage {
            simulation_id: simulation_id.to_string(),
            text: user_message.to_string(),
        })
        .replies
        .pop_front()
        .unwrap_or_else(|| Err(unscripted("send_message")))
    }

    async fn list_simulations(&self) -> Result<Vec<SimulationSummary>, ApiError> {
        self.record(Call::ListSimulations)
            .listing
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn reset_simulation(&self, simulation_id: &str) -> Result<(), ApiError> {
        self.record(Call::Reset(simulation_id.to_string()))
            .resets
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn oracle_init(&self) -> Result<OracleScene, ApiError> {
        self.record(Call::OracleInit)
            .oracle_scene
            .clone()
            .unwrap_or_else(|| Err(unscripted("oracle_init")))
    }

    async fn oracle_analyze(
        &self,
        scenario: &str,
        user_reaction: &str,
    ) -> Result<VibeAnalysis, ApiError> {
        self.record(Call::OracleAnalyze {
            scenario: scenario.to_string(),
            reaction: user_reaction.to_string(),
        })
        .vibe
        .clone()
        .unwrap_or_else(|| Err(unscripted("oracle_analyze")))
    }

    async fn foundry_genesis(&self, _user_vibe: &serde_json::Value) -> Result<Genesis, ApiError> {
        self.record(Call::FoundryGenesis)
            .genesis
            .clone()
            .unwrap_or_else(|| Err(unscripted("foundry_genesis")))
    }

    async fn diagnostics(&self) -> Result<Diagnostics, ApiError> {
        drop(self.record(Call::Diagnostics));
        Ok(Diagnostics {
            database: "connected".into(),
            ai_engine: "online".into(),
            vector_store: "ready".into(),
        })
    }

    async fn server_config(&self) -> Result<ServerConfig, ApiError> {
        drop(self.record(Call::ServerConfig));
        Ok(ServerConfig {
            app_name: "Project Nomi".into(),
            version: "1.0.0".into(),
            ..Default::default()
        })
    }
}
