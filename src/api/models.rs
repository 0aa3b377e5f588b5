//! Wire types for the simulation backend (`/api/v1`)
//!
//! Only the fields the client reads are modelled; everything else in a
//! response is ignored. Scores arrive as JSON numbers that may or may not
//! carry a fractional part, so they go through [`de_score`].

use crate::session::SimulationStatus;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::ApiError;

/// Accept any JSON number for a score and round it to an integer
fn de_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i64)
}

fn de_opt_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.round() as i64))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /chat/message`
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub simulation_id: &'a str,
    pub user_message: &'a str,
}

/// Relationship state attached to chat responses
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewState {
    /// Present on `/chat/start` responses
    #[serde(default)]
    pub simulation_id: Option<String>,
    /// Trust score after this turn
    #[serde(default, deserialize_with = "de_opt_score")]
    pub emotional_bank_account: Option<i64>,
}

/// Response of `/chat/message` and `/chat/start`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply_text: Option<String>,
    /// Narrative aside (time skips and the like), shown before the reply
    #[serde(default)]
    pub narrative_bridge: Option<String>,
    #[serde(default)]
    pub is_calibrated: Option<bool>,
    #[serde(default)]
    pub persona_name: Option<String>,
    #[serde(default)]
    pub opening_scenario: Option<String>,
    #[serde(default)]
    pub new_state: Option<NewState>,
}

impl ChatReply {
    /// Updated trust score, if the backend reported one
    pub fn score(&self) -> Option<i64> {
        self.new_state
            .as_ref()
            .and_then(|state| state.emotional_bank_account)
    }

    /// Non-blank narrative aside
    pub fn narrative(&self) -> Option<&str> {
        self.narrative_bridge
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Non-blank reply text
    pub fn reply(&self) -> Option<&str> {
        self.reply_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// A freshly created simulation and its first line
#[derive(Debug, Clone, PartialEq)]
pub struct StartedSimulation {
    pub simulation_id: String,
    pub reply_text: String,
}

impl TryFrom<ChatReply> for StartedSimulation {
    type Error = ApiError;

    fn try_from(reply: ChatReply) -> Result<Self, Self::Error> {
        let simulation_id = reply
            .new_state
            .and_then(|state| state.simulation_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Decode("start response carried no simulation id".into()))?;

        Ok(Self {
            simulation_id,
            reply_text: reply.reply_text.unwrap_or_default(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulations
// ─────────────────────────────────────────────────────────────────────────────

/// One row of `GET /simulations/list`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: SimulationStatus,
    #[serde(default, deserialize_with = "de_score")]
    pub emotional_bank_account: i64,
    #[serde(default)]
    pub is_calibrated: bool,
}

impl SimulationSummary {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            crate::session::UNNAMED_PERSONA
        } else {
            &self.name
        }
    }
}

/// Body of `POST /simulations/reset`
#[derive(Debug, Serialize)]
pub struct ResetRequest<'a> {
    pub simulation_id: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Legacy onboarding (Oracle / Foundry)
// ─────────────────────────────────────────────────────────────────────────────

/// Response of `POST /oracle/init`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleScene {
    pub scenario_text: String,
}

/// Body of `POST /oracle/analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub scenario: &'a str,
    pub user_reaction: &'a str,
}

/// Response of `POST /oracle/analyze`
///
/// The vibe profile is opaque to the client; it is handed back verbatim to
/// `/foundry/genesis`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VibeAnalysis {
    pub user_vibe: serde_json::Value,
}

/// Body of `POST /foundry/genesis`
#[derive(Debug, Serialize)]
pub struct GenesisRequest<'a> {
    pub user_vibe: &'a serde_json::Value,
}

/// Response of `POST /foundry/genesis`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Genesis {
    pub simulation_id: String,
    #[serde(default)]
    pub persona: serde_json::Value,
}

impl Genesis {
    pub fn persona_name(&self) -> Option<&str> {
        self.persona.get("name").and_then(|name| name.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// System
// ─────────────────────────────────────────────────────────────────────────────

/// Response of `GET /system/diagnostics`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub ai_engine: String,
    #[serde(default)]
    pub vector_store: String,
}

/// Response of `GET /system/config`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub min_client_version: String,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}
