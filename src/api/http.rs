//! reqwest implementation of [`SimulationApi`]

use super::models::{
    AnalyzeRequest, ChatReply, Diagnostics, Genesis, GenesisRequest, OracleScene, ResetRequest,
    SendMessageRequest, ServerConfig, SimulationSummary, StartedSimulation, VibeAnalysis,
};
use super::{ApiError, SimulationApi};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// How long to wait for a TCP connection before calling it a network error
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one backend base URL (e.g. `http://host:8000/api/v1`)
///
/// Cheap to clone: reqwest's client is reference-counted internally.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client with the given total request timeout
    ///
    /// The timeout must cover the slowest generation call; the default is
    /// [`DEFAULT_TIMEOUT_SECS`](super::DEFAULT_TIMEOUT_SECS).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!(
            "Remote client targeting {} (timeout {}s)",
            base_url,
            timeout.as_secs()
        );

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| network_error(path, e))?;
        decode(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.post(path, body).await?;
        decode(path, response).await
    }

    async fn post<B>(&self, path: &str, body: Option<&B>) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self
            .client
            .post(self.url(path))
            .header(ACCEPT, "application/json");
        request = match body {
            Some(body) => request.json(body),
            None => request.header(CONTENT_TYPE, "application/json"),
        };

        tracing::debug!("POST {}", path);
        let response = request.send().await.map_err(|e| network_error(path, e))?;
        check_status(path, response).await
    }
}

/// Classify a transport failure as a network error and log it
fn network_error(path: &str, e: reqwest::Error) -> ApiError {
    let reason = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "could not connect"
    } else {
        "request failed"
    };
    tracing::warn!(
        "Network error on {}: {} ({}). Is the backend running?",
        path,
        reason,
        e
    );
    ApiError::Network(format!("{}: {}", reason, e))
}

/// Turn non-2xx responses into `ApiError::Server`, keeping the body
async fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .ok()
        .filter(|text| !text.trim().is_empty());
    tracing::warn!(
        "API error on {}: {} {}",
        path,
        status.as_u16(),
        body.as_deref().unwrap_or("")
    );

    Err(ApiError::Server {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(path, response).await?;
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            tracing::warn!("Undecodable response from {}: {}", path, e);
            ApiError::Decode(format!("{}: {}", path, e))
        } else {
            network_error(path, e)
        }
    })
}

impl SimulationApi for HttpClient {
    async fn start_chat(&self) -> Result<StartedSimulation, ApiError> {
        let reply: ChatReply = self.post_json::<(), _>("/chat/start", None).await?;
        StartedSimulation::try_from(reply)
    }

    async fn send_message(
        &self,
        simulation_id: &str,
        user_message: &str,
    ) -> Result<ChatReply, ApiError> {
        let body = SendMessageRequest {
            simulation_id,
            user_message,
        };
        self.post_json("/chat/message", Some(&body)).await
    }

    async fn list_simulations(&self) -> Result<Vec<SimulationSummary>, ApiError> {
        self.get_json("/simulations/list").await
    }

    async fn reset_simulation(&self, simulation_id: &str) -> Result<(), ApiError> {
        let body = ResetRequest { simulation_id };
        // The body is a human-readable confirmation; only the status matters
        self.post("/simulations/reset", Some(&body)).await?;
        Ok(())
    }

    async fn oracle_init(&self) -> Result<OracleScene, ApiError> {
        self.post_json::<(), _>("/oracle/init", None).await
    }

    async fn oracle_analyze(
        &self,
        scenario: &str,
        user_reaction: &str,
    ) -> Result<VibeAnalysis, ApiError> {
        let body = AnalyzeRequest {
            scenario,
            user_reaction,
        };
        self.post_json("/oracle/analyze", Some(&body)).await
    }

    async fn foundry_genesis(&self, user_vibe: &serde_json::Value) -> Result<Genesis, ApiError> {
        let body = GenesisRequest { user_vibe };
        self.post_json("/foundry/genesis", Some(&body)).await
    }

    async fn diagnostics(&self) -> Result<Diagnostics, ApiError> {
        self.get_json("/system/diagnostics").await
    }

    async fn server_config(&self) -> Result<ServerConfig, ApiError> {
        self.get_json("/system/config").await
    }
}
