//! One simulation's chat: transcript, status and the turn protocol

use super::model::{is_breaking_score, Message, SimulationStatus, UNNAMED_PERSONA};
use super::notices;
use crate::api::{ApiError, ChatReply, SimulationApi, SimulationSummary, StartedSimulation};
use crate::storage::ChatHistoryStore;
use std::fmt;

/// Why an action was refused before anything was mutated or sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    BlankInput,
    SendInFlight,
    ResetInFlight,
    Broken,
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankInput => write!(f, "Nothing to send"),
            Self::SendInFlight => write!(f, "Still waiting for a reply"),
            Self::ResetInFlight => write!(f, "Timeline reset in progress"),
            Self::Broken => write!(f, "Connection severed; reset the timeline to continue"),
        }
    }
}

impl std::error::Error for Blocked {}

/// A reset that did not happen
#[derive(Debug, Clone, PartialEq)]
pub enum ResetError {
    Blocked(Blocked),
    Remote(ApiError),
}

impl fmt::Display for ResetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked(reason) => write!(f, "{}", reason),
            Self::Remote(e) => write!(f, "Could not connect to the Time Machine ({})", e),
        }
    }
}

impl std::error::Error for ResetError {}

/// The remote call a validated send still has to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub simulation_id: String,
    pub text: String,
}

/// What a completed turn changed, for the UI to react to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// The score crossed the break threshold on this turn
    pub broke: bool,
    /// Persona name revealed by a calibration that completed on this turn
    pub calibrated_as: Option<String>,
    /// The remote call failed; the transcript already says so
    pub error: Option<ApiError>,
}

/// In-memory projection of one simulation
///
/// The transcript is append-only except for the full replacement on reset,
/// and it is written through to [`ChatHistoryStore`] after every mutation.
/// Status only ever moves `Active` to `Broken` outside of a reset.
pub struct Conversation {
    simulation_id: String,
    messages: Vec<Message>,
    status: SimulationStatus,
    score: i64,
    persona_name: Option<String>,
    calibrated: bool,
    sending: bool,
    resetting: bool,
    history: ChatHistoryStore,
}

impl Conversation {
    fn empty(history: ChatHistoryStore, simulation_id: String) -> Self {
        Self {
            simulation_id,
            messages: Vec::new(),
            status: SimulationStatus::Active,
            score: 0,
            persona_name: None,
            calibrated: false,
            sending: false,
            resetting: false,
            history,
        }
    }

    /// A simulation the backend just created, seeded with its first line
    pub fn created(history: ChatHistoryStore, started: &StartedSimulation) -> Self {
        let mut conversation = Self::empty(history, started.simulation_id.clone());
        conversation.push(Message::ai(started.reply_text.clone()));
        conversation
    }

    /// An existing simulation, transcript read from local storage
    pub fn resumed(history: ChatHistoryStore, simulation_id: &str) -> Self {
        let messages = history.load(simulation_id);
        tracing::debug!(
            "Loaded {} stored messages for {}",
            messages.len(),
            simulation_id
        );
        let mut conversation = Self::empty(history, simulation_id.to_string());
        conversation.messages = messages;
        conversation
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Display name, falling back to a placeholder until one is known
    pub fn persona_name(&self) -> &str {
        self.persona_name.as_deref().unwrap_or(UNNAMED_PERSONA)
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// The persona is "typing" for as long as a turn is in flight
    pub fn is_typing(&self) -> bool {
        self.sending
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    /// Whether the composer should accept input at all
    pub fn can_send(&self) -> bool {
        !self.sending && !self.resetting && !self.status.is_broken()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn persist(&self) {
        self.history.save(&self.simulation_id, &self.messages);
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.persist();
    }

    /// Append a client-side notice to the transcript
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.push(Message::system(text));
    }

    /// Seed the greeting line when there is nothing to show yet
    pub fn greet_if_empty(&mut self) {
        if self.messages.is_empty() {
            let greeting = notices::greeting(self.persona_name());
            self.push(Message::system(greeting));
        }
    }

    /// Adopt the name and calibration the backend already knows about
    ///
    /// Only fills gaps on a freshly resumed conversation; a name learned from
    /// a chat turn is never overwritten.
    pub fn adopt_identity(&mut self, summary: &SimulationSummary) {
        if self.persona_name.is_none() && !summary.name.trim().is_empty() {
            self.persona_name = Some(summary.name.clone());
        }
        self.calibrated |= summary.is_calibrated;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat turn
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate `input` and apply the optimistic half of a turn
    ///
    /// On success the user's line is already in the transcript (and stored)
    /// and the returned request must be sent; a refusal changes nothing.
    pub fn begin_send(&mut self, input: &str) -> Result<PendingSend, Blocked> {
        if input.trim().is_empty() {
            return Err(Blocked::BlankInput);
        }
        if self.sending {
            return Err(Blocked::SendInFlight);
        }
        if self.resetting {
            return Err(Blocked::ResetInFlight);
        }
        if self.status.is_broken() {
            return Err(Blocked::Broken);
        }

        self.push(Message::user(input));
        self.sending = true;

        Ok(PendingSend {
            simulation_id: self.simulation_id.clone(),
            text: input.to_string(),
        })
    }

    /// Apply the remote half of a turn started with [`begin_send`](Self::begin_send)
    pub fn complete_send(&mut self, result: Result<ChatReply, ApiError>) -> TurnOutcome {
        if !self.sending {
            tracing::debug!("Dropping reply for {}: no turn in flight", self.simulation_id);
            return TurnOutcome::default();
        }
        self.sending = false;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Chat turn failed for {}: {}", self.simulation_id, e);
                self.push(Message::system(notices::CONNECTION_LOST));
                return TurnOutcome {
                    error: Some(e),
                    ..Default::default()
                };
            }
        };

        let mut outcome = TurnOutcome::default();

        if let Some(score) = reply.score() {
            self.score = score;
            if is_breaking_score(score) && !self.status.is_broken() {
                tracing::info!(
                    "Simulation {} broke (score {})",
                    self.simulation_id,
                    score
                );
                self.status = SimulationStatus::Broken;
                outcome.broke = true;
            }
        }

        if reply.is_calibrated == Some(true) {
            let just_calibrated = !self.calibrated;
            self.calibrated = true;
            if let Some(name) = reply.persona_name.as_deref().filter(|n| !n.trim().is_empty()) {
                if just_calibrated || self.persona_name.as_deref() != Some(name) {
                    tracing::info!("Calibration complete: persona is {}", name);
                    self.persona_name = Some(name.to_string());
                    outcome.calibrated_as = Some(name.to_string());
                }
            }
        }

        if let Some(aside) = reply.narrative() {
            self.messages.push(Message::system(aside));
        }
        if let Some(text) = reply.reply() {
            self.messages.push(Message::ai(text));
        }
        self.persist();

        outcome
    }

    /// Run a whole turn against `api`
    pub async fn send<A: SimulationApi>(
        &mut self,
        api: &A,
        input: &str,
    ) -> Result<TurnOutcome, Blocked> {
        let pending = self.begin_send(input)?;
        let result = api
            .send_message(&pending.simulation_id, &pending.text)
            .await;
        Ok(self.complete_send(result))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Time machine
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark a confirmed reset as in flight; returns the id to reset
    pub fn begin_reset(&mut self) -> Result<String, Blocked> {
        if self.resetting {
            return Err(Blocked::ResetInFlight);
        }
        if self.sending {
            return Err(Blocked::SendInFlight);
        }
        self.resetting = true;
        Ok(self.simulation_id.clone())
    }

    /// Apply the remote result of a reset
    ///
    /// Failure leaves transcript, status and score exactly as they were.
    pub fn complete_reset(&mut self, result: Result<(), ApiError>) -> Result<(), ApiError> {
        self.resetting = false;
        if let Err(e) = result {
            tracing::warn!("Reset failed for {}: {}", self.simulation_id, e);
            return Err(e);
        }

        self.history.clear(&self.simulation_id);
        self.messages = vec![Message::system(notices::TIMELINE_RESET)];
        self.status = SimulationStatus::Active;
        self.score = 0;
        self.persist();

        tracing::info!("Timeline reset for {}", self.simulation_id);
        Ok(())
    }

    /// Run a whole reset against `api` (confirmation is the caller's job)
    pub async fn reset<A: SimulationApi>(&mut self, api: &A) -> Result<(), ResetError> {
        let simulation_id = self.begin_reset().map_err(ResetError::Blocked)?;
        let result = api.reset_simulation(&simulation_id).await;
        self.complete_reset(result).map_err(ResetError::Remote)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Reconcile with a remote listing; returns false if this simulation
    /// isn't in it
    ///
    /// Status only moves forward (`Active` to `Broken`); a remote `ACTIVE`
    /// never revives a locally broken simulation.
    pub fn apply_sync(&mut self, simulations: &[SimulationSummary]) -> bool {
        let Some(remote) = simulations.iter().find(|s| s.id == self.simulation_id) else {
            tracing::warn!(
                "Simulation {} not found in remote listing",
                self.simulation_id
            );
            return false;
        };

        self.score = remote.emotional_bank_account;
        if remote.status.is_broken() && !self.status.is_broken() {
            tracing::info!("Server reports {} as broken", self.simulation_id);
            self.status = SimulationStatus::Broken;
            self.push(Message::system(notices::CONNECTION_SEVERED));
        }
        true
    }

    /// Run a status sync against `api`
    ///
    /// A failed listing leaves the conversation untouched and is returned
    /// to the caller.
    pub async fn sync<A: SimulationApi>(&mut self, api: &A) -> Result<bool, ApiError> {
        let simulations = api.list_simulations().await?;
        Ok(self.apply_sync(&simulations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{reply, reply_with, started, summary, Call, FakeApi};
    use crate::session::MessageKind;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn history() -> ChatHistoryStore {
        ChatHistoryStore::new(Arc::new(MemoryStore::new()))
    }

    fn fresh(history: &ChatHistoryStore) -> Conversation {
        Conversation::created(history.clone(), &started("S", "Who are you?"))
    }

    fn kinds(conversation: &Conversation) -> Vec<MessageKind> {
        conversation.messages().iter().map(|m| m.kind).collect()
    }

    fn sends(api: &FakeApi) -> usize {
        api.count(|call| matches!(call, Call::SendMessage { .. }))
    }

    #[tokio::test]
    async fn test_turn_appends_user_aside_reply_in_order() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply_with("hi", Some("time passes"), Some(5))));
        let store = history();
        let mut chat = fresh(&store);

        let outcome = chat.send(&api, "hello").await.unwrap();

        let tail: Vec<_> = chat.messages()[1..]
            .iter()
            .map(|m| (m.kind, m.text.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (MessageKind::User, "hello"),
                (MessageKind::System, "time passes"),
                (MessageKind::Ai, "hi"),
            ]
        );
        assert_eq!(chat.status(), SimulationStatus::Active);
        assert_eq!(chat.score(), 5);
        assert_eq!(outcome, TurnOutcome::default());
        assert!(!chat.is_sending());
        assert_eq!(
            api.calls(),
            vec![Call::SendMessage {
                simulation_id: "S".into(),
                text: "hello".into()
            }]
        );

        // Written through to storage
        assert_eq!(store.load("S"), chat.messages());
    }

    #[tokio::test]
    async fn test_each_turn_grows_by_one_to_three() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply("a")))
            .push_reply(Ok(reply_with("b", Some("later"), None)))
            .push_reply(Ok(ChatReply::default()));
        let mut chat = fresh(&history());

        let mut len = chat.messages().len();
        for (input, grown) in [("one", 2), ("two", 3), ("three", 1)] {
            chat.send(&api, input).await.unwrap();
            assert_eq!(chat.messages().len(), len + grown, "after {:?}", input);
            len = chat.messages().len();
        }
        // An empty reply still leaves the user's line
        assert_eq!(kinds(&chat).last(), Some(&MessageKind::User));
    }

    #[test]
    fn test_user_line_is_visible_before_the_call() {
        let store = history();
        let mut chat = fresh(&store);

        let pending = chat.begin_send("hello").unwrap();
        assert_eq!(pending.text, "hello");
        assert_eq!(pending.simulation_id, "S");
        assert!(chat.is_typing());
        assert_eq!(chat.messages().last().unwrap().text, "hello");
        assert_eq!(store.load("S").last().unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_blank_input_is_refused_without_a_call() {
        let api = FakeApi::new();
        let mut chat = fresh(&history());
        let before = chat.messages().to_vec();

        for input in ["", "   ", "\n\t"] {
            assert_eq!(chat.send(&api, input).await, Err(Blocked::BlankInput));
        }
        assert_eq!(chat.messages(), before.as_slice());
        assert_eq!(sends(&api), 0);
    }

    #[test]
    fn test_second_send_while_in_flight_is_refused() {
        let mut chat = fresh(&history());
        chat.begin_send("first").unwrap();
        let len = chat.messages().len();

        assert_eq!(chat.begin_send("second"), Err(Blocked::SendInFlight));
        assert_eq!(chat.messages().len(), len);
    }

    #[tokio::test]
    async fn test_breaking_score_flips_status_and_blocks_sends() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply_with("I'm done.", None, Some(-100))));
        let mut chat = fresh(&history());

        let outcome = chat.send(&api, "whatever").await.unwrap();
        assert!(outcome.broke);
        assert_eq!(chat.status(), SimulationStatus::Broken);
        assert!(!chat.can_send());

        let len = chat.messages().len();
        assert_eq!(chat.send(&api, "sorry").await, Err(Blocked::Broken));
        assert_eq!(chat.messages().len(), len);
        assert_eq!(sends(&api), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_user_line_and_appends_notice() {
        let api = FakeApi::new();
        api.push_reply(Err(ApiError::Network("refused".into())));
        let mut chat = fresh(&history());

        let outcome = chat.send(&api, "hello").await.unwrap();
        assert!(outcome.error.is_some());

        let last_two: Vec<_> = chat.messages()[chat.messages().len() - 2..]
            .iter()
            .map(|m| (m.kind, m.text.as_str()))
            .collect();
        assert_eq!(
            last_two,
            vec![
                (MessageKind::User, "hello"),
                (MessageKind::System, notices::CONNECTION_LOST),
            ]
        );
        assert_eq!(chat.status(), SimulationStatus::Active);
        assert!(!chat.is_typing());

        // Retry is allowed
        api.push_reply(Ok(reply("back")));
        chat.send(&api, "hello again").await.unwrap();
        assert_eq!(chat.messages().last().unwrap().text, "back");
    }

    #[tokio::test]
    async fn test_calibration_updates_persona_name() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply("Next question.")))
            .push_reply(Ok(ChatReply {
                reply_text: Some("Hey. It's me.".into()),
                is_calibrated: Some(true),
                persona_name: Some("Mara".into()),
                ..Default::default()
            }));
        let mut chat = fresh(&history());
        assert_eq!(chat.persona_name(), UNNAMED_PERSONA);

        chat.send(&api, "I like rain").await.unwrap();
        assert_eq!(chat.persona_name(), UNNAMED_PERSONA);
        assert!(!chat.is_calibrated());

        let outcome = chat.send(&api, "and cats").await.unwrap();
        assert_eq!(outcome.calibrated_as.as_deref(), Some("Mara"));
        assert_eq!(chat.persona_name(), "Mara");
        assert!(chat.is_calibrated());
    }

    #[tokio::test]
    async fn test_reset_leaves_single_confirmation() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply_with("bye", None, Some(-140))));
        let store = history();
        let mut chat = fresh(&store);
        chat.send(&api, "hello").await.unwrap();
        assert!(chat.status().is_broken());

        chat.reset(&api).await.unwrap();

        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].kind, MessageKind::System);
        assert_eq!(chat.messages()[0].text, notices::TIMELINE_RESET);
        assert_eq!(chat.status(), SimulationStatus::Active);
        assert_eq!(chat.score(), 0);
        assert_eq!(store.load("S"), chat.messages());
        assert!(api.calls().contains(&Call::Reset("S".into())));
    }

    #[tokio::test]
    async fn test_failed_reset_changes_nothing() {
        let api = FakeApi::new();
        api.push_reply(Ok(reply_with("bye", None, Some(-140))))
            .push_reset(Err(ApiError::Server {
                status: 500,
                body: None,
            }));
        let store = history();
        let mut chat = fresh(&store);
        chat.send(&api, "hello").await.unwrap();
        let before = chat.messages().to_vec();

        let err = chat.reset(&api).await.unwrap_err();
        assert!(matches!(err, ResetError::Remote(ApiError::Server { status: 500, .. })));
        assert_eq!(chat.messages(), before.as_slice());
        assert_eq!(store.load("S"), before);
        assert!(chat.status().is_broken());
        assert_eq!(chat.score(), -140);
        assert!(!chat.is_resetting());
    }

    #[test]
    fn test_reset_refused_while_sending() {
        let mut chat = fresh(&history());
        chat.begin_send("hello").unwrap();
        assert_eq!(chat.begin_reset(), Err(Blocked::SendInFlight));
    }

    #[test]
    fn test_sync_moves_status_forward_only() {
        let mut chat = fresh(&history());

        assert!(chat.apply_sync(&[summary("S", "Mara", SimulationStatus::Broken, -120)]));
        assert!(chat.status().is_broken());
        assert_eq!(chat.score(), -120);
        assert_eq!(
            chat.messages().last().unwrap().text,
            notices::CONNECTION_SEVERED
        );
        let len = chat.messages().len();

        // Idempotent, and never revives
        chat.apply_sync(&[summary("S", "Mara", SimulationStatus::Broken, -120)]);
        chat.apply_sync(&[summary("S", "Mara", SimulationStatus::Active, 10)]);
        assert!(chat.status().is_broken());
        assert_eq!(chat.messages().len(), len);
    }

    #[test]
    fn test_sync_ignores_name_and_reports_missing() {
        let mut chat = fresh(&history());
        assert!(chat.apply_sync(&[summary("S", "Mara", SimulationStatus::Active, 3)]));
        assert_eq!(chat.persona_name(), UNNAMED_PERSONA);

        assert!(!chat.apply_sync(&[summary("other", "Iris", SimulationStatus::Active, 0)]));
        assert_eq!(chat.score(), 3);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut chat = fresh(&history());
        let len = chat.messages().len();
        let outcome = chat.complete_send(Ok(reply("late")));
        assert_eq!(outcome, TurnOutcome::default());
        assert_eq!(chat.messages().len(), len);
    }

    #[test]
    fn test_greeting_only_when_empty() {
        let store = history();
        let mut chat = Conversation::resumed(store.clone(), "S");
        chat.adopt_identity(&summary("S", "Mara", SimulationStatus::Active, 0));
        chat.greet_if_empty();
        assert_eq!(chat.messages()[0].text, "Connection established with Mara.");

        chat.greet_if_empty();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(store.load("S").len(), 1);
    }
}
