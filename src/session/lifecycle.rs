//! Launch-time decision between resuming and creating a simulation

use super::conversation::Conversation;
use super::notices;
use crate::api::{ApiError, SimulationApi, SimulationSummary, StartedSimulation};
use crate::storage::{ChatHistoryStore, SessionContext};

/// Lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Resuming,
    Creating,
    Ready,
    Error,
}

impl Phase {
    /// Whether a remote call for this phase is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Initializing | Self::Resuming | Self::Creating)
    }
}

/// The remote call the lifecycle needs next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// List simulations to sync the status of this one
    Sync(String),
    /// Create a brand-new simulation
    Create,
}

/// Single owner of the session pointer and the current conversation
pub struct Lifecycle {
    session: SessionContext,
    history: ChatHistoryStore,
    phase: Phase,
    conversation: Option<Conversation>,
    error: Option<String>,
}

impl Lifecycle {
    pub fn new(session: SessionContext, history: ChatHistoryStore) -> Self {
        Self {
            session,
            history,
            phase: Phase::Initializing,
            conversation: None,
            error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn conversation_mut(&mut self) -> Option<&mut Conversation> {
        self.conversation.as_mut()
    }

    /// Message explaining why initialization failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Session pointer, for the picker to switch or detach
    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    /// Read the session pointer and decide what to do
    ///
    /// With a stored id the transcript is loaded immediately (so it can be
    /// shown while the sync runs); without one a new simulation is needed.
    pub fn initialize(&mut self) -> Step {
        self.phase = Phase::Initializing;
        self.conversation = None;
        self.error = None;

        match self.session.refresh().map(str::to_string) {
            Some(id) => {
                tracing::info!("Resuming simulation {}", id);
                self.phase = Phase::Resuming;
                self.conversation = Some(Conversation::resumed(self.history.clone(), &id));
                Step::Sync(id)
            }
            None => {
                tracing::info!("No current simulation, creating one");
                self.phase = Phase::Creating;
                Step::Create
            }
        }
    }

    /// Apply the status sync issued for `simulation_id` while resuming
    ///
    /// Any failure still ends in `Ready`: the stored history is usable
    /// offline, and the transcript gets a note about the connection.
    pub fn on_synced(
        &mut self,
        simulation_id: &str,
        result: Result<Vec<SimulationSummary>, ApiError>,
    ) {
        if self.phase != Phase::Resuming {
            tracing::debug!("Ignoring sync result outside of resume");
            return;
        }
        let Some(conversation) = self
            .conversation
            .as_mut()
            .filter(|c| c.simulation_id() == simulation_id)
        else {
            tracing::debug!("Ignoring sync result for stale simulation {}", simulation_id);
            return;
        };

        match result {
            Ok(simulations) => {
                if let Some(remote) = simulations.iter().find(|s| s.id == simulation_id) {
                    conversation.adopt_identity(remote);
                }
                conversation.greet_if_empty();
                if !conversation.apply_sync(&simulations) {
                    conversation.push_notice(notices::NOT_FOUND_REMOTELY);
                }
            }
            Err(e) => {
                tracing::warn!("Status sync failed while resuming: {}", e);
                conversation.greet_if_empty();
                conversation.push_notice(notices::OFFLINE_RESUME);
            }
        }

        self.phase = Phase::Ready;
    }

    /// Apply the result of creating a simulation
    pub fn on_created(&mut self, result: Result<StartedSimulation, ApiError>) {
        if self.phase != Phase::Creating {
            tracing::debug!("Ignoring creation result outside of create");
            return;
        }

        match result {
            Ok(started) => {
                tracing::info!("Created simulation {}", started.simulation_id);
                self.session.set(&started.simulation_id);
                self.conversation = Some(Conversation::created(self.history.clone(), &started));
                self.phase = Phase::Ready;
            }
            Err(e) => {
                tracing::error!("Could not create a simulation: {}", e);
                self.error = Some(format!(
                    "Could not start a new simulation ({}). Try again or restart nomi.",
                    e
                ));
                self.phase = Phase::Error;
            }
        }
    }

    /// Abandon the current simulation and create a new one
    ///
    /// Clears the session pointer and the old transcript; the simulation
    /// itself stays on the server.
    pub fn start_new(&mut self) -> Step {
        if let Some(old) = self.conversation.take() {
            tracing::info!("Leaving simulation {} for a new persona", old.simulation_id());
            self.history.clear(old.simulation_id());
        }
        self.session.clear();
        self.error = None;
        self.phase = Phase::Creating;
        Step::Create
    }

    /// Drive one remote step to completion
    pub async fn advance<A: SimulationApi>(&mut self, api: &A, step: Step) {
        match step {
            Step::Sync(id) => {
                let result = api.list_simulations().await;
                self.on_synced(&id, result);
            }
            Step::Create => {
                let result = api.start_chat().await;
                self.on_created(result);
            }
        }
    }

    /// Initialize and drive to `Ready` or `Error`
    pub async fn run<A: SimulationApi>(&mut self, api: &A) -> Phase {
        let step = self.initialize();
        self.advance(api, step).await;
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{started, summary, Call, FakeApi};
    use crate::session::{Message, MessageKind, SimulationStatus};
    use crate::storage::{MemoryStore, SharedStore, UnavailableStore};
    use std::sync::Arc;

    fn lifecycle(store: &SharedStore) -> Lifecycle {
        Lifecycle::new(
            SessionContext::load(store.clone()),
            ChatHistoryStore::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_no_session_creates_exactly_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let api = FakeApi::new();
        api.push_start(Ok(started("sim-1", "SYSTEM ONLINE. Tell me about yourself.")));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.run(&api).await, Phase::Ready);

        assert_eq!(api.calls(), vec![Call::StartChat]);
        assert_eq!(lc.session().get(), Some("sim-1"));
        assert_eq!(SessionContext::load(store).get(), Some("sim-1"));

        let chat = lc.conversation().unwrap();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].kind, MessageKind::Ai);
        assert_eq!(
            chat.messages()[0].text,
            "SYSTEM ONLINE. Tell me about yourself."
        );
    }

    #[tokio::test]
    async fn test_existing_session_loads_history_then_syncs_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let history = ChatHistoryStore::new(store.clone());
        let stored = vec![
            Message::user("hello"),
            Message::system("time passes"),
            Message::ai("hi"),
        ];
        history.save("S", &stored);
        SessionContext::load(store.clone()).set("S");

        let api = FakeApi::new();
        api.set_listing(Ok(vec![summary("S", "Mara", SimulationStatus::Active, 7)]));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.initialize(), Step::Sync("S".into()));
        assert_eq!(lc.phase(), Phase::Resuming);
        // Shown before the sync returns
        assert_eq!(lc.conversation().unwrap().messages(), stored.as_slice());

        lc.advance(&api, Step::Sync("S".into())).await;

        assert_eq!(lc.phase(), Phase::Ready);
        assert_eq!(api.calls(), vec![Call::ListSimulations]);
        let chat = lc.conversation().unwrap();
        assert_eq!(chat.messages(), stored.as_slice());
        assert_eq!(chat.score(), 7);
        assert_eq!(chat.persona_name(), "Mara");
    }

    #[tokio::test]
    async fn test_resume_offline_is_ready_with_note() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let history = ChatHistoryStore::new(store.clone());
        history.save("S", &[Message::user("hello")]);
        SessionContext::load(store.clone()).set("S");

        let api = FakeApi::new();
        api.set_listing(Err(ApiError::Network("refused".into())));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.run(&api).await, Phase::Ready);
        let chat = lc.conversation().unwrap();
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].text, notices::OFFLINE_RESUME);
        assert!(chat.can_send());
    }

    #[tokio::test]
    async fn test_resume_with_empty_history_greets() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        SessionContext::load(store.clone()).set("S");
        let api = FakeApi::new();
        api.set_listing(Ok(vec![summary("S", "", SimulationStatus::Active, 0)]));
        let mut lc = lifecycle(&store);

        lc.run(&api).await;
        let chat = lc.conversation().unwrap();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].text, "Connection established with Subject.");
    }

    #[tokio::test]
    async fn test_resume_of_broken_simulation() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        SessionContext::load(store.clone()).set("S");
        let api = FakeApi::new();
        api.set_listing(Ok(vec![summary("S", "Mara", SimulationStatus::Broken, -130)]));
        let mut lc = lifecycle(&store);

        lc.run(&api).await;
        let chat = lc.conversation().unwrap();
        assert!(chat.status().is_broken());
        assert_eq!(
            chat.messages().last().unwrap().text,
            notices::CONNECTION_SEVERED
        );
    }

    #[tokio::test]
    async fn test_resume_of_unknown_simulation_notes_it() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        SessionContext::load(store.clone()).set("gone");
        let api = FakeApi::new();
        api.set_listing(Ok(vec![summary("other", "Iris", SimulationStatus::Active, 0)]));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.run(&api).await, Phase::Ready);
        let chat = lc.conversation().unwrap();
        assert_eq!(
            chat.messages().last().unwrap().text,
            notices::NOT_FOUND_REMOTELY
        );
    }

    #[tokio::test]
    async fn test_creation_failure_is_error() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let api = FakeApi::new();
        api.push_start(Err(ApiError::Server {
            status: 503,
            body: None,
        }));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.run(&api).await, Phase::Error);
        assert!(lc.conversation().is_none());
        assert!(lc.error().unwrap().contains("restart nomi"));
        assert_eq!(lc.session().get(), None);
    }

    #[tokio::test]
    async fn test_start_new_clears_old_session_and_history() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let history = ChatHistoryStore::new(store.clone());
        let api = FakeApi::new();
        api.push_start(Ok(started("old", "first")))
            .push_start(Ok(started("new", "second")));
        let mut lc = lifecycle(&store);
        lc.run(&api).await;
        assert_eq!(history.load("old").len(), 1);

        let step = lc.start_new();
        assert_eq!(step, Step::Create);
        assert_eq!(lc.session().get(), None);
        assert!(history.load("old").is_empty());

        lc.advance(&api, step).await;
        assert_eq!(lc.phase(), Phase::Ready);
        assert_eq!(lc.session().get(), Some("new"));
        assert_eq!(lc.conversation().unwrap().messages()[0].text, "second");
    }

    #[tokio::test]
    async fn test_storage_outage_still_creates() {
        let store: SharedStore = Arc::new(UnavailableStore);
        let api = FakeApi::new();
        api.push_start(Ok(started("sim-1", "hello")));
        let mut lc = lifecycle(&store);

        assert_eq!(lc.run(&api).await, Phase::Ready);
        assert_eq!(lc.session().get(), Some("sim-1"));
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut lc = lifecycle(&store);
        lc.on_created(Ok(started("x", "y")));
        assert_eq!(lc.phase(), Phase::Initializing);

        SessionContext::load(store.clone()).set("S");
        lc.initialize();
        lc.on_synced("other", Ok(Vec::new()));
        assert_eq!(lc.phase(), Phase::Resuming);
    }
}
