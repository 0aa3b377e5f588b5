//! Headless commands: one-shot subcommands and the line-based chat
//!
//! Each command brings the session lifecycle up the same way the TUI does,
//! then acts on the resulting conversation. Input and output are injected so
//! the commands can be driven from tests.

use crate::api::SimulationApi;
use crate::cli::Commands;
use crate::config::Config;
use crate::session::{
    Conversation, Lifecycle, Message, MessageKind, Phase, ResetError, SimulationPicker,
};
use crate::storage::{ChatHistoryStore, SessionContext, SharedStore};
use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

/// Everything a headless command needs
pub struct Headless<'a, A, R, W> {
    pub config: &'a Config,
    pub api: &'a A,
    pub store: SharedStore,
    pub input: R,
    pub out: W,
}

fn format_line(message: &Message, persona: &str) -> String {
    match message.kind {
        MessageKind::User => format!("you> {}", message.text),
        MessageKind::Ai => format!("{}> {}", persona, message.text),
        MessageKind::System => format!("  * {}", message.text),
    }
}

impl<A, R, W> Headless<'_, A, R, W>
where
    A: SimulationApi,
    R: BufRead,
    W: Write,
{
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(
            SessionContext::load(self.store.clone()),
            ChatHistoryStore::new(self.store.clone()),
        )
    }

    /// Run the lifecycle to `Ready`, or fail with its error message
    async fn ready(&self) -> Result<Lifecycle> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.run(self.api).await == Phase::Error {
            bail!(
                "{}",
                lifecycle.error().unwrap_or("Could not start a simulation")
            );
        }
        Ok(lifecycle)
    }

    fn print_lines(&mut self, conversation: &Conversation, from: usize) -> Result<()> {
        let persona = conversation.persona_name();
        for message in conversation.messages().iter().skip(from) {
            writeln!(self.out, "{}", format_line(message, persona))?;
        }
        Ok(())
    }

    fn print_status(&mut self, conversation: &Conversation) -> Result<()> {
        writeln!(
            self.out,
            "{} [{}] trust {} ({})",
            conversation.persona_name(),
            conversation.status().label(),
            conversation.score(),
            conversation.simulation_id()
        )?;
        Ok(())
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.out, "{} [y/N] ", prompt)?;
        self.out.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    /// Run a subcommand (anything but `config`)
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Send { text } => self.send(&text.join(" ")).await,
            Commands::History { limit } => self.history(limit).await,
            Commands::List => self.list().await,
            Commands::Use { id } => self.use_simulation(&id).await,
            Commands::New => self.new_persona().await,
            Commands::Reset { yes } => self.reset(yes).await,
            Commands::Status => self.status().await,
            Commands::Doctor => self.doctor().await,
            Commands::Oracle => self.oracle().await,
            Commands::Config { .. } => bail!("config is handled before startup"),
        }
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        let mut lifecycle = self.ready().await?;
        let Some(conversation) = lifecycle.conversation_mut() else {
            bail!("No conversation available");
        };

        let before = conversation.messages().len();
        let outcome = conversation
            .send(self.api, text)
            .await
            .map_err(|blocked| anyhow::anyhow!("{}", blocked))?;

        // Skip the user's own line
        self.print_lines(conversation, before + 1)?;

        if let Some(name) = &outcome.calibrated_as {
            writeln!(self.out, "Calibration complete. You are talking to {}.", name)?;
        }
        if outcome.broke {
            writeln!(
                self.out,
                "Connection severed (trust {}). Run `nomi reset` to start over.",
                conversation.score()
            )?;
        }
        if let Some(e) = outcome.error {
            bail!("Message not delivered: {}", e);
        }
        Ok(())
    }

    async fn history(&mut self, limit: usize) -> Result<()> {
        let lifecycle = self.ready().await?;
        let Some(conversation) = lifecycle.conversation() else {
            bail!("No conversation available");
        };

        let total = conversation.messages().len();
        let from = if limit == 0 {
            0
        } else {
            total.saturating_sub(limit)
        };
        self.print_status(conversation)?;
        self.print_lines(conversation, from)
    }

    async fn list(&mut self) -> Result<()> {
        let session = SessionContext::load(self.store.clone());
        let mut picker = SimulationPicker::new();
        picker.load(self.api, session.get()).await;
        if let Some(e) = picker.error() {
            bail!("{}", e);
        }

        if picker.simulations().is_empty() {
            writeln!(self.out, "No simulations yet. Run `nomi` to start one.")?;
            return Ok(());
        }

        for sim in picker.simulations() {
            let marker = if session.get() == Some(sim.id.as_str()) {
                "*"
            } else {
                " "
            };
            writeln!(
                self.out,
                "{} {:<20} {:<13} {:>6}  {}",
                marker,
                sim.display_name(),
                sim.status.label(),
                sim.emotional_bank_account,
                sim.id
            )?;
        }
        Ok(())
    }

    async fn use_simulation(&mut self, id: &str) -> Result<()> {
        let mut session = SessionContext::load(self.store.clone());
        let mut picker = SimulationPicker::new();
        picker.load(self.api, Some(id)).await;

        match picker.simulations().iter().find(|s| s.id == id) {
            Some(sim) => {
                let name = sim.display_name().to_string();
                SimulationPicker::activate_id(&mut session, id);
                writeln!(self.out, "Now talking to {} ({})", name, id)?;
            }
            None if picker.error().is_some() => {
                SimulationPicker::activate_id(&mut session, id);
                writeln!(
                    self.out,
                    "Server unreachable; switched to {} without checking it",
                    id
                )?;
            }
            None => bail!("No simulation with id {} (see `nomi list`)", id),
        }
        Ok(())
    }

    async fn new_persona(&mut self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        // Load the current conversation so its transcript is cleared with it
        lifecycle.initialize();
        let step = lifecycle.start_new();
        lifecycle.advance(self.api, step).await;

        match lifecycle.conversation() {
            Some(conversation) if lifecycle.phase() == Phase::Ready => {
                writeln!(
                    self.out,
                    "New simulation {}",
                    conversation.simulation_id()
                )?;
                self.print_lines(conversation, 0)
            }
            _ => bail!(
                "{}",
                lifecycle.error().unwrap_or("Could not start a simulation")
            ),
        }
    }

    async fn reset(&mut self, yes: bool) -> Result<()> {
        let mut lifecycle = self.ready().await?;
        let Some(conversation) = lifecycle.conversation_mut() else {
            bail!("No conversation available");
        };

        let prompt = format!(
            "Reset timeline with {}? This wipes all memories of your relationship.",
            conversation.persona_name()
        );
        if !yes && !self.confirm(&prompt)? {
            writeln!(self.out, "Aborted.")?;
            return Ok(());
        }

        match conversation.reset(self.api).await {
            Ok(()) => self.print_lines(conversation, 0),
            Err(ResetError::Remote(e)) => {
                bail!("Reset Failed: Could not connect to the Time Machine ({})", e)
            }
            Err(ResetError::Blocked(reason)) => bail!("Reset Failed: {}", reason),
        }
    }

    async fn status(&mut self) -> Result<()> {
        let lifecycle = self.ready().await?;
        let Some(conversation) = lifecycle.conversation() else {
            bail!("No conversation available");
        };
        self.print_status(conversation)?;
        writeln!(
            self.out,
            "calibrated: {}, messages: {}",
            if conversation.is_calibrated() { "yes" } else { "no" },
            conversation.messages().len()
        )?;
        Ok(())
    }

    async fn doctor(&mut self) -> Result<()> {
        writeln!(self.out, "nomi {}", crate::config::VERSION)?;
        writeln!(self.out, "backend:  {}", self.config.api_url)?;
        writeln!(
            self.out,
            "timeout:  {}s",
            self.config.request_timeout_secs
        )?;
        writeln!(
            self.out,
            "storage:  {} ({})",
            self.store.name(),
            self.config.data_dir.display()
        )?;
        writeln!(self.out)?;

        match self.api.diagnostics().await {
            Ok(diag) => {
                writeln!(self.out, "database:      {}", diag.database)?;
                writeln!(self.out, "ai engine:     {}", diag.ai_engine)?;
                writeln!(self.out, "vector store:  {}", diag.vector_store)?;
            }
            Err(e) => writeln!(self.out, "diagnostics unavailable: {}", e)?,
        }

        match self.api.server_config().await {
            Ok(server) => {
                writeln!(self.out, "server:        {} {}", server.app_name, server.version)?;
                writeln!(self.out, "maintenance:   {}", server.maintenance_mode)?;
                if !server.min_client_version.is_empty() {
                    writeln!(self.out, "min client:    {}", server.min_client_version)?;
                }
                for (feature, enabled) in &server.features {
                    writeln!(
                        self.out,
                        "feature {:<14} {}",
                        feature,
                        if *enabled { "on" } else { "off" }
                    )?;
                }
            }
            Err(e) => writeln!(self.out, "server config unavailable: {}", e)?,
        }
        Ok(())
    }

    async fn oracle(&mut self) -> Result<()> {
        let scene = self
            .api
            .oracle_init()
            .await
            .context("The Oracle is silent")?;
        writeln!(self.out, "{}", scene.scenario_text)?;
        writeln!(self.out)?;
        write!(self.out, "Your reaction> ")?;
        self.out.flush()?;

        let mut reaction = String::new();
        self.input.read_line(&mut reaction)?;
        let reaction = reaction.trim();
        if reaction.is_empty() {
            bail!("No reaction given");
        }

        writeln!(self.out, "Analyzing your vibe...")?;
        let vibe = self
            .api
            .oracle_analyze(&scene.scenario_text, reaction)
            .await
            .context("Vibe analysis failed")?;

        writeln!(self.out, "Forging a persona...")?;
        let genesis = self
            .api
            .foundry_genesis(&vibe.user_vibe)
            .await
            .context("Persona genesis failed")?;

        let mut session = SessionContext::load(self.store.clone());
        session.set(&genesis.simulation_id);
        writeln!(
            self.out,
            "{} is ready. Simulation {} is now current.",
            genesis
                .persona_name()
                .unwrap_or(crate::session::UNNAMED_PERSONA),
            genesis.simulation_id
        )?;
        Ok(())
    }

    /// Line-based chat for terminals without the TUI
    ///
    /// Every line is a message; `/status`, `/reset` and `/quit` are commands.
    pub async fn chat(&mut self) -> Result<()> {
        let mut lifecycle = self.ready().await?;
        let Some(conversation) = lifecycle.conversation_mut() else {
            bail!("No conversation available");
        };

        self.print_status(conversation)?;
        let tail = conversation.messages().len().saturating_sub(10);
        self.print_lines(conversation, tail)?;

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let line = line.trim();

            match line {
                "" => continue,
                "/quit" | "/exit" => return Ok(()),
                "/status" => {
                    if let Err(e) = conversation.sync(self.api).await {
                        writeln!(self.out, "(offline: {})", e)?;
                    }
                    self.print_status(conversation)?;
                }
                "/reset" => {
                    let prompt = "Reset timeline? This wipes all memories of your relationship.";
                    if self.confirm(prompt)? {
                        match conversation.reset(self.api).await {
                            Ok(()) => self.print_lines(conversation, 0)?,
                            Err(e) => writeln!(self.out, "Reset Failed: {}", e)?,
                        }
                    }
                }
                text => {
                    let before = conversation.messages().len();
                    match conversation.send(self.api, text).await {
                        Ok(outcome) => {
                            self.print_lines(conversation, before + 1)?;
                            if outcome.broke {
                                writeln!(
                                    self.out,
                                    "Connection severed. Type /reset to start over."
                                )?;
                            }
                        }
                        Err(blocked) => writeln!(self.out, "{}", blocked)?,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{reply_with, started, summary, Call, FakeApi};
    use crate::api::{ApiError, Genesis, OracleScene, VibeAnalysis};
    use crate::session::{notices, SimulationStatus};
    use crate::storage::MemoryStore;
    use std::io::Cursor;
    use std::sync::Arc;

    struct Harness {
        config: Config,
        api: FakeApi,
        store: SharedStore,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                config: Config::default(),
                api: FakeApi::new(),
                store: Arc::new(MemoryStore::new()),
            }
        }

        async fn run(&self, command: Commands, input: &str) -> (Result<()>, String) {
            let mut out = Vec::new();
            let result = Headless {
                config: &self.config,
                api: &self.api,
                store: self.store.clone(),
                input: Cursor::new(input.as_bytes().to_vec()),
                out: &mut out,
            }
            .run(command)
            .await;
            (result, String::from_utf8(out).unwrap())
        }

        async fn chat(&self, input: &str) -> String {
            let mut out = Vec::new();
            Headless {
                config: &self.config,
                api: &self.api,
                store: self.store.clone(),
                input: Cursor::new(input.as_bytes().to_vec()),
                out: &mut out,
            }
            .chat()
            .await
            .unwrap();
            String::from_utf8(out).unwrap()
        }

        fn current(&self) -> Option<String> {
            SessionContext::load(self.store.clone())
                .get()
                .map(str::to_string)
        }
    }

    #[tokio::test]
    async fn test_send_creates_then_prints_reply() {
        let h = Harness::new();
        h.api.push_start(Ok(started("S", "Who are you?")));
        h.api
            .push_reply(Ok(reply_with("hi", Some("time passes"), Some(5))));

        let (result, out) = h
            .run(
                Commands::Send {
                    text: vec!["hello".into()],
                },
                "",
            )
            .await;

        result.unwrap();
        assert_eq!(out, "  * time passes\nSubject> hi\n");
        assert_eq!(h.current().as_deref(), Some("S"));
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let h = Harness::new();
        h.api.push_start(Ok(started("S", "Who are you?")));
        h.api.push_reply(Err(ApiError::Network("refused".into())));

        let (result, out) = h
            .run(
                Commands::Send {
                    text: vec!["hello".into()],
                },
                "",
            )
            .await;

        assert!(result.is_err());
        assert!(out.contains(notices::CONNECTION_LOST));
    }

    #[tokio::test]
    async fn test_creation_failure_surfaces_restart_hint() {
        let h = Harness::new();
        h.api.push_start(Err(ApiError::Network("refused".into())));

        let (result, _) = h.run(Commands::Status, "").await;
        assert!(result.unwrap_err().to_string().contains("restart nomi"));
    }

    #[tokio::test]
    async fn test_list_marks_current() {
        let h = Harness::new();
        SessionContext::load(h.store.clone()).set("b");
        h.api.set_listing(Ok(vec![
            summary("a", "Mara", SimulationStatus::Active, 12),
            summary("b", "Iris", SimulationStatus::Broken, -150),
        ]));

        let (result, out) = h.run(Commands::List, "").await;
        result.unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("  Mara"));
        assert!(lines[1].starts_with("* Iris"));
        assert!(lines[1].contains("DISCONNECTED"));
    }

    #[tokio::test]
    async fn test_use_switches_known_and_rejects_unknown() {
        let h = Harness::new();
        h.api
            .set_listing(Ok(vec![summary("a", "Mara", SimulationStatus::Active, 0)]));

        let (result, _) = h.run(Commands::Use { id: "a".into() }, "").await;
        result.unwrap();
        assert_eq!(h.current().as_deref(), Some("a"));

        let (result, _) = h.run(Commands::Use { id: "zzz".into() }, "").await;
        assert!(result.is_err());
        assert_eq!(h.current().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let h = Harness::new();
        h.api.push_start(Ok(started("S", "hello")));

        let (result, out) = h.run(Commands::Reset { yes: false }, "n\n").await;
        result.unwrap();
        assert!(out.contains("Aborted."));
        assert!(!h.api.calls().contains(&Call::Reset("S".into())));

        let (result, out) = h.run(Commands::Reset { yes: false }, "y\n").await;
        result.unwrap();
        assert!(out.contains(notices::TIMELINE_RESET));
        assert!(h.api.calls().contains(&Call::Reset("S".into())));
    }

    #[tokio::test]
    async fn test_reset_failure_keeps_history() {
        let h = Harness::new();
        h.api.push_start(Ok(started("S", "hello")));
        h.api.push_reset(Err(ApiError::Server {
            status: 500,
            body: None,
        }));

        let (result, _) = h.run(Commands::Reset { yes: true }, "").await;
        assert!(result.unwrap_err().to_string().contains("Time Machine"));
        assert_eq!(ChatHistoryStore::new(h.store.clone()).load("S")[0].text, "hello");
    }

    #[tokio::test]
    async fn test_new_replaces_current() {
        let h = Harness::new();
        h.api
            .push_start(Ok(started("old", "first")))
            .push_start(Ok(started("new", "second")));
        h.run(Commands::Status, "").await.0.unwrap();

        let (result, out) = h.run(Commands::New, "").await;
        result.unwrap();
        assert!(out.contains("Subject> second"));
        assert_eq!(h.current().as_deref(), Some("new"));
        assert!(ChatHistoryStore::new(h.store.clone()).load("old").is_empty());
        assert_eq!(h.api.count(|c| *c == Call::StartChat), 2);
    }

    #[tokio::test]
    async fn test_oracle_flow_sets_session() {
        let h = Harness::new();
        h.api.set_oracle(
            Ok(OracleScene {
                scenario_text: "A stranger drops a letter.".into(),
            }),
            Ok(VibeAnalysis {
                user_vibe: serde_json::json!({"archetype": "helper"}),
            }),
            Ok(Genesis {
                simulation_id: "g-1".into(),
                persona: serde_json::json!({"name": "Iris"}),
            }),
        );

        let (result, out) = h.run(Commands::Oracle, "I pick it up\n").await;
        result.unwrap();
        assert!(out.contains("Iris is ready"));
        assert_eq!(h.current().as_deref(), Some("g-1"));
        assert!(h.api.calls().contains(&Call::OracleAnalyze {
            scenario: "A stranger drops a letter.".into(),
            reaction: "I pick it up".into()
        }));
    }

    #[tokio::test]
    async fn test_doctor_reports_backend() {
        let h = Harness::new();
        let (result, out) = h.run(Commands::Doctor, "").await;
        result.unwrap();
        assert!(out.contains("database:      connected"));
        assert!(out.contains("Project Nomi 1.0.0"));
        assert!(out.contains("storage:  memory"));
        assert_eq!(h.api.calls(), vec![Call::Diagnostics, Call::ServerConfig]);
    }

    #[tokio::test]
    async fn test_chat_loop_sends_lines_until_eof() {
        let h = Harness::new();
        h.api.push_start(Ok(started("S", "Who are you?")));
        h.api
            .push_reply(Ok(reply_with("nice", None, Some(3))))
            .push_reply(Ok(reply_with("bye", None, Some(-100))));

        let out = h.chat("hello\n\nsecond\nthird\n").await;

        assert!(out.contains("Subject> nice"));
        assert!(out.contains("Connection severed"));
        // Third line was refused locally
        assert_eq!(h.api.count(|c| matches!(c, Call::SendMessage { .. })), 2);
    }
}
