//! Per-simulation chat transcripts

use super::{SharedStore, StorageError};
use crate::session::Message;

/// Key prefix for transcripts; the simulation id is appended verbatim
const HISTORY_KEY_PREFIX: &str = "chat_history_";

/// Loads and saves transcripts keyed by simulation id
///
/// Errors never escape this type: a failed load is an empty transcript and a
/// failed save is a log line.
#[derive(Clone)]
pub struct ChatHistoryStore {
    store: SharedStore,
}

impl ChatHistoryStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn key(simulation_id: &str) -> String {
        format!("{}{}", HISTORY_KEY_PREFIX, simulation_id)
    }

    /// Stored transcript for `simulation_id`, oldest first; empty if none
    pub fn load(&self, simulation_id: &str) -> Vec<Message> {
        match self.try_load(simulation_id) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to load history for {}: {}", simulation_id, e);
                Vec::new()
            }
        }
    }

    fn try_load(&self, simulation_id: &str) -> Result<Vec<Message>, StorageError> {
        match self.store.get(&Self::key(simulation_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the full transcript
    ///
    /// An empty list is never written, so a transient empty state can't wipe a
    /// transcript saved earlier. Use [`clear`](Self::clear) to delete one.
    pub fn save(&self, simulation_id: &str, messages: &[Message]) {
        if messages.is_empty() {
            return;
        }
        if let Err(e) = self.try_save(simulation_id, messages) {
            tracing::warn!("Failed to save history for {}: {}", simulation_id, e);
        }
    }

    fn try_save(&self, simulation_id: &str, messages: &[Message]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(messages)?;
        self.store.set(&Self::key(simulation_id), &raw)
    }

    /// Delete the stored transcript
    pub fn clear(&self, simulation_id: &str) {
        if let Err(e) = self.store.remove(&Self::key(simulation_id)) {
            tracing::warn!("Failed to clear history for {}: {}", simulation_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageKind;
    use crate::storage::{KeyValueStore, MemoryStore, SqliteStore, UnavailableStore};
    use std::sync::Arc;

    fn sample() -> Vec<Message> {
        vec![
            Message::user("hello"),
            Message::system("time passes"),
            Message::ai("hi"),
        ]
    }

    #[test]
    fn test_round_trip_preserves_order_ids_and_kinds() {
        let history = ChatHistoryStore::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let messages = sample();

        history.save("S", &messages);
        let loaded = history.load("S");

        assert_eq!(loaded, messages);
        assert_eq!(
            loaded.iter().map(|m| m.kind).collect::<Vec<_>>(),
            vec![MessageKind::User, MessageKind::System, MessageKind::Ai]
        );
    }

    #[test]
    fn test_transcripts_are_scoped_by_simulation() {
        let history = ChatHistoryStore::new(Arc::new(MemoryStore::new()));
        history.save("a", &[Message::user("for a")]);
        history.save("b", &[Message::user("for b")]);

        assert_eq!(history.load("a")[0].text, "for a");
        assert_eq!(history.load("b")[0].text, "for b");
        assert!(history.load("c").is_empty());
    }

    #[test]
    fn test_empty_save_keeps_previous_transcript() {
        let history = ChatHistoryStore::new(Arc::new(MemoryStore::new()));
        history.save("S", &sample());
        history.save("S", &[]);
        assert_eq!(history.load("S").len(), 3);
    }

    #[test]
    fn test_clear_removes_transcript() {
        let history = ChatHistoryStore::new(Arc::new(MemoryStore::new()));
        history.save("S", &sample());
        history.clear("S");
        assert!(history.load("S").is_empty());
    }

    #[test]
    fn test_corrupt_transcript_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set("chat_history_S", "{not json").unwrap();
        let history = ChatHistoryStore::new(store);
        assert!(history.load("S").is_empty());
    }

    #[test]
    fn test_unavailable_store_degrades_silently() {
        let history = ChatHistoryStore::new(Arc::new(UnavailableStore));
        history.save("S", &sample());
        history.clear("S");
        assert!(history.load("S").is_empty());
    }
}
