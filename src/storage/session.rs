//! The current-simulation pointer

use super::SharedStore;

/// Key under which the current simulation id is stored
const SESSION_KEY: &str = "simulation_id";

/// Explicit owner of "which simulation is current"
///
/// Holds the persisted pointer plus an in-memory copy. The lifecycle
/// controller owns one of these and hands it to whoever needs to switch or
/// clear the current simulation; nothing reads the pointer from ambient
/// state.
///
/// Storage failures are logged and otherwise ignored: a failed read means
/// "no session", a failed write still updates the in-memory pointer so the
/// running app stays usable.
#[derive(Clone)]
pub struct SessionContext {
    store: SharedStore,
    current: Option<String>,
}

impl SessionContext {
    /// Create a context and read the persisted pointer
    pub fn load(store: SharedStore) -> Self {
        let mut ctx = Self {
            store,
            current: None,
        };
        ctx.current = ctx.read();
        ctx
    }

    fn read(&self) -> Option<String> {
        match self.store.get(SESSION_KEY) {
            Ok(id) => id.filter(|id| !id.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to load simulation id: {}", e);
                None
            }
        }
    }

    /// Re-read the persisted pointer (another process may have changed it)
    pub fn refresh(&mut self) -> Option<&str> {
        self.current = self.read();
        self.current.as_deref()
    }

    /// The current simulation id, if any
    pub fn get(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Persist `id` and make it current
    pub fn set(&mut self, id: &str) {
        if let Err(e) = self.store.set(SESSION_KEY, id) {
            tracing::warn!("Failed to save simulation id: {}", e);
        }
        self.current = Some(id.to_string());
    }

    /// Forget the current simulation (the simulation itself is untouched)
    pub fn clear(&mut self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!("Failed to remove simulation id: {}", e);
        }
        self.current = None;
    }
}
