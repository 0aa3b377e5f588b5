//! Remote simulation listing and switching

use crate::api::{ApiError, SimulationApi, SimulationSummary};
use crate::storage::SessionContext;

/// List of simulations known to the backend, with a cursor
#[derive(Debug, Default)]
pub struct SimulationPicker {
    simulations: Vec<SimulationSummary>,
    selected: usize,
    loading: bool,
    error: Option<String>,
}

impl SimulationPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulations(&self) -> &[SimulationSummary] {
        &self.simulations
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&SimulationSummary> {
        self.simulations.get(self.selected)
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Apply a listing, keeping the cursor on `current` when it's present
    pub fn on_listed(
        &mut self,
        result: Result<Vec<SimulationSummary>, ApiError>,
        current: Option<&str>,
    ) {
        self.loading = false;
        match result {
            Ok(simulations) => {
                tracing::debug!("Listed {} simulations", simulations.len());
                self.selected = current
                    .and_then(|id| simulations.iter().position(|s| s.id == id))
                    .unwrap_or(0);
                self.simulations = simulations;
            }
            Err(e) => {
                tracing::warn!("Could not list simulations: {}", e);
                self.error = Some(format!("Failed to load simulations: {}", e));
            }
        }
    }

    pub async fn load<A: SimulationApi>(&mut self, api: &A, current: Option<&str>) {
        self.begin_load();
        let result = api.list_simulations().await;
        self.on_listed(result, current);
    }

    pub fn select_next(&mut self) {
        if !self.simulations.is_empty() {
            self.selected = (self.selected + 1) % self.simulations.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.simulations.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.simulations.len() - 1);
        }
    }

    /// Make the highlighted simulation current; returns its id
    ///
    /// No history is fetched here: the lifecycle loads the transcript when
    /// it next initializes.
    pub fn activate(&self, session: &mut SessionContext) -> Option<String> {
        let chosen = self.selected()?;
        tracing::info!("Switching to simulation {}", chosen.id);
        session.set(&chosen.id);
        Some(chosen.id.clone())
    }

    /// Make `id` current, whether or not it was listed
    pub fn activate_id(session: &mut SessionContext, id: &str) {
        tracing::info!("Switching to simulation {}", id);
        session.set(id);
    }

    /// Forget the current simulation so the next launch creates a new one
    pub fn detach(session: &mut SessionContext) {
        tracing::info!("Detaching from current simulation");
        session.clear();
    }
}
