//! Client-side session logic
//!
//! # Architecture
//!
//! ```text
//! Lifecycle (owns SessionContext)
//! ├── Conversation      one simulation's transcript + status, chat turns, reset
//! └── SimulationPicker  remote listing, switch / detach
//! ```
//!
//! Every transition that talks to the backend comes in two halves: a
//! synchronous `begin_*` that validates and applies the optimistic part, and
//! an `on_*` / `complete_*` that applies the remote result. The TUI runs the
//! call in between on a spawned task; headless commands and tests use the
//! `async` helpers that drive both halves.

mod conversation;
mod lifecycle;
mod model;
mod picker;

pub use conversation::{Blocked, Conversation, PendingSend, ResetError};
pub use lifecycle::{Lifecycle, Phase, Step};
pub use model::{
    Message, MessageKind, SimulationStatus, UNNAMED_PERSONA,
};
pub use picker::SimulationPicker;

/// Transcript texts the client writes itself
pub mod notices {
    pub const CONNECTION_LOST: &str = "Error: Connection lost.";
    pub const TIMELINE_RESET: &str = "TIMELINE RESET. CONNECTION RE-ESTABLISHED.";
    pub const CONNECTION_SEVERED: &str = "CONNECTION SEVERED. USER HAS BLOCKED YOU.";
    pub const OFFLINE_RESUME: &str =
        "Could not reach the server. Showing saved history; status may be out of date.";
    pub const NOT_FOUND_REMOTELY: &str =
        "This simulation is unknown to the server. Pick another one or start a new persona.";

    pub fn greeting(name: &str) -> String {
        format!("Connection established with {}.", name)
    }
}
