//! Simulation runtime for the streaming load simulator
//!
//! This crate provides the simulated clock, the run gate every loop waits
//! on, the user agent state machine and the population controllers that
//! create, select and run users, artists and countries.

pub mod agents;
pub mod catalogue;
pub mod clock;
pub mod context;
pub mod controllers;
pub mod engine;
pub mod error;
pub mod gate;
pub mod namegen;
pub mod queue;
pub mod sampling;
pub(crate) mod schedule;

// Re-export commonly used types
pub use agents::{UserAgent, UserAgentEvent, UserAgentHandle, UserAgentState};
pub use clock::{SimClock, SimSpan};
pub use context::SimContext;
pub use controllers::{ArtistController, CountryController, UserController};
pub use engine::{Engine, EngineHandle, EngineStatus};
pub use error::{AgentError, AgentResult, EngineError, EngineResult};
pub use gate::RunGate;
pub use queue::WorkQueue;
