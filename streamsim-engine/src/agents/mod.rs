//! Per-actor agents

pub mod user;

pub use user::{skip_time, transition, UserAgent, UserAgentEvent, UserAgentHandle, UserAgentState};
