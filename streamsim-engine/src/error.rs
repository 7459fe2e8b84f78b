//! Engine error types

use streamsim_core::CoreError;
use streamsim_http::HttpError;
use streamsim_storage::StorageError;
use thiserror::Error;

/// Errors surfaced to the engine's caller
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Engine is not running")]
    NotRunning,

    #[error("Invalid clock multiplier: {0}")]
    InvalidMultiplier(f64),

    #[error("Engine loops are already running")]
    AlreadyStarted,

    #[error("Warm-up failed: {0}")]
    Warmup(String),

    #[error("Simulation task failed: {0}")]
    Task(String),
}

/// Failure of one agent step or one controller iteration
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Backend call failed: {0}")]
    Service(#[from] HttpError),

    #[error("Store access failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("User is not signed in")]
    NotSignedIn,

    #[error("Work queue closed")]
    QueueClosed,

    #[error("{0}")]
    Other(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
pub type AgentResult<T> = std::result::Result<T, AgentError>;
