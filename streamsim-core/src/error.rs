//! Core error types

use thiserror::Error;

/// Core error type shared by the simulator crates
#[derive(Debug, Error)]
pub enum CoreError {
    /// A probability or distribution parameter is out of range
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// A record referenced by id does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
