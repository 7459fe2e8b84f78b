//! Storage error types

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Entity not found
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Duplicate key constraint violation
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Generic storage errors
    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
