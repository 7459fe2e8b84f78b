//! Resilience patterns for calls to the exercised backend
//!
//! This crate provides retry policies with pluggable backoff strategies,
//! including the randomized exponential backoff used by the service client.

pub mod backoff;
pub mod retry;

// Re-export commonly used types
pub use backoff::{BackoffCalculator, BackoffStrategy};
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryable};
