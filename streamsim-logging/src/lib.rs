//! Logging setup for the simulator
//!
//! All crates log through `tracing`. This crate installs the global
//! subscriber from a [`LoggingConfig`](streamsim_config::LoggingConfig).

pub mod init;

pub use init::{build_filter, init_logging, init_simple_tracing};
