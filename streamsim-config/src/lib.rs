//! Domain-driven configuration for the streaming load simulator
//!
//! Configuration is split by functional domain (clock, backend, warm-up,
//! population controllers, logging, control server), loaded from YAML with
//! `STREAMSIM_*` environment overrides, and validated per domain.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    artists::ArtistsConfig,
    backend::{BackendConfig, RetryConfig},
    clock::ClockConfig,
    countries::CountriesConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    server::ServerConfig,
    user_agent::UserAgentConfig,
    users::UsersConfig,
    warmup::WarmupConfig,
    SimulatorConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
