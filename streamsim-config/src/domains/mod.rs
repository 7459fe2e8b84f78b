//! Domain-specific configuration modules

pub mod artists;
pub mod backend;
pub mod clock;
pub mod countries;
pub mod logging;
pub mod server;
pub mod user_agent;
pub mod users;
pub mod utils;
pub mod warmup;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main simulator configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub clock: clock::ClockConfig,

    #[serde(default)]
    pub backend: backend::BackendConfig,

    #[serde(default)]
    pub warmup: warmup::WarmupConfig,

    #[serde(default)]
    pub users: users::UsersConfig,

    #[serde(default)]
    pub user_agent: user_agent::UserAgentConfig,

    #[serde(default)]
    pub artists: artists::ArtistsConfig,

    #[serde(default)]
    pub countries: countries::CountriesConfig,

    #[serde(default)]
    pub logging: logging::LoggingConfig,

    #[serde(default)]
    pub server: server::ServerConfig,
}

impl SimulatorConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.clock.validate()?;
        self.backend.validate()?;
        self.warmup.validate()?;
        self.users.validate()?;
        self.user_agent.validate()?;
        self.artists.validate()?;
        self.countries.validate()?;
        self.logging.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SimulatorConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
