//! Configuration loading and environment variable handling

use crate::domains::logging::{LogFormat, LogLevel};
use crate::domains::SimulatorConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "STREAMSIM".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SimulatorConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SimulatorConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SimulatorConfig> {
        let mut config = SimulatorConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SimulatorConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SimulatorConfig) -> ConfigResult<()> {
        self.apply_clock_overrides(&mut config.clock)?;
        self.apply_backend_overrides(&mut config.backend)?;
        self.apply_warmup_overrides(&mut config.warmup)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_server_overrides(&mut config.server)?;
        Ok(())
    }

    fn apply_clock_overrides(
        &self,
        config: &mut crate::domains::clock::ClockConfig,
    ) -> ConfigResult<()> {
        if let Some(multiplier) = self.parse_env_var("CLOCK_MULTIPLIER")? {
            config.multiplier = multiplier;
        }
        Ok(())
    }

    fn apply_backend_overrides(
        &self,
        config: &mut crate::domains::backend::BackendConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("BACKEND_URL") {
            config.base_url = url;
        }

        if let Some(seconds) = self.parse_env_var::<u64>("BACKEND_TIMEOUT")? {
            config.timeout = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    fn apply_warmup_overrides(
        &self,
        config: &mut crate::domains::warmup::WarmupConfig,
    ) -> ConfigResult<()> {
        if let Some(enabled) = self.parse_env_var("WARMUP_ENABLED")? {
            config.enabled = enabled;
        }
        if let Some(n) = self.parse_env_var("WARMUP_NUM_OF_COUNTRIES")? {
            config.num_countries = n;
        }
        if let Some(n) = self.parse_env_var("WARMUP_NUM_OF_COUNTRIES_ENABLED")? {
            config.num_countries_enabled = n;
        }
        if let Some(n) = self.parse_env_var("WARMUP_NUM_OF_ARTISTS")? {
            config.num_artists = n;
        }
        if let Some(n) = self.parse_env_var("WARMUP_NUM_OF_USERS")? {
            config.num_users = n;
        }
        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Some(port) = self.parse_env_var("SERVER_PORT")? {
            config.port = port;
        }

        Ok(())
    }

    /// Read and parse an optional variable, naming it in the error
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
