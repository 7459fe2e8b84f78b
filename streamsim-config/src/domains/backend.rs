//! Backend (exercised service) connection configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the exercised backend lives and how hard to try reaching it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend API
    pub base_url: String,

    /// Per-request timeout
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub timeout: Duration,

    /// User agent sent with every request
    pub user_agent: String,

    /// Header carrying the simulated "now" on every request
    pub time_override_header: String,

    /// Retry behaviour on transport failures
    pub retry: RetryConfig,
}

/// Retry budget and randomized exponential backoff bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    #[serde(with = "crate::domains::utils::serde_duration")]
    pub initial_delay: Duration,

    #[serde(with = "crate::domains::utils::serde_duration")]
    pub max_delay: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("streamsim/{}", env!("CARGO_PKG_VERSION")),
            time_override_header: "Override-Current-Time".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl Validatable for BackendConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.user_agent, "user_agent", self.domain_name())?;
        validate_required_string(
            &self.time_override_header,
            "time_override_header",
            self.domain_name(),
        )?;

        if self.timeout.is_zero() {
            return Err(self.validation_error("timeout must be greater than 0"));
        }

        self.retry.validate()
    }

    fn domain_name(&self) -> &'static str {
        "backend"
    }
}

impl Validatable for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_attempts, "max_attempts", self.domain_name())?;
        if self.initial_delay > self.max_delay {
            return Err(self.validation_error(format!(
                "initial_delay ({:?}) exceeds max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "backend.retry"
    }
}
