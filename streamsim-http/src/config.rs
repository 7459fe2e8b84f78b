//! Service client configuration

use std::time::Duration;
use streamsim_config::BackendConfig;
use streamsim_resilience::RetryPolicy;

/// Settings of the backend service client
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Header carrying the simulated "now"
    pub time_override_header: String,

    /// Retry policy applied to every call
    pub retry: RetryPolicy,
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

impl From<&BackendConfig> for ServiceClientConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            time_override_header: config.time_override_header.clone(),
            retry: RetryPolicy::random_exponential(
                config.retry.max_attempts,
                config.retry.initial_delay,
                config.retry.max_delay,
            ),
        }
    }
}
