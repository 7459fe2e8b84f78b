//! Warm-up (initial population) configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Sizes of the population created before continuous simulation starts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,
    pub num_countries: usize,
    pub num_countries_enabled: usize,
    pub num_artists: usize,
    pub num_users: usize,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_countries: 10,
            num_countries_enabled: 5,
            num_artists: 100,
            num_users: 50,
        }
    }
}

impl Validatable for WarmupConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.num_countries_enabled > self.num_countries {
            return Err(self.validation_error(format!(
                "num_countries_enabled ({}) cannot exceed num_countries ({})",
                self.num_countries_enabled, self.num_countries
            )));
        }

        // Artists and users can only be placed in enabled countries
        if self.enabled
            && self.num_countries_enabled == 0
            && (self.num_artists > 0 || self.num_users > 0)
        {
            return Err(self.validation_error(
                "at least one country must be enabled to warm up artists or users",
            ));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "warmup"
    }
}
