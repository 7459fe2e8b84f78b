//! Country controller configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountriesConfig {
    /// Simulated days between enabling two countries
    pub enable_delay_days: u64,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            enable_delay_days: 30,
        }
    }
}

impl Validatable for CountriesConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.enable_delay_days, "enable_delay_days", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "countries"
    }
}
