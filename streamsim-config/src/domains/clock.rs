//! Simulation clock configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Speed and housekeeping cadence of the simulated clock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Simulated seconds per real second
    pub multiplier: f64,

    /// Simulated seconds between anchor resyncs
    pub resync_interval_secs: u64,

    /// Simulated seconds between "current time" log lines
    pub report_interval_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            multiplier: 3600.0,
            resync_interval_secs: 60,
            report_interval_secs: 3600,
        }
    }
}

impl Validatable for ClockConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.multiplier.is_finite() {
            return Err(self.validation_error("multiplier must be finite"));
        }
        validate_positive(self.multiplier, "multiplier", self.domain_name())?;
        validate_positive(self.resync_interval_secs, "resync_interval_secs", self.domain_name())?;
        validate_positive(self.report_interval_secs, "report_interval_secs", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "clock"
    }
}
