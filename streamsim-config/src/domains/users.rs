//! User population controller configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Cadence and demographics of the user population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub age_mean: f64,
    pub age_sigma: f64,
    pub age_min: f64,
    pub age_max: f64,

    /// Days after which a country's pull on new users halves
    pub country_weight_half_life_days: f64,

    /// Capacity of the selected-users queue
    pub queue_capacity: usize,

    /// Upper bound of users picked per selection round
    pub max_users_per_selection: usize,

    pub delay_create_secs: u64,
    pub delay_select_secs: u64,
    pub delay_run_secs: u64,
    pub delay_cleanup_secs: u64,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            age_mean: 28.0,
            age_sigma: 12.0,
            age_min: 16.0,
            age_max: 100.0,
            country_weight_half_life_days: 14.0,
            queue_capacity: 100,
            max_users_per_selection: 5,
            delay_create_secs: 3600,
            delay_select_secs: 60,
            delay_run_secs: 70,
            delay_cleanup_secs: 120,
        }
    }
}

impl Validatable for UsersConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_positive(self.age_sigma, "age_sigma", domain)?;
        if self.age_min > self.age_max {
            return Err(self.validation_error(format!(
                "age_min ({}) cannot exceed age_max ({})",
                self.age_min, self.age_max
            )));
        }
        validate_positive(
            self.country_weight_half_life_days,
            "country_weight_half_life_days",
            domain,
        )?;
        validate_positive(self.queue_capacity, "queue_capacity", domain)?;
        validate_positive(self.max_users_per_selection, "max_users_per_selection", domain)?;
        validate_positive(self.delay_create_secs, "delay_create_secs", domain)?;
        validate_positive(self.delay_select_secs, "delay_select_secs", domain)?;
        validate_positive(self.delay_run_secs, "delay_run_secs", domain)?;
        validate_positive(self.delay_cleanup_secs, "delay_cleanup_secs", domain)?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "users"
    }
}
