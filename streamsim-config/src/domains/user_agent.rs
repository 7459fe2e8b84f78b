//! Per-user behaviour configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_probability, Validatable};
use serde::{Deserialize, Serialize};
use streamsim_core::TraitProfile;

/// Probabilities and pacing of a single simulated listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Simulated seconds an agent rests between decisions
    pub delay_between_states_secs: u64,

    pub prob_leave_session: f64,
    pub prob_subscription: f64,

    /// Distributions the behavioural traits are drawn from
    pub traits: TraitProfile,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            delay_between_states_secs: 10,
            prob_leave_session: 0.1,
            prob_subscription: 0.01,
            traits: TraitProfile::default(),
        }
    }
}

impl Validatable for UserAgentConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_positive(
            self.delay_between_states_secs,
            "delay_between_states_secs",
            domain,
        )?;
        validate_probability(self.prob_leave_session, "prob_leave_session", domain)?;
        validate_probability(self.prob_subscription, "prob_subscription", domain)?;

        for (name, dist) in self.traits.all() {
            dist.validate()
                .map_err(|e| self.validation_error(format!("traits.{}: {}", name, e)))?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "user_agent"
    }
}
