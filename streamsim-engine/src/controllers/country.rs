//! Country rollout controller

use rand::seq::IndexedRandom;
use std::sync::Arc;
use streamsim_config::{CountriesConfig, WarmupConfig};
use streamsim_core::Country;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::catalogue::COUNTRIES;
use crate::clock::SimSpan;
use crate::context::SimContext;
use crate::error::{AgentError, AgentResult, EngineResult};
use crate::gate::RunGate;
use crate::schedule::every;

/// Adds countries to the backend and enables one more every few simulated days
pub struct CountryController {
    ctx: SimContext,
    num_countries: usize,
    num_enabled: usize,
    config: CountriesConfig,
}

impl CountryController {
    pub fn new(ctx: SimContext, warmup: &WarmupConfig, config: CountriesConfig) -> Self {
        Self {
            ctx,
            num_countries: warmup.num_countries,
            num_enabled: warmup.num_countries_enabled,
            config,
        }
    }

    /// Add `num_countries` random catalogue countries and enable `num_countries_enabled` of them
    pub async fn warmup(&self) -> AgentResult<()> {
        if self.num_countries > COUNTRIES.len() {
            return Err(AgentError::Other(format!(
                "{} countries requested but the catalogue has {}",
                self.num_countries,
                COUNTRIES.len()
            )));
        }
        if self.num_enabled > self.num_countries {
            return Err(AgentError::Other(format!(
                "cannot enable {} of {} countries",
                self.num_enabled, self.num_countries
            )));
        }

        let selected: Vec<(&str, &str)> = COUNTRIES
            .choose_multiple(&mut rand::rng(), self.num_countries)
            .copied()
            .collect();
        debug!(?selected, "Countries selected for addition");
        for (code, name) in &selected {
            self.ctx.client.add_country(code, name).await?;
        }

        let mut codes: Vec<String> = self
            .ctx
            .client
            .list_countries(false)
            .await?
            .into_iter()
            .map(|c| c.code)
            .collect();
        codes.sort();
        let to_enable: Vec<String> = codes
            .choose_multiple(&mut rand::rng(), self.num_enabled)
            .cloned()
            .collect();
        debug!(?to_enable, "Countries selected to enable");
        for code in &to_enable {
            self.ctx.client.enable_country(code).await?;
        }

        info!(added = selected.len(), enabled = to_enable.len(), "Warm-up countries generated");
        Ok(())
    }

    /// Enable one random disabled country, if any is left. Returns its code.
    pub async fn enable_next(&self) -> AgentResult<Option<String>> {
        let countries = self.ctx.client.list_countries(false).await?;
        let disabled: Vec<&Country> = countries.iter().filter(|c| !c.is_enabled()).collect();
        let Some(code) = disabled.choose(&mut rand::rng()).map(|c| c.code.clone()) else {
            info!("No country left to enable");
            return Ok(None);
        };

        self.ctx.client.enable_country(&code).await?;
        info!(country = %code, sim_time = %self.ctx.clock.now(), "Enabled new country");
        Ok(Some(code))
    }

    /// Spawn the enable loop
    pub fn spawn_loops(self: &Arc<Self>, gate: &RunGate, tasks: &mut JoinSet<EngineResult<()>>) {
        let (this, gate) = (self.clone(), gate.clone());
        let span = SimSpan::Days(self.config.enable_delay_days as f64);
        tasks.spawn(async move {
            let controller = &this;
            every("enable_country", &gate, &this.ctx.clock, span, true, move || async move {
                controller.enable_next().await.map(|_| ())
            })
            .await
        });
    }
}
