//! Simulation engine
//!
//! Owns the clock, the run gate and the three population controllers.
//! [`Engine::run`] performs the warm-up and then drives every periodic loop
//! as one task group; [`EngineHandle`] is the cross-task control surface.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamsim_config::SimulatorConfig;
use streamsim_core::SimTime;
use streamsim_http::ServiceClient;
use streamsim_storage::EntityStore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::clock::SimClock;
use crate::context::SimContext;
use crate::controllers::{ArtistController, CountryController, UserController};
use crate::error::{EngineError, EngineResult};
use crate::gate::RunGate;

/// Snapshot served by the control surface
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub multiplier: f64,
    pub sim_time: SimTime,
    pub active_agents: usize,
    /// Per-state tally from the last clean-up pass
    pub agent_states: BTreeMap<String, usize>,
}

/// Start, stop and speed control, callable from any task or thread
#[derive(Clone)]
pub struct EngineHandle {
    gate: RunGate,
    clock: Arc<SimClock>,
    users: Arc<UserController>,
}

impl EngineHandle {
    pub fn start(&self) -> EngineResult<()> {
        self.gate.start()?;
        info!(sim_time = %self.clock.now(), "Simulation started");
        Ok(())
    }

    pub fn stop(&self) -> EngineResult<()> {
        self.gate.stop()?;
        info!(sim_time = %self.clock.now(), "Simulation stopped");
        Ok(())
    }

    /// Change the clock multiplier. Simulated time already accrued is kept.
    pub fn set_speed(&self, multiplier: f64) -> EngineResult<()> {
        self.clock.set_multiplier(multiplier)
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_open()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.gate.is_open(),
            multiplier: self.clock.multiplier(),
            sim_time: self.clock.now(),
            active_agents: self.users.active_count(),
            agent_states: self
                .users
                .metrics()
                .into_iter()
                .map(|(state, count)| (state.as_str().to_string(), count))
                .collect(),
        }
    }
}

/// Aborts the user agents when `run` returns or its future is dropped
struct AbortAgentsOnDrop<'a>(&'a UserController);

impl Drop for AbortAgentsOnDrop<'_> {
    fn drop(&mut self) {
        self.0.abort_agents();
    }
}

pub struct Engine {
    config: SimulatorConfig,
    started: AtomicBool,
    gate: RunGate,
    ctx: SimContext,
    countries: Arc<CountryController>,
    artists: Arc<ArtistController>,
    users: Arc<UserController>,
}

impl Engine {
    /// Build an engine around its collaborators. The engine starts stopped.
    pub fn new(
        config: SimulatorConfig,
        clock: Arc<SimClock>,
        client: Arc<dyn ServiceClient>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        let ctx = SimContext::new(client, store, clock);
        let countries = Arc::new(CountryController::new(
            ctx.clone(),
            &config.warmup,
            config.countries.clone(),
        ));
        let artists = Arc::new(ArtistController::new(
            ctx.clone(),
            config.artists.clone(),
            config.warmup.num_artists,
            config.users.country_weight_half_life_days,
        ));
        let users = Arc::new(UserController::new(
            ctx.clone(),
            config.users.clone(),
            config.user_agent.clone(),
            config.warmup.num_users,
        ));

        Self {
            config,
            started: AtomicBool::new(false),
            gate: RunGate::new(),
            ctx,
            countries,
            artists,
            users,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            gate: self.gate.clone(),
            clock: self.ctx.clock.clone(),
            users: self.users.clone(),
        }
    }

    pub fn clock(&self) -> &Arc<SimClock> {
        &self.ctx.clock
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    pub fn countries(&self) -> &Arc<CountryController> {
        &self.countries
    }

    pub fn artists(&self) -> &Arc<ArtistController> {
        &self.artists
    }

    pub fn users(&self) -> &Arc<UserController> {
        &self.users
    }

    /// Pre-populate countries, then artists, then users
    pub async fn warmup(&self) -> EngineResult<()> {
        info!(
            countries = self.config.warmup.num_countries,
            enabled = self.config.warmup.num_countries_enabled,
            artists = self.config.warmup.num_artists,
            users = self.config.warmup.num_users,
            "Starting warm-up"
        );

        self.countries
            .warmup()
            .await
            .map_err(|e| EngineError::Warmup(format!("countries: {}", e)))?;
        let (artists, collections) = self
            .artists
            .warmup()
            .await
            .map_err(|e| EngineError::Warmup(format!("artists: {}", e)))?;
        let users = self
            .users
            .warmup()
            .await
            .map_err(|e| EngineError::Warmup(format!("users: {}", e)))?;

        info!(artists, collections, users, sim_time = %self.ctx.clock.now(), "Warm-up complete");
        Ok(())
    }

    /// Warm up if configured, then run every loop until one of them fails.
    ///
    /// Loops idle until the gate is opened through a handle. An engine runs
    /// once; a second call fails with [`EngineError::AlreadyStarted`]. The
    /// user agents are aborted together with the loops.
    pub async fn run(&self) -> EngineResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        let _agents = AbortAgentsOnDrop(&self.users);

        if self.config.warmup.enabled {
            self.warmup().await?;
        } else {
            info!("Warm-up disabled");
        }

        let mut tasks = JoinSet::new();
        tasks.spawn(
            self.ctx
                .clock
                .clone()
                .run_resync(self.gate.clone(), self.config.clock.resync_interval_secs),
        );
        tasks.spawn(
            self.ctx
                .clock
                .clone()
                .run_report(self.gate.clone(), self.config.clock.report_interval_secs),
        );
        self.countries.spawn_loops(&self.gate, &mut tasks);
        self.artists.spawn_loops(&self.gate, &mut tasks);
        self.users.spawn_loops(&self.gate, &mut tasks);
        info!(tasks = tasks.len(), "Simulation loops spawned");

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => EngineError::Task(e.to_string()),
            };
            error!(error = %failure, "Simulation loop failed, aborting the rest");
            tasks.abort_all();
            return Err(failure);
        }

        warn!("All simulation loops finished");
        Ok(())
    }
}
