//! User population controller

use chrono::{Days, NaiveDate};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use streamsim_config::{UserAgentConfig, UsersConfig};
use streamsim_core::ids::UserId;
use streamsim_core::probability::truncated_normal;
use streamsim_core::{Country, SignUp, UserProfile, UserSim, UserTraits};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::agents::{UserAgent, UserAgentHandle, UserAgentState};
use crate::clock::SimSpan;
use crate::context::SimContext;
use crate::error::{AgentError, AgentResult, EngineResult};
use crate::gate::RunGate;
use crate::namegen;
use crate::queue::WorkQueue;
use crate::sampling::{choose_weighted, country_weights};
use crate::schedule::every;

/// Registers new users, picks existing ones to come back, runs their agents
/// and evicts the agents that are done.
pub struct UserController {
    ctx: SimContext,
    config: UsersConfig,
    agent_config: UserAgentConfig,
    warmup_users: usize,
    queue: WorkQueue<UserSim>,
    active: Mutex<HashMap<UserId, UserAgentHandle>>,
    metrics: RwLock<BTreeMap<UserAgentState, usize>>,
    next_agent_id: AtomicU64,
    // `None` once the agents were aborted; no agent is spawned after that
    agents: Mutex<Option<JoinSet<()>>>,
}

impl UserController {
    pub fn new(ctx: SimContext, config: UsersConfig, agent_config: UserAgentConfig, warmup_users: usize) -> Self {
        let queue = WorkQueue::new(config.queue_capacity);
        Self {
            ctx,
            config,
            agent_config,
            warmup_users,
            queue,
            active: Mutex::new(HashMap::new()),
            metrics: RwLock::new(empty_tally()),
            next_agent_id: AtomicU64::new(0),
            agents: Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Register the warm-up users. Returns how many were created.
    pub async fn warmup(&self) -> AgentResult<usize> {
        let countries = self.ctx.client.list_countries(true).await?;
        let mut created = 0;
        for _ in 0..self.warmup_users {
            if let Some(code) = self.choose_country(&countries) {
                self.generate_user(&code).await?;
                created += 1;
            }
        }
        info!(created, requested = self.warmup_users, "Warm-up users generated");
        Ok(created)
    }

    /// Weights are recomputed on every call since they decay with simulated time
    fn choose_country(&self, countries: &[Country]) -> Option<String> {
        let weights = country_weights(
            countries,
            self.ctx.clock.now(),
            self.config.country_weight_half_life_days,
        );
        debug!(?weights, "Recalculated country weights");
        choose_weighted(&weights, true, &mut rand::rng())
    }

    /// Sign up a new user in `country_code` and record its shadow
    pub async fn generate_user(&self, country_code: &str) -> AgentResult<UserSim> {
        let now = self.ctx.clock.now();
        let (sign_up, traits) = {
            let mut rng = rand::rng();
            let first_name = namegen::first_name(&mut rng);
            let last_name = namegen::last_name(&mut rng);
            let age = truncated_normal(
                &mut rng,
                self.config.age_mean,
                self.config.age_sigma,
                self.config.age_min,
                self.config.age_max,
            )?;
            let birth_date = birth_date(&mut rng, now.date_naive(), age)?;
            let sign_up = SignUp {
                email: namegen::email(&mut rng, &first_name, &last_name),
                password: namegen::password(&mut rng),
                country_code: country_code.to_string(),
                profile: UserProfile {
                    first_name,
                    last_name,
                    birth_date,
                },
            };
            let traits = UserTraits::sample(&self.agent_config.traits, &mut rng)?;
            (sign_up, traits)
        };

        info!(email = %sign_up.email, country = country_code, "Signing up a new user");
        let id = self.ctx.client.sign_up(&sign_up).await?;
        let user = UserSim {
            id,
            email: sign_up.email,
            password: sign_up.password,
            country_code: sign_up.country_code,
            is_premium: false,
            traits,
            created_at: now,
        };
        self.ctx.store.insert_user(user.clone()).await?;
        info!(user_id = %id, "User registered");
        Ok(user)
    }

    async fn create_users(&self) -> AgentResult<()> {
        let countries = self.ctx.client.list_countries(true).await?;
        let total: f64 = country_weights(
            &countries,
            self.ctx.clock.now(),
            self.config.country_weight_half_life_days,
        )
        .values()
        .sum();
        let noise: i64 = rand::rng().random_range(-1..=1);
        let count = (total as i64 + noise).max(0);
        info!(count, total_weight = total, "Creating new users");

        for _ in 0..count {
            match self.choose_country(&countries) {
                Some(code) => {
                    let user = self.generate_user(&code).await?;
                    self.queue.push(user).await?;
                }
                None => debug!(queued = self.queue.len(), "Skipped creating a user"),
            }
        }
        Ok(())
    }

    async fn select_users(&self) -> AgentResult<()> {
        let limit = rand::rng().random_range(0..=self.config.max_users_per_selection);
        let users = self.ctx.store.random_users(limit).await?;
        let mut selected = 0;
        for user in users {
            if self.is_active(user.id) {
                continue;
            }
            self.queue.push(user).await?;
            selected += 1;
        }
        debug!(selected, queued = self.queue.len(), "Selected users to run");
        Ok(())
    }

    pub(crate) async fn run_next_user(&self, gate: &RunGate) -> AgentResult<()> {
        let Some(user) = self.queue.try_pop() else {
            debug!("User queue is empty");
            return Ok(());
        };

        let mut agents = self.agents.lock();
        let Some(tasks) = agents.as_mut() else {
            debug!(user_id = %user.id, "User agents were aborted, not running user");
            return Ok(());
        };
        let mut active = self.active.lock();
        if let Some(existing) = active.get(&user.id) {
            info!(user_id = %user.id, agent_id = existing.agent_id(), "User already active");
            return Ok(());
        }
        let agent_id = self.next_agent_id.fetch_add(1, Ordering::Relaxed) + 1;
        let agent = UserAgent::new(agent_id, user, self.ctx.clone(), self.agent_config.clone());
        info!(agent_id, user_id = %agent.user().id, "Running user agent");
        active.insert(agent.user().id, agent.handle());
        tasks.spawn(agent.run(gate.clone()));
        Ok(())
    }

    /// Abort every running agent. Agents are never spawned again afterwards.
    pub fn abort_agents(&self) {
        if let Some(mut tasks) = self.agents.lock().take() {
            info!(running = tasks.len(), "Aborting user agents");
            tasks.abort_all();
        }
    }

    /// Collect finished agent tasks, logging those that panicked
    fn reap_agents(&self) {
        let mut agents = self.agents.lock();
        let Some(tasks) = agents.as_mut() else {
            return;
        };
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!(error = %e, "User agent panicked");
                }
            }
        }
    }

    /// Tally agents per state and evict those that are done. Returns the tally.
    pub fn clean_up(&self) -> BTreeMap<UserAgentState, usize> {
        self.reap_agents();
        let (tally, before, after) = {
            let mut active = self.active.lock();
            let before = active.len();
            let mut tally = empty_tally();
            active.retain(|_, handle| {
                let state = handle.state();
                *tally.entry(state).or_default() += 1;
                !state.is_terminal()
            });
            (tally, before, active.len())
        };
        info!(
            created = tally[&UserAgentState::Created],
            idle = tally[&UserAgentState::Idle],
            listening = tally[&UserAgentState::Listening],
            left = tally[&UserAgentState::Left],
            invalid = tally[&UserAgentState::Invalid],
            evicted = before - after,
            active = after,
            "Cleaned up user agents"
        );
        *self.metrics.write() = tally.clone();
        tally
    }

    /// Per-state tally from the last clean-up
    pub fn metrics(&self) -> BTreeMap<UserAgentState, usize> {
        self.metrics.read().clone()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_active(&self, user_id: UserId) -> bool {
        self.active.lock().contains_key(&user_id)
    }

    pub fn queue(&self) -> &WorkQueue<UserSim> {
        &self.queue
    }

    /// Spawn the create, select, run and clean-up loops
    pub fn spawn_loops(self: &Arc<Self>, gate: &RunGate, tasks: &mut JoinSet<EngineResult<()>>) {
        let delays = [
            self.config.delay_create_secs,
            self.config.delay_select_secs,
            self.config.delay_run_secs,
            self.config.delay_cleanup_secs,
        ]
        .map(|secs| SimSpan::Seconds(secs as f64));

        let (this, gate_) = (self.clone(), gate.clone());
        tasks.spawn(async move {
            every("create_users", &gate_, &this.ctx.clock, delays[0], true, || this.create_users()).await
        });

        let (this, gate_) = (self.clone(), gate.clone());
        tasks.spawn(async move {
            every("select_users", &gate_, &this.ctx.clock, delays[1], true, || this.select_users()).await
        });

        let (this, gate_) = (self.clone(), gate.clone());
        tasks.spawn(async move {
            every("run_users", &gate_, &this.ctx.clock, delays[2], true, || {
                this.run_next_user(&gate_)
            })
            .await
        });

        let (this, gate_) = (self.clone(), gate.clone());
        tasks.spawn(async move {
            let clean = &this;
            every("clean_up_users", &gate_, &this.ctx.clock, delays[3], true, move || async move {
                clean.clean_up();
                Ok(())
            })
            .await
        });
    }
}

fn empty_tally() -> BTreeMap<UserAgentState, usize> {
    UserAgentState::all().iter().map(|s| (*s, 0)).collect()
}

/// A birth date `age_years` before `today`, anywhere within that year of age
fn birth_date<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate, age_years: f64) -> AgentResult<NaiveDate> {
    let days = (age_years.max(0.0).floor() * 365.25) as u64 + rng.random_range(0..365);
    today
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| AgentError::Other(format!("no date {} days before {}", days, today)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;
    use streamsim_http::testing::FakeBackend;
    use streamsim_http::ServiceClient;
    use streamsim_storage::InMemoryEntityStore;

    async fn controller(agent_config: UserAgentConfig) -> UserController {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(SimClock::new(start, 3600.0).unwrap());
        let backend = Arc::new(FakeBackend::new(clock.clone()));
        backend.add_country("SE", "Sweden").await.unwrap();
        backend.enable_country("SE").await.unwrap();
        let ctx = SimContext::new(backend, Arc::new(InMemoryEntityStore::new()), clock);
        UserController::new(ctx, UsersConfig::default(), agent_config, 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_is_never_run_twice() {
        let users = controller(UserAgentConfig::default()).await;
        let gate = RunGate::new();
        let user = users.generate_user("SE").await.unwrap();

        users.queue().push(user.clone()).await.unwrap();
        users.queue().push(user.clone()).await.unwrap();
        users.run_next_user(&gate).await.unwrap();
        users.run_next_user(&gate).await.unwrap();

        assert_eq!(users.active_count(), 1);
        assert!(users.is_active(user.id));
        assert!(users.queue().is_empty());
        users.abort_agents();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_up_evicts_users_who_left() {
        let agent_config = UserAgentConfig {
            prob_leave_session: 1.0,
            ..UserAgentConfig::default()
        };
        let users = controller(agent_config).await;
        let gate = RunGate::new();
        for _ in 0..2 {
            let user = users.generate_user("SE").await.unwrap();
            users.queue().push(user).await.unwrap();
            users.run_next_user(&gate).await.unwrap();
        }

        let tally = users.clean_up();
        assert_eq!(tally[&UserAgentState::Created], 2);
        assert_eq!(users.active_count(), 2);

        gate.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let tally = users.clean_up();
        assert_eq!(tally[&UserAgentState::Left], 2);
        assert_eq!(tally.values().sum::<usize>(), 2);
        assert_eq!(users.active_count(), 0);
        assert_eq!(users.metrics(), tally);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_agents_are_evicted_as_invalid() {
        let users = controller(UserAgentConfig::default()).await;
        let gate = RunGate::new();
        let user = users.generate_user("SE").await.unwrap();
        users.queue().push(user.clone()).await.unwrap();
        users.run_next_user(&gate).await.unwrap();
        assert_eq!(users.active_count(), 1);

        users.abort_agents();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let tally = users.clean_up();
        assert_eq!(tally[&UserAgentState::Invalid], 1);
        assert_eq!(users.active_count(), 0);

        // no agent is started once they were aborted
        users.queue().push(user).await.unwrap();
        users.run_next_user(&gate).await.unwrap();
        assert_eq!(users.active_count(), 0);
    }

    #[test]
    fn test_birth_date_matches_age() {
        let mut rng = StdRng::seed_from_u64(12);
        let today = NaiveDate::from_ymd_opt(2030, 5, 17).unwrap();
        for _ in 0..500 {
            let born = birth_date(&mut rng, today, 28.4).unwrap();
            let age = today.years_since(born).unwrap();
            assert!((27..=29).contains(&age), "age {}", age);
        }
    }

    #[test]
    fn test_empty_tally_covers_all_states() {
        let tally = empty_tally();
        assert_eq!(tally.len(), UserAgentState::all().len());
        assert!(tally.values().all(|n| *n == 0));
    }
}
