//! Simulated listener
//!
//! A [`UserAgent`] signs in once, then alternates between choosing music
//! while idle and playing its queue, until it leaves or fails. The state
//! machine itself is the pure [`transition`] function; the agent performs
//! the I/O that produces each [`UserAgentEvent`] and publishes its state on
//! a watch channel so its controller can observe it without owning it.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use streamsim_config::UserAgentConfig;
use streamsim_core::ids::{ArtistId, GenreId, TrackId, UserId};
use streamsim_core::probability::chance;
use streamsim_core::{Collection, Track, UserSim};
use streamsim_http::AccessToken;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::context::SimContext;
use crate::error::{AgentError, AgentResult};
use crate::gate::RunGate;

const MAX_POPULAR_TRACKS: usize = 5;
const FOLLOW_PROBABILITY: f64 = 0.8;
const FOLLOW_MIN_LIKES: usize = 3;
const REPEAT_PROBABILITY: f64 = 0.8;
const MAX_REPEATS: usize = 4;

// Skip point ~ LogNormal(shape, scale) shifted by -1 second
const SKIP_SHAPE: f64 = 0.999;
const SKIP_SCALE_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserAgentState {
    Created,
    Idle,
    Listening,
    Left,
    Invalid,
}

impl UserAgentState {
    pub fn all() -> &'static [UserAgentState] {
        &[
            UserAgentState::Created,
            UserAgentState::Idle,
            UserAgentState::Listening,
            UserAgentState::Left,
            UserAgentState::Invalid,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UserAgentState::Left | UserAgentState::Invalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserAgentState::Created => "CREATED",
            UserAgentState::Idle => "IDLE",
            UserAgentState::Listening => "LISTENING",
            UserAgentState::Left => "LEFT",
            UserAgentState::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for UserAgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one agent step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAgentEvent {
    SignedIn,
    SignInRejected,
    DecidedToLeave,
    MusicQueued,
    NothingFound,
    /// A track was played and more are queued
    TrackPlayed,
    QueueDrained,
    Failed,
}

impl UserAgentEvent {
    pub fn all() -> &'static [UserAgentEvent] {
        &[
            UserAgentEvent::SignedIn,
            UserAgentEvent::SignInRejected,
            UserAgentEvent::DecidedToLeave,
            UserAgentEvent::MusicQueued,
            UserAgentEvent::NothingFound,
            UserAgentEvent::TrackPlayed,
            UserAgentEvent::QueueDrained,
            UserAgentEvent::Failed,
        ]
    }
}

/// The user state machine. `None` means the event is not valid in `state`.
pub fn transition(state: UserAgentState, event: UserAgentEvent) -> Option<UserAgentState> {
    use UserAgentEvent as E;
    use UserAgentState as S;

    match (state, event) {
        (S::Left | S::Invalid, _) => None,
        (_, E::Failed) => Some(S::Invalid),
        (S::Created, E::SignedIn) => Some(S::Idle),
        (S::Created, E::SignInRejected) => Some(S::Invalid),
        (S::Idle | S::Listening, E::DecidedToLeave) => Some(S::Left),
        (S::Idle, E::MusicQueued) => Some(S::Listening),
        (S::Idle, E::NothingFound) => Some(S::Idle),
        (S::Listening, E::TrackPlayed) => Some(S::Listening),
        (S::Listening, E::QueueDrained) => Some(S::Idle),
        _ => None,
    }
}

/// Second at which a skipped track is stopped, within `[1, duration)`.
/// A one-second track can only stop at 1.
pub fn skip_time<R: Rng + ?Sized>(rng: &mut R, duration_sec: u32) -> u32 {
    if duration_sec <= 1 {
        return 1;
    }
    let drawn = match LogNormal::new(SKIP_SCALE_SECS.ln(), SKIP_SHAPE) {
        Ok(dist) => dist.sample(rng) - 1.0,
        Err(_) => SKIP_SCALE_SECS,
    };
    (drawn.max(0.0) as u32).clamp(1, duration_sec - 1)
}

/// Read-only view of a running agent, kept by its controller
#[derive(Debug, Clone)]
pub struct UserAgentHandle {
    agent_id: u64,
    user_id: UserId,
    state: watch::Receiver<UserAgentState>,
}

impl UserAgentHandle {
    pub fn agent_id(&self) -> u64 {
        self.agent_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Last published state. An agent that went away without reaching a
    /// terminal state (panicked or aborted) reads as `Invalid`.
    pub fn state(&self) -> UserAgentState {
        let state = *self.state.borrow();
        if !state.is_terminal() && self.state.has_changed().is_err() {
            return UserAgentState::Invalid;
        }
        state
    }
}

pub struct UserAgent {
    agent_id: u64,
    user: UserSim,
    ctx: SimContext,
    config: UserAgentConfig,
    state_tx: watch::Sender<UserAgentState>,
    token: Option<AccessToken>,
    queue: VecDeque<Track>,
    liked: Vec<TrackId>,
    followed: Vec<ArtistId>,
    rng: StdRng,
}

impl UserAgent {
    pub fn new(agent_id: u64, user: UserSim, ctx: SimContext, config: UserAgentConfig) -> Self {
        let (state_tx, _rx) = watch::channel(UserAgentState::Created);
        Self {
            agent_id,
            user,
            ctx,
            config,
            state_tx,
            token: None,
            queue: VecDeque::new(),
            liked: Vec::new(),
            followed: Vec::new(),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Use a seeded random source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn agent_id(&self) -> u64 {
        self.agent_id
    }

    pub fn user(&self) -> &UserSim {
        &self.user
    }

    pub fn state(&self) -> UserAgentState {
        *self.state_tx.borrow()
    }

    pub fn handle(&self) -> UserAgentHandle {
        UserAgentHandle {
            agent_id: self.agent_id,
            user_id: self.user.id,
            state: self.state_tx.subscribe(),
        }
    }

    pub fn queued_tracks(&self) -> usize {
        self.queue.len()
    }

    /// Step until a terminal state, one step per `delay_between_states_secs`
    /// of simulated time while the gate is open
    pub async fn run(mut self, gate: RunGate) {
        info!(agent_id = self.agent_id, user_id = %self.user.id, "Starting user agent");
        let delay = self.config.delay_between_states_secs as f64;

        while !self.state().is_terminal() {
            gate.wait_open().await;
            self.ctx.clock.wait_sim_seconds(delay, true).await;
            gate.wait_open().await;
            self.next_state().await;
        }
        info!(agent_id = self.agent_id, state = %self.state(), "User agent stopped");
    }

    /// Perform one step and return the resulting state. Errors move the agent to `Invalid`.
    pub async fn next_state(&mut self) -> UserAgentState {
        let current = self.state();
        if current.is_terminal() {
            return current;
        }
        debug!(agent_id = self.agent_id, state = %current, "Going to the next state");

        let event = match self.step(current).await {
            Ok(event) => event,
            Err(e) => {
                error!(agent_id = self.agent_id, user_id = %self.user.id, error = %e, "Could not go to the next state");
                UserAgentEvent::Failed
            }
        };
        self.apply(event)
    }

    fn apply(&mut self, event: UserAgentEvent) -> UserAgentState {
        let current = self.state();
        match transition(current, event) {
            Some(next) => {
                self.state_tx.send_replace(next);
                next
            }
            None => {
                warn!(agent_id = self.agent_id, state = %current, ?event, "Ignoring event");
                current
            }
        }
    }

    async fn step(&mut self, state: UserAgentState) -> AgentResult<UserAgentEvent> {
        match state {
            UserAgentState::Created => Ok(self.sign_in().await),
            UserAgentState::Idle => self.choose_next_action().await,
            UserAgentState::Listening => self.listen_to_next().await,
            UserAgentState::Left | UserAgentState::Invalid => {
                Err(AgentError::Other(format!("agent already {}", state)))
            }
        }
    }

    fn token(&self) -> AgentResult<AccessToken> {
        self.token.clone().ok_or(AgentError::NotSignedIn)
    }

    async fn sign_in(&mut self) -> UserAgentEvent {
        match self.ctx.client.sign_in(&self.user.email, &self.user.password).await {
            Ok(token) => {
                self.token = Some(token);
                info!(agent_id = self.agent_id, sim_time = %self.ctx.clock.now(), "Signed in");
                UserAgentEvent::SignedIn
            }
            Err(e) => {
                info!(agent_id = self.agent_id, error = %e, "Sign in failed");
                UserAgentEvent::SignInRejected
            }
        }
    }

    async fn choose_next_action(&mut self) -> AgentResult<UserAgentEvent> {
        if chance(&mut self.rng, self.config.prob_leave_session) {
            info!(agent_id = self.agent_id, "User left");
            return Ok(UserAgentEvent::DecidedToLeave);
        }
        self.consider_subscription().await?;

        let token = self.token()?;
        self.liked = self.ctx.client.list_likes(&token, None).await?;
        self.followed = self.ctx.client.list_follows(&token).await?;

        let explore = (self.liked.is_empty() && self.followed.is_empty())
            || chance(&mut self.rng, self.user.traits.explorer);
        if explore {
            self.choose_new_music().await?;
        } else {
            self.choose_liked_music().await?;
        }

        if self.queue.is_empty() {
            debug!(agent_id = self.agent_id, "Nothing to listen to");
            Ok(UserAgentEvent::NothingFound)
        } else {
            Ok(UserAgentEvent::MusicQueued)
        }
    }

    async fn consider_subscription(&mut self) -> AgentResult<()> {
        if self.user.is_premium || !chance(&mut self.rng, self.config.prob_subscription) {
            return Ok(());
        }
        let token = self.token()?;
        self.ctx.client.subscribe(&token).await?;
        self.user.is_premium = true;
        self.ctx.store.update_user(self.user.clone()).await?;
        info!(agent_id = self.agent_id, user_id = %self.user.id, "User subscribed to premium");
        Ok(())
    }

    async fn choose_liked_music(&mut self) -> AgentResult<()> {
        let pick_collection = if self.liked.is_empty() {
            true
        } else if self.followed.is_empty() {
            false
        } else {
            chance(&mut self.rng, self.user.traits.collection)
        };

        if pick_collection {
            let Some(artist_id) = self.followed.choose(&mut self.rng).copied() else {
                return Ok(());
            };
            debug!(agent_id = self.agent_id, %artist_id, "Replaying a followed artist");
            self.enqueue_release_of(artist_id).await
        } else {
            let Some(track_id) = self.liked.choose(&mut self.rng).copied() else {
                return Ok(());
            };
            debug!(agent_id = self.agent_id, %track_id, "Replaying a liked track");
            let track = self.ctx.client.get_track(track_id).await?;
            self.queue.push_back(track);
            Ok(())
        }
    }

    async fn choose_new_music(&mut self) -> AgentResult<()> {
        let country = chance(&mut self.rng, self.user.traits.patriotism).then(|| self.user.country_code.clone());

        if chance(&mut self.rng, self.user.traits.popularity) {
            let count = self.rng.random_range(1..=MAX_POPULAR_TRACKS);
            let popular = self.ctx.store.most_listened(count).await?;
            if popular.is_empty() {
                debug!(agent_id = self.agent_id, "No popular tracks yet, trying a random one");
                if let Some(track) = self.ctx.client.get_random_track(country.as_deref()).await? {
                    self.queue.push_back(track);
                }
            } else {
                for stats in popular {
                    let track = self.ctx.client.get_track(stats.track_id).await?;
                    self.queue.push_back(track);
                }
            }
            return Ok(());
        }

        let mut artist = None;
        if let Some(genre_id) = self.favourite_genre().await? {
            artist = self
                .ctx
                .client
                .get_random_artist(country.as_deref(), Some(genre_id))
                .await?;
        }
        if artist.is_none() {
            artist = self.ctx.client.get_random_artist(country.as_deref(), None).await?;
        }

        match artist {
            Some(artist) => self.enqueue_release_of(artist.id).await,
            None => {
                debug!(agent_id = self.agent_id, country = ?country, "No artist found");
                Ok(())
            }
        }
    }

    /// Genre of a followed artist, else of a liked track
    async fn favourite_genre(&mut self) -> AgentResult<Option<GenreId>> {
        if let Some(artist_id) = self.followed.choose(&mut self.rng).copied() {
            let artist = self.ctx.client.get_artist(artist_id).await?;
            return Ok(Some(artist.genre_id));
        }
        if let Some(track_id) = self.liked.choose(&mut self.rng).copied() {
            let track = self.ctx.client.get_track(track_id).await?;
            return Ok(track.genre_id);
        }
        Ok(None)
    }

    async fn enqueue_release_of(&mut self, artist_id: ArtistId) -> AgentResult<()> {
        let collections = self.ctx.client.list_collections_by_artist(artist_id).await?;
        let Some(collection) = collections.choose(&mut self.rng) else {
            debug!(agent_id = self.agent_id, %artist_id, "Artist has not released anything yet");
            return Ok(());
        };
        debug!(agent_id = self.agent_id, collection_id = %collection.id, "Queueing a release");
        self.queue.extend(release_tracks(collection));
        Ok(())
    }

    async fn listen_to_next(&mut self) -> AgentResult<UserAgentEvent> {
        if chance(&mut self.rng, self.config.prob_leave_session) {
            info!(agent_id = self.agent_id, dropped = self.queue.len(), "User left while listening");
            self.queue.clear();
            return Ok(UserAgentEvent::DecidedToLeave);
        }
        let Some(track) = self.queue.pop_front() else {
            return Ok(UserAgentEvent::QueueDrained);
        };

        let full_listen = !chance(&mut self.rng, self.user.traits.skip);
        self.play_track(&track, full_listen).await?;

        if self.queue.is_empty() {
            Ok(UserAgentEvent::QueueDrained)
        } else {
            Ok(UserAgentEvent::TrackPlayed)
        }
    }

    /// Play `track` in full or up to a sampled skip point, then count,
    /// maybe like, follow and repeat it. Returns the seconds listened.
    pub async fn play_track(&mut self, track: &Track, full_listen: bool) -> AgentResult<u32> {
        let token = self.token()?;
        let listen_for = if full_listen {
            track.duration_sec
        } else {
            skip_time(&mut self.rng, track.duration_sec)
        };

        self.ctx.client.play_track(&token, track.id, 0).await?;
        self.ctx.clock.wait_sim_seconds(f64::from(listen_for), false).await;
        self.ctx
            .client
            .stop_track(&token, track.id, listen_for, full_listen)
            .await?;

        if f64::from(listen_for) > 0.5 * f64::from(track.duration_sec) {
            let listens = self.ctx.store.increment_listen_count(track.id).await?;
            debug!(agent_id = self.agent_id, track_id = %track.id, listen_for, listens, "Listened");

            let like = !self.liked.contains(&track.id) && chance(&mut self.rng, 1.0 - self.user.traits.picky);
            if like {
                self.like_track(track, &token).await?;
            }
        } else {
            debug!(agent_id = self.agent_id, track_id = %track.id, listen_for, "Skipped");
        }
        Ok(listen_for)
    }

    async fn like_track(&mut self, track: &Track, token: &AccessToken) -> AgentResult<()> {
        self.ctx.client.like(token, track.id).await?;
        self.liked.push(track.id);

        if let Some(artist_id) = track.artist_id {
            if !self.followed.contains(&artist_id) && chance(&mut self.rng, FOLLOW_PROBABILITY) {
                let by_artist = self.ctx.client.list_likes(token, Some(artist_id)).await?;
                if by_artist.len() >= FOLLOW_MIN_LIKES {
                    self.ctx.client.follow(token, artist_id).await?;
                    self.followed.push(artist_id);
                    info!(agent_id = self.agent_id, %artist_id, "Followed artist");
                }
            }
        }

        if chance(&mut self.rng, REPEAT_PROBABILITY) {
            let repeats = self.rng.random_range(1..=MAX_REPEATS);
            for _ in 0..repeats {
                self.queue.push_front(track.clone());
            }
            debug!(agent_id = self.agent_id, track_id = %track.id, repeats, "On repeat");
        }
        Ok(())
    }
}

/// Tracks of a release with their artist, collection and genre filled in
fn release_tracks(collection: &Collection) -> impl Iterator<Item = Track> + '_ {
    collection.tracks.iter().cloned().map(move |mut track| {
        track.artist_id = Some(collection.artist_id);
        track.collection_id = Some(collection.id);
        track.genre_id.get_or_insert(collection.genre_id);
        track
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for state in [UserAgentState::Left, UserAgentState::Invalid] {
            for event in UserAgentEvent::all() {
                assert_eq!(transition(state, *event), None, "{} on {:?}", state, event);
            }
        }
    }

    #[test]
    fn test_every_live_state_can_move() {
        for state in UserAgentState::all().iter().filter(|s| !s.is_terminal()) {
            let reachable: Vec<_> = UserAgentEvent::all()
                .iter()
                .filter_map(|e| transition(*state, *e))
                .filter(|next| next != state)
                .collect();
            assert!(!reachable.is_empty(), "{} is stuck", state);
        }
    }

    #[test]
    fn test_transition_table() {
        use UserAgentEvent as E;
        use UserAgentState as S;

        assert_eq!(transition(S::Created, E::SignedIn), Some(S::Idle));
        assert_eq!(transition(S::Created, E::SignInRejected), Some(S::Invalid));
        assert_eq!(transition(S::Created, E::MusicQueued), None);
        assert_eq!(transition(S::Idle, E::DecidedToLeave), Some(S::Left));
        assert_eq!(transition(S::Idle, E::MusicQueued), Some(S::Listening));
        assert_eq!(transition(S::Idle, E::NothingFound), Some(S::Idle));
        assert_eq!(transition(S::Listening, E::DecidedToLeave), Some(S::Left));
        assert_eq!(transition(S::Listening, E::TrackPlayed), Some(S::Listening));
        assert_eq!(transition(S::Listening, E::QueueDrained), Some(S::Idle));
        for state in [S::Created, S::Idle, S::Listening] {
            assert_eq!(transition(state, E::Failed), Some(S::Invalid));
        }
    }

    #[test]
    fn test_skip_time_stays_inside_track() {
        let mut rng = StdRng::seed_from_u64(99);
        for duration in 1..=600u32 {
            for _ in 0..50 {
                let t = skip_time(&mut rng, duration);
                assert!(t >= 1);
                if duration > 1 {
                    assert!(t < duration, "{} not below {}", t, duration);
                } else {
                    assert_eq!(t, 1);
                }
            }
        }
    }

    #[test]
    fn test_skips_cluster_near_start() {
        let mut rng = StdRng::seed_from_u64(5);
        let samples: Vec<u32> = (0..10_000).map(|_| skip_time(&mut rng, 300)).collect();
        let early = samples.iter().filter(|t| **t <= 30).count();
        assert!(early > 8_000, "only {} early skips", early);
    }

    #[test]
    fn test_release_tracks_carry_ids() {
        use chrono::NaiveDate;
        use streamsim_core::ids::CollectionId;
        use streamsim_core::CollectionKind;

        let collection = Collection {
            id: CollectionId::new(),
            artist_id: ArtistId::new(),
            name: "Marble".to_string(),
            kind: CollectionKind::Single,
            genre_id: GenreId::new(),
            released_dt: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            tracks: vec![Track {
                id: TrackId::new(),
                name: "Echo".to_string(),
                duration_sec: 180,
                artist_id: None,
                collection_id: None,
                genre_id: None,
            }],
        };
        let tracks: Vec<Track> = release_tracks(&collection).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist_id, Some(collection.artist_id));
        assert_eq!(tracks[0].collection_id, Some(collection.id));
        assert_eq!(tracks[0].genre_id, Some(collection.genre_id));
    }
}
