//! Artist population controller
//!
//! Artists are placed in a country weighted towards recently enabled ones,
//! get a genre (new, existing, or derived from an existing one) and release
//! collections until they retire.

use chrono::Datelike;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use streamsim_config::ArtistsConfig;
use streamsim_core::ids::{CollectionId, GenreId};
use streamsim_core::probability::{chance, truncated_normal};
use streamsim_core::{ArtistSim, CollectionKind, Country, Genre, NewArtist, NewCollection, NewGenre, NewTrack};
use streamsim_storage::StorageError;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::clock::SimSpan;
use crate::context::SimContext;
use crate::error::{AgentError, AgentResult, EngineResult};
use crate::gate::RunGate;
use crate::namegen;
use crate::queue::WorkQueue;
use crate::sampling::{choose_weighted, country_weights};
use crate::schedule::every;

const EARLIEST_FOUNDED_YEAR: i32 = 1950;
const MIN_TRACK_SECS: u32 = 30;
const GLOBAL_MEAN_TRACK_SECS: f64 = 210.0;
const GLOBAL_TRACK_SIGMA: f64 = 200.0;
const TRACK_DURATION_SIGMA: f64 = 30.0;
const MAX_HAPPINESS_DRIFT: i32 = 10;
const MAX_DURATION_DRIFT: i64 = 30;
const MAX_WARMUP_RELEASES: usize = 3;

/// Mean track duration of a brand-new genre
fn mean_track_duration<R: Rng + ?Sized>(rng: &mut R) -> AgentResult<u32> {
    let secs = truncated_normal(
        rng,
        GLOBAL_MEAN_TRACK_SECS,
        GLOBAL_TRACK_SIGMA,
        f64::from(MIN_TRACK_SECS),
        f64::INFINITY,
    )?;
    Ok(secs as u32)
}

/// Tracks of a release of `kind`, durations normal around `mean_secs`
fn generate_tracks<R: Rng + ?Sized>(rng: &mut R, kind: CollectionKind, mean_secs: u32) -> Vec<NewTrack> {
    let (min, max) = kind.track_count_range();
    let count = rng.random_range(min..=max);
    let normal = Normal::new(f64::from(mean_secs), TRACK_DURATION_SIGMA).ok();

    let mut tracks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let secs = match &normal {
            Some(normal) => normal.sample(rng),
            None => f64::from(mean_secs),
        };
        tracks.push(NewTrack {
            name: namegen::track_name(rng),
            duration_sec: secs.max(f64::from(MIN_TRACK_SECS)) as u32,
        });
    }
    tracks
}

/// A genre drifted from `base`: renamed, with happiness and duration nudged within bounds
fn derived_genre<R: Rng + ?Sized>(rng: &mut R, base: &Genre, country_code: &str) -> NewGenre {
    let happiness = base.happiness_index + rng.random_range(-MAX_HAPPINESS_DRIFT..=MAX_HAPPINESS_DRIFT);
    let duration = i64::from(base.mean_duration_sec) + rng.random_range(-MAX_DURATION_DRIFT..=MAX_DURATION_DRIFT);
    NewGenre {
        name: namegen::genre_name(rng, Some(&base.name)),
        happiness_index: happiness.clamp(-100, 100),
        mean_duration_sec: duration.max(i64::from(MIN_TRACK_SECS)) as u32,
        country_code: country_code.to_string(),
    }
}

pub struct ArtistController {
    ctx: SimContext,
    config: ArtistsConfig,
    warmup_artists: usize,
    country_half_life_days: f64,
    queue: WorkQueue<ArtistSim>,
}

impl ArtistController {
    pub fn new(ctx: SimContext, config: ArtistsConfig, warmup_artists: usize, country_half_life_days: f64) -> Self {
        let queue = WorkQueue::new(config.queue_capacity);
        Self {
            ctx,
            config,
            warmup_artists,
            country_half_life_days,
            queue,
        }
    }

    /// Create the warm-up artists with one to three releases each.
    /// Returns the number of artists and collections created.
    pub async fn warmup(&self) -> AgentResult<(usize, usize)> {
        let countries = self.ctx.client.list_countries(true).await?;
        if countries.is_empty() && self.warmup_artists > 0 {
            return Err(AgentError::Other("no enabled country to place artists in".to_string()));
        }

        let (mut artists, mut collections) = (0, 0);
        for _ in 0..self.warmup_artists {
            let Some(artist) = self.generate_artist(&countries, true).await? else {
                continue;
            };
            artists += 1;
            let releases = rand::rng().random_range(1..=MAX_WARMUP_RELEASES);
            for _ in 0..releases {
                self.generate_collection(&artist).await?;
                collections += 1;
            }
        }
        info!(artists, collections, "Warm-up artists generated");
        Ok((artists, collections))
    }

    /// Create one artist in a weighted-random enabled country. `None` when
    /// there is no country or no genre to place it in.
    pub async fn generate_artist(&self, countries: &[Country], warmup: bool) -> AgentResult<Option<ArtistSim>> {
        let now = self.ctx.clock.now();
        let year = now.year();
        let picked = {
            let mut rng = rand::rng();
            let weights = country_weights(countries, now, self.country_half_life_days);
            choose_weighted(&weights, false, &mut rng).map(|country| {
                let founded_year = if warmup {
                    rng.random_range(EARLIEST_FOUNDED_YEAR.min(year)..=year)
                } else {
                    year
                };
                let new_genre = warmup || chance(&mut rng, self.config.prob_new_genre);
                (namegen::artist_name(&mut rng), founded_year, country, new_genre)
            })
        };
        let Some((name, founded_year, country_code, new_genre)) = picked else {
            debug!("No enabled country for a new artist");
            return Ok(None);
        };

        let genre_id = if new_genre {
            Some(self.create_new_genre(&country_code).await?)
        } else {
            self.pick_existing_genre(&country_code).await?
        };
        let Some(genre_id) = genre_id else {
            info!(country = %country_code, "No genre available, skipping artist");
            return Ok(None);
        };

        let artist = NewArtist {
            name,
            founded_year,
            country_code,
            genre_id,
        };
        let artist_id = self.ctx.client.create_artist(&artist).await?;
        let sim = ArtistSim::new(artist_id, now);
        self.ctx.store.insert_artist(sim.clone()).await?;
        info!(%artist_id, name = %artist.name, country = %artist.country_code, "Artist created");
        Ok(Some(sim))
    }

    async fn create_new_genre(&self, country_code: &str) -> AgentResult<GenreId> {
        let genre = {
            let mut rng = rand::rng();
            NewGenre {
                name: namegen::genre_name(&mut rng, None),
                happiness_index: rng.random_range(-100..=100),
                mean_duration_sec: mean_track_duration(&mut rng)?,
                country_code: country_code.to_string(),
            }
        };
        let id = self.ctx.client.create_genre(&genre).await?;
        info!(genre_id = %id, name = %genre.name, country = country_code, "Genre created");
        Ok(id)
    }

    async fn derive_genre(&self, base: &Genre, country_code: &str) -> AgentResult<GenreId> {
        let genre = derived_genre(&mut rand::rng(), base, country_code);
        let id = self.ctx.client.create_genre(&genre).await?;
        info!(genre_id = %id, name = %genre.name, base = %base.name, "Genre derived");
        Ok(id)
    }

    /// An existing genre, usually from the artist's own country, sometimes derived into a new one
    async fn pick_existing_genre(&self, country_code: &str) -> AgentResult<Option<GenreId>> {
        let same_country = chance(&mut rand::rng(), self.config.prob_same_country_genre);
        let genres = self
            .ctx
            .client
            .list_genres(same_country.then_some(country_code))
            .await?;

        let derive_p = if same_country {
            self.config.prob_derived_genre_same_country
        } else {
            self.config.prob_derived_genre_diff_country
        };
        let picked = {
            let mut rng = rand::rng();
            genres
                .choose(&mut rng)
                .cloned()
                .map(|genre| (genre, chance(&mut rng, derive_p)))
        };

        match picked {
            None => Ok(None),
            Some((genre, true)) => Ok(Some(self.derive_genre(&genre, country_code).await?)),
            Some((genre, false)) => Ok(Some(genre.id)),
        }
    }

    /// Release a new collection by `sim`, then stamp its release and maybe retire it
    pub async fn generate_collection(&self, sim: &ArtistSim) -> AgentResult<CollectionId> {
        let artist = self.ctx.client.get_artist(sim.artist_id).await?;
        let genre = self.ctx.client.get_genre(artist.genre_id).await?;
        let now = self.ctx.clock.now();

        let (kind, name, tracks, genre_change) = {
            let mut rng = rand::rng();
            let kind = CollectionKind::all()
                .choose(&mut rng)
                .copied()
                .unwrap_or(CollectionKind::Single);
            let name = namegen::collection_name(&mut rng);
            let tracks = generate_tracks(&mut rng, kind, genre.mean_duration_sec);
            let genre_change = chance(&mut rng, self.config.prob_collection_new_genre)
                .then(|| chance(&mut rng, self.config.prob_collection_invent_genre));
            (kind, name, tracks, genre_change)
        };

        let genre_id = match genre_change {
            None => genre.id,
            Some(true) => self.create_new_genre(&artist.country_code).await?,
            Some(false) => self.derive_genre(&genre, &artist.country_code).await?,
        };

        let collection = NewCollection {
            artist_id: artist.id,
            name,
            kind,
            genre_id,
            released_dt: now.date_naive(),
            tracks,
        };
        let collection_id = self.ctx.client.create_collection(&collection).await?;
        info!(
            %collection_id,
            artist_id = %artist.id,
            kind = %kind,
            tracks = collection.tracks.len(),
            "Collection released"
        );

        let mut shadow = self
            .ctx
            .store
            .get_artist(artist.id)
            .await?
            .ok_or_else(|| StorageError::not_found("artist", artist.id))?;
        shadow.last_release_at = Some(now);
        if chance(&mut rand::rng(), self.config.prob_retired) {
            shadow.retired = true;
            info!(artist_id = %artist.id, "Artist retired");
        }
        self.ctx.store.update_artist(shadow).await?;
        Ok(collection_id)
    }

    async fn create_artist(&self) -> AgentResult<()> {
        let countries = self.ctx.client.list_countries(true).await?;
        self.generate_artist(&countries, false).await?;
        Ok(())
    }

    async fn select_artist(&self) -> AgentResult<()> {
        match self.ctx.store.random_active_artist().await? {
            Some(artist) => {
                self.queue.push(artist).await?;
                debug!(queued = self.queue.len(), "Selected artist to run");
            }
            None => debug!(queued = self.queue.len(), "No active artist to select"),
        }
        Ok(())
    }

    async fn run_next_artist(&self) -> AgentResult<()> {
        match self.queue.try_pop() {
            Some(artist) => {
                self.generate_collection(&artist).await?;
            }
            None => info!("Artist queue is empty"),
        }
        Ok(())
    }

    pub fn queue(&self) -> &WorkQueue<ArtistSim> {
        &self.queue
    }

    /// Spawn the create, select and run loops
    pub fn spawn_loops(self: &Arc<Self>, gate: &RunGate, tasks: &mut JoinSet<EngineResult<()>>) {
        let span = |secs: u64| SimSpan::Seconds(secs as f64);

        let (this, gate_) = (self.clone(), gate.clone());
        let delay = span(self.config.delay_create_secs);
        tasks.spawn(async move {
            every("create_artist", &gate_, &this.ctx.clock, delay, true, || this.create_artist()).await
        });

        let (this, gate_) = (self.clone(), gate.clone());
        let delay = span(self.config.delay_select_secs);
        tasks.spawn(async move {
            every("select_artist", &gate_, &this.ctx.clock, delay, true, || this.select_artist()).await
        });

        let (this, gate_) = (self.clone(), gate.clone());
        let delay = span(self.config.delay_run_secs);
        tasks.spawn(async move {
            every("run_artist", &gate_, &this.ctx.clock, delay, true, || this.run_next_artist()).await
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn genre(happiness_index: i32, mean_duration_sec: u32) -> Genre {
        Genre {
            id: GenreId::new(),
            name: "swing".to_string(),
            happiness_index,
            mean_duration_sec,
            country_code: "NO".to_string(),
        }
    }

    #[test]
    fn test_track_counts_follow_kind() {
        let mut rng = StdRng::seed_from_u64(21);
        for kind in CollectionKind::all() {
            let (min, max) = kind.track_count_range();
            for _ in 0..100 {
                let tracks = generate_tracks(&mut rng, *kind, 200);
                assert!((min as usize..=max as usize).contains(&tracks.len()));
                assert!(tracks.iter().all(|t| t.duration_sec >= MIN_TRACK_SECS));
            }
        }
    }

    #[test]
    fn test_new_genre_duration_floor() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..2_000 {
            assert!(mean_track_duration(&mut rng).unwrap() >= MIN_TRACK_SECS);
        }
    }

    #[test]
    fn test_derived_genre_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(31);
        for base in [genre(100, 200), genre(-100, 35), genre(0, 240)] {
            for _ in 0..500 {
                let derived = derived_genre(&mut rng, &base, "SE");
                assert!((-100..=100).contains(&derived.happiness_index));
                assert!((derived.happiness_index - base.happiness_index).abs() <= MAX_HAPPINESS_DRIFT);
                assert!(derived.mean_duration_sec >= MIN_TRACK_SECS);
                assert!(derived.name.ends_with("swing"));
                assert_eq!(derived.country_code, "SE");
            }
        }
    }
}
