//! In-memory backend for tests
//!
//! [`FakeBackend`] implements [`ServiceClient`] over plain maps. It keeps
//! enough of the backend's behaviour (country enabling, catalogue lookups,
//! likes, follows, playback log) for end-to-end engine tests to run without
//! a network.

use crate::client::ServiceClient;
use crate::errors::{HttpError, HttpResult};
use crate::types::AccessToken;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use streamsim_core::ids::{ArtistId, CollectionId, GenreId, TrackId, UserId};
use streamsim_core::{
    Artist, Collection, Country, Genre, NewArtist, NewCollection, NewGenre, SignUp, SimNow, Track,
};

/// One playback call received by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Play {
        user_id: UserId,
        track_id: TrackId,
        start_time: u32,
        at: DateTime<Utc>,
    },
    Stop {
        user_id: UserId,
        track_id: TrackId,
        stop_time: u32,
        finished: bool,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    password: String,
    country_code: String,
    premium: bool,
}

#[derive(Default)]
struct FakeState {
    countries: BTreeMap<String, Country>,
    genres: HashMap<GenreId, Genre>,
    artists: HashMap<ArtistId, Artist>,
    collections: HashMap<CollectionId, Collection>,
    tracks: HashMap<TrackId, Track>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, UserId>,
    likes: HashMap<UserId, Vec<TrackId>>,
    follows: HashMap<UserId, Vec<ArtistId>>,
    events: Vec<PlaybackEvent>,
    rejected_emails: HashSet<String>,
    reject_all_sign_ins: bool,
    fail_likes_listing: bool,
}

/// In-memory stand-in for the exercised backend
pub struct FakeBackend {
    now: Arc<dyn SimNow>,
    state: Mutex<FakeState>,
}

fn unauthorized(path: &str) -> HttpError {
    HttpError::Status {
        method: "POST",
        path: path.to_string(),
        status: 401,
        body: "invalid credentials".to_string(),
    }
}

fn conflict(path: &str, body: String) -> HttpError {
    HttpError::Status {
        method: "POST",
        path: path.to_string(),
        status: 409,
        body,
    }
}

impl FakeBackend {
    pub fn new(now: Arc<dyn SimNow>) -> Self {
        Self {
            now,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Make every sign-in fail with 401
    pub fn reject_sign_ins(&self, reject: bool) {
        self.state.lock().reject_all_sign_ins = reject;
    }

    /// Make listing likes fail with 500
    pub fn fail_list_likes(&self, fail: bool) {
        self.state.lock().fail_likes_listing = fail;
    }

    /// Make sign-ins of one account fail with 401
    pub fn reject_sign_in_for(&self, email: &str) {
        self.state.lock().rejected_emails.insert(email.to_string());
    }

    pub fn countries(&self) -> Vec<Country> {
        self.state.lock().countries.values().cloned().collect()
    }

    pub fn genres(&self) -> Vec<Genre> {
        self.state.lock().genres.values().cloned().collect()
    }

    pub fn artists(&self) -> Vec<Artist> {
        self.state.lock().artists.values().cloned().collect()
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.state.lock().collections.values().cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    /// Country codes of registered users
    pub fn user_countries(&self) -> Vec<String> {
        self.state
            .lock()
            .accounts
            .values()
            .map(|a| a.country_code.clone())
            .collect()
    }

    pub fn is_premium(&self, email: &str) -> bool {
        self.state
            .lock()
            .accounts
            .get(email)
            .map(|a| a.premium)
            .unwrap_or(false)
    }

    pub fn likes_of(&self, user_id: UserId) -> Vec<TrackId> {
        self.state.lock().likes.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn follows_of(&self, user_id: UserId) -> Vec<ArtistId> {
        self.state.lock().follows.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn playback_events(&self) -> Vec<PlaybackEvent> {
        self.state.lock().events.clone()
    }

    fn user_for(&self, token: &AccessToken, path: &str) -> HttpResult<UserId> {
        self.state
            .lock()
            .tokens
            .get(token.as_str())
            .copied()
            .ok_or_else(|| unauthorized(path))
    }
}

#[async_trait::async_trait]
impl ServiceClient for FakeBackend {
    async fn sign_up(&self, sign_up: &SignUp) -> HttpResult<UserId> {
        let mut state = self.state.lock();
        if state.accounts.contains_key(&sign_up.email) {
            return Err(conflict("/auth/sign_up", format!("{} already registered", sign_up.email)));
        }
        let enabled = state
            .countries
            .get(&sign_up.country_code)
            .map(Country::is_enabled)
            .unwrap_or(false);
        if !enabled {
            return Err(conflict(
                "/auth/sign_up",
                format!("country {} is not enabled", sign_up.country_code),
            ));
        }
        let user_id = UserId::new();
        state.accounts.insert(
            sign_up.email.clone(),
            Account {
                user_id,
                password: sign_up.password.clone(),
                country_code: sign_up.country_code.clone(),
                premium: false,
            },
        );
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> HttpResult<AccessToken> {
        let mut state = self.state.lock();
        if state.reject_all_sign_ins || state.rejected_emails.contains(email) {
            return Err(unauthorized("/auth/sign_in"));
        }
        let user_id = match state.accounts.get(email) {
            Some(account) if account.password == password => account.user_id,
            _ => return Err(unauthorized("/auth/sign_in")),
        };
        let token = format!("token-{}-{}", user_id, state.tokens.len());
        state.tokens.insert(token.clone(), user_id);
        Ok(AccessToken(token))
    }

    async fn play_track(&self, token: &AccessToken, track_id: TrackId, start_time: u32) -> HttpResult<()> {
        let user_id = self.user_for(token, "/api/play")?;
        let at = self.now.now();
        self.state.lock().events.push(PlaybackEvent::Play {
            user_id,
            track_id,
            start_time,
            at,
        });
        Ok(())
    }

    async fn stop_track(
        &self,
        token: &AccessToken,
        track_id: TrackId,
        stop_time: u32,
        finished: bool,
    ) -> HttpResult<()> {
        let user_id = self.user_for(token, "/api/stop")?;
        let at = self.now.now();
        self.state.lock().events.push(PlaybackEvent::Stop {
            user_id,
            track_id,
            stop_time,
            finished,
            at,
        });
        Ok(())
    }

    async fn like(&self, token: &AccessToken, track_id: TrackId) -> HttpResult<()> {
        let user_id = self.user_for(token, "/api/like/song")?;
        let mut state = self.state.lock();
        if !state.tracks.contains_key(&track_id) {
            return Err(HttpError::NotFound(format!("/music/song/{}", track_id)));
        }
        let likes = state.likes.entry(user_id).or_default();
        if !likes.contains(&track_id) {
            likes.push(track_id);
        }
        Ok(())
    }

    async fn list_likes(&self, token: &AccessToken, artist_id: Option<ArtistId>) -> HttpResult<Vec<TrackId>> {
        let user_id = self.user_for(token, "/api/like/songs")?;
        let state = self.state.lock();
        if state.fail_likes_listing {
            return Err(HttpError::Status {
                method: "GET",
                path: "/api/like/songs".to_string(),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let likes = state.likes.get(&user_id).cloned().unwrap_or_default();
        Ok(match artist_id {
            None => likes,
            Some(artist_id) => likes
                .into_iter()
                .filter(|id| {
                    state
                        .tracks
                        .get(id)
                        .map(|t| t.artist_id == Some(artist_id))
                        .unwrap_or(false)
                })
                .collect(),
        })
    }

    async fn follow(&self, token: &AccessToken, artist_id: ArtistId) -> HttpResult<()> {
        let user_id = self.user_for(token, "/api/follow/artist")?;
        let mut state = self.state.lock();
        if !state.artists.contains_key(&artist_id) {
            return Err(HttpError::NotFound(format!("/music/artist/{}", artist_id)));
        }
        let follows = state.follows.entry(user_id).or_default();
        if !follows.contains(&artist_id) {
            follows.push(artist_id);
        }
        Ok(())
    }

    async fn list_follows(&self, token: &AccessToken) -> HttpResult<Vec<ArtistId>> {
        let user_id = self.user_for(token, "/api/follow/artists")?;
        Ok(self.follows_of(user_id))
    }

    async fn subscribe(&self, token: &AccessToken) -> HttpResult<()> {
        let user_id = self.user_for(token, "/api/subscribe")?;
        let mut state = self.state.lock();
        if let Some(account) = state.accounts.values_mut().find(|a| a.user_id == user_id) {
            account.premium = true;
        }
        Ok(())
    }

    async fn create_artist(&self, artist: &NewArtist) -> HttpResult<ArtistId> {
        let mut state = self.state.lock();
        if !state.genres.contains_key(&artist.genre_id) {
            return Err(HttpError::NotFound(format!("/music/genre/{}", artist.genre_id)));
        }
        let id = ArtistId::new();
        state.artists.insert(
            id,
            Artist {
                id,
                name: artist.name.clone(),
                founded_year: artist.founded_year,
                country_code: artist.country_code.clone(),
                genre_id: artist.genre_id,
            },
        );
        Ok(id)
    }

    async fn create_genre(&self, genre: &NewGenre) -> HttpResult<GenreId> {
        let id = GenreId::new();
        self.state.lock().genres.insert(
            id,
            Genre {
                id,
                name: genre.name.clone(),
                happiness_index: genre.happiness_index,
                mean_duration_sec: genre.mean_duration_sec,
                country_code: genre.country_code.clone(),
            },
        );
        Ok(id)
    }

    async fn create_collection(&self, collection: &NewCollection) -> HttpResult<CollectionId> {
        let mut state = self.state.lock();
        if !state.artists.contains_key(&collection.artist_id) {
            return Err(HttpError::NotFound(format!("/music/artist/{}", collection.artist_id)));
        }
        let id = CollectionId::new();
        let tracks: Vec<Track> = collection
            .tracks
            .iter()
            .map(|t| Track {
                id: TrackId::new(),
                name: t.name.clone(),
                duration_sec: t.duration_sec,
                artist_id: Some(collection.artist_id),
                collection_id: Some(id),
                genre_id: Some(collection.genre_id),
            })
            .collect();
        for track in &tracks {
            state.tracks.insert(track.id, track.clone());
        }
        state.collections.insert(
            id,
            Collection {
                id,
                artist_id: collection.artist_id,
                name: collection.name.clone(),
                kind: collection.kind,
                genre_id: collection.genre_id,
                released_dt: collection.released_dt,
                tracks,
            },
        );
        Ok(id)
    }

    async fn add_country(&self, code: &str, name: &str) -> HttpResult<()> {
        let mut state = self.state.lock();
        if state.countries.contains_key(code) {
            return Err(conflict("/common/country", format!("country {} exists", code)));
        }
        state.countries.insert(
            code.to_string(),
            Country {
                code: code.to_string(),
                name: name.to_string(),
                enabled_at: None,
            },
        );
        Ok(())
    }

    async fn enable_country(&self, code: &str) -> HttpResult<()> {
        let now = self.now.now();
        let mut state = self.state.lock();
        let country = state
            .countries
            .get_mut(code)
            .ok_or_else(|| HttpError::NotFound(format!("/common/country/{}", code)))?;
        if country.enabled_at.is_none() {
            country.enabled_at = Some(now);
        }
        Ok(())
    }

    async fn list_countries(&self, only_enabled: bool) -> HttpResult<Vec<Country>> {
        Ok(self
            .countries()
            .into_iter()
            .filter(|c| !only_enabled || c.is_enabled())
            .collect())
    }

    async fn get_genre(&self, genre_id: GenreId) -> HttpResult<Genre> {
        self.state
            .lock()
            .genres
            .get(&genre_id)
            .cloned()
            .ok_or_else(|| HttpError::NotFound(format!("/music/genre/{}", genre_id)))
    }

    async fn list_genres(&self, country: Option<&str>) -> HttpResult<Vec<Genre>> {
        Ok(self
            .genres()
            .into_iter()
            .filter(|g| country.map(|c| g.country_code == c).unwrap_or(true))
            .collect())
    }

    async fn get_artist(&self, artist_id: ArtistId) -> HttpResult<Artist> {
        self.state
            .lock()
            .artists
            .get(&artist_id)
            .cloned()
            .ok_or_else(|| HttpError::NotFound(format!("/music/artist/{}", artist_id)))
    }

    async fn get_track(&self, track_id: TrackId) -> HttpResult<Track> {
        self.state
            .lock()
            .tracks
            .get(&track_id)
            .cloned()
            .ok_or_else(|| HttpError::NotFound(format!("/music/song/{}", track_id)))
    }

    async fn get_random_track(&self, country: Option<&str>) -> HttpResult<Option<Track>> {
        let state = self.state.lock();
        let candidates: Vec<&Track> = state
            .tracks
            .values()
            .filter(|t| match (country, t.artist_id) {
                (None, _) => true,
                (Some(code), Some(artist_id)) => state
                    .artists
                    .get(&artist_id)
                    .map(|a| a.country_code == code)
                    .unwrap_or(false),
                (Some(_), None) => false,
            })
            .collect();
        Ok(candidates.choose(&mut rand::rng()).map(|t| (*t).clone()))
    }

    async fn get_random_artist(
        &self,
        country: Option<&str>,
        genre_id: Option<GenreId>,
    ) -> HttpResult<Option<Artist>> {
        let state = self.state.lock();
        let candidates: Vec<&Artist> = state
            .artists
            .values()
            .filter(|a| country.map(|c| a.country_code == c).unwrap_or(true))
            .filter(|a| genre_id.map(|g| a.genre_id == g).unwrap_or(true))
            .collect();
        Ok(candidates.choose(&mut rand::rng()).map(|a| (*a).clone()))
    }

    async fn list_collections_by_artist(&self, artist_id: ArtistId) -> HttpResult<Vec<Collection>> {
        let state = self.state.lock();
        if !state.artists.contains_key(&artist_id) {
            return Err(HttpError::NotFound(format!("/music/artist/{}", artist_id)));
        }
        Ok(state
            .collections
            .values()
            .filter(|c| c.artist_id == artist_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use streamsim_core::{CollectionKind, FixedSimNow, NewTrack, UserProfile};

    fn backend() -> FakeBackend {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        FakeBackend::new(Arc::new(FixedSimNow(now)))
    }

    fn sign_up(email: &str, country: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "pw".to_string(),
            country_code: country.to_string(),
            profile: UserProfile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn test_enable_country_stamps_sim_time() {
        let fake = backend();
        fake.add_country("NO", "Norway").await.unwrap();
        fake.add_country("SE", "Sweden").await.unwrap();
        fake.enable_country("NO").await.unwrap();

        let enabled = fake.list_countries(true).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(
            enabled[0].enabled_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(fake.list_countries(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_up_requires_enabled_country() {
        let fake = backend();
        fake.add_country("NO", "Norway").await.unwrap();
        assert!(fake.sign_up(&sign_up("a@example.com", "NO")).await.is_err());

        fake.enable_country("NO").await.unwrap();
        fake.sign_up(&sign_up("a@example.com", "NO")).await.unwrap();
        assert!(fake.sign_in("a@example.com", "pw").await.is_ok());
        assert!(fake.sign_in("a@example.com", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn test_likes_filtered_by_artist() {
        let fake = backend();
        let genre_id = fake
            .create_genre(&NewGenre {
                name: "Fjord Pop".to_string(),
                happiness_index: 10,
                mean_duration_sec: 200,
                country_code: "NO".to_string(),
            })
            .await
            .unwrap();
        let artist_id = fake
            .create_artist(&NewArtist {
                name: "The Fjords".to_string(),
                founded_year: 2001,
                country_code: "NO".to_string(),
                genre_id,
            })
            .await
            .unwrap();
        fake.create_collection(&NewCollection {
            artist_id,
            name: "Cold".to_string(),
            kind: CollectionKind::Single,
            genre_id,
            released_dt: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            tracks: vec![NewTrack {
                name: "Ice".to_string(),
                duration_sec: 180,
            }],
        })
        .await
        .unwrap();

        fake.add_country("NO", "Norway").await.unwrap();
        fake.enable_country("NO").await.unwrap();
        fake.sign_up(&sign_up("b@example.com", "NO")).await.unwrap();
        let token = fake.sign_in("b@example.com", "pw").await.unwrap();

        let track = fake.get_random_track(Some("NO")).await.unwrap().unwrap();
        fake.like(&token, track.id).await.unwrap();

        assert_eq!(fake.list_likes(&token, Some(artist_id)).await.unwrap(), vec![track.id]);
        assert!(fake.list_likes(&token, Some(ArtistId::new())).await.unwrap().is_empty());
        assert!(fake.get_random_track(Some("SE")).await.unwrap().is_none());
    }
}
