//! Backend service client

use crate::config::ServiceClientConfig;
use crate::errors::{HttpError, HttpResult};
use crate::types::*;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use streamsim_core::ids::{ArtistId, CollectionId, GenreId, TrackId, UserId};
use streamsim_core::{
    Artist, Collection, Country, Genre, NewArtist, NewCollection, NewGenre, SignUp, SimNow, Track,
};
use streamsim_resilience::{RetryError, RetryExecutor};
use tracing::debug;

/// Every operation the simulator performs against the exercised backend.
///
/// Implementations stamp each call with the current simulated time so the
/// backend records it as happening "now" in the simulated timeline.
#[async_trait::async_trait]
pub trait ServiceClient: Send + Sync {
    async fn sign_up(&self, sign_up: &SignUp) -> HttpResult<UserId>;
    async fn sign_in(&self, email: &str, password: &str) -> HttpResult<AccessToken>;

    async fn play_track(&self, token: &AccessToken, track_id: TrackId, start_time: u32) -> HttpResult<()>;
    async fn stop_track(
        &self,
        token: &AccessToken,
        track_id: TrackId,
        stop_time: u32,
        finished: bool,
    ) -> HttpResult<()>;

    async fn like(&self, token: &AccessToken, track_id: TrackId) -> HttpResult<()>;
    /// Liked tracks, optionally only those by one artist
    async fn list_likes(&self, token: &AccessToken, artist_id: Option<ArtistId>) -> HttpResult<Vec<TrackId>>;
    async fn follow(&self, token: &AccessToken, artist_id: ArtistId) -> HttpResult<()>;
    async fn list_follows(&self, token: &AccessToken) -> HttpResult<Vec<ArtistId>>;
    async fn subscribe(&self, token: &AccessToken) -> HttpResult<()>;

    async fn create_artist(&self, artist: &NewArtist) -> HttpResult<ArtistId>;
    async fn create_genre(&self, genre: &NewGenre) -> HttpResult<GenreId>;
    async fn create_collection(&self, collection: &NewCollection) -> HttpResult<CollectionId>;

    async fn add_country(&self, code: &str, name: &str) -> HttpResult<()>;
    async fn enable_country(&self, code: &str) -> HttpResult<()>;
    async fn list_countries(&self, only_enabled: bool) -> HttpResult<Vec<Country>>;

    async fn get_genre(&self, genre_id: GenreId) -> HttpResult<Genre>;
    async fn list_genres(&self, country: Option<&str>) -> HttpResult<Vec<Genre>>;
    async fn get_artist(&self, artist_id: ArtistId) -> HttpResult<Artist>;
    async fn get_track(&self, track_id: TrackId) -> HttpResult<Track>;
    /// `None` when the backend has nothing matching
    async fn get_random_track(&self, country: Option<&str>) -> HttpResult<Option<Track>>;
    /// `None` when the backend has nothing matching
    async fn get_random_artist(
        &self,
        country: Option<&str>,
        genre_id: Option<GenreId>,
    ) -> HttpResult<Option<Artist>>;
    async fn list_collections_by_artist(&self, artist_id: ArtistId) -> HttpResult<Vec<Collection>>;
}

/// One backend call, rebuilt on every retry attempt
struct Call<'a> {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<JsonValue>,
    token: Option<&'a AccessToken>,
}

impl<'a> Call<'a> {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token: None,
        }
    }

    fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(path)
        }
    }

    fn json<B: Serialize>(mut self, body: &B) -> HttpResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| HttpError::InvalidRequest(format!("{}: {}", self.path, e)))?;
        self.body = Some(value);
        Ok(self)
    }

    fn query(mut self, key: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.query.push((key, value.to_string()));
        }
        self
    }

    fn auth(mut self, token: &'a AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    fn method_name(&self) -> &'static str {
        if self.method == Method::POST {
            "POST"
        } else {
            "GET"
        }
    }
}

/// reqwest-backed [`ServiceClient`] with retries
pub struct HttpServiceClient {
    client: Client,
    base_url: String,
    time_header: HeaderName,
    now: Arc<dyn SimNow>,
    retry: RetryExecutor,
}

impl HttpServiceClient {
    pub fn new(config: ServiceClientConfig, now: Arc<dyn SimNow>) -> HttpResult<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let time_header = HeaderName::from_str(&config.time_override_header)
            .map_err(|_| HttpError::InvalidHeader(config.time_override_header.clone()))?;

        debug!(
            "Creating service client for {} with timeout: {}s",
            config.base_url,
            config.timeout.as_secs()
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            time_header,
            now,
            retry: RetryExecutor::new(config.retry),
        })
    }

    /// Send with retries; non-success statuses become errors
    async fn send(&self, call: &Call<'_>) -> HttpResult<Response> {
        self.retry
            .execute(|| self.send_once(call))
            .await
            .map_err(RetryError::into_inner)
    }

    async fn send_once(&self, call: &Call<'_>) -> HttpResult<Response> {
        let url = format!("{}{}", self.base_url, call.path);
        let sim_now = self.now.now().to_rfc3339();
        let stamp = HeaderValue::from_str(&sim_now).map_err(|_| HttpError::InvalidHeader(sim_now.clone()))?;

        let mut request = self
            .client
            .request(call.method.clone(), &url)
            .header(self.time_header.clone(), stamp);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(token) = call.token {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        debug!("REQ {} {} at sim time {}", call.method_name(), url, sim_now);
        let response = request.send().await?;
        let status = response.status();
        debug!("RESP {} {}: HTTP {}", call.method_name(), url, status.as_u16());

        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HttpError::NotFound(call.path.clone()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(HttpError::Status {
            method: call.method_name(),
            path: call.path.clone(),
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, call: &Call<'_>) -> HttpResult<T> {
        let response = self.send(call).await?;
        response.json::<T>().await.map_err(|e| HttpError::InvalidResponse {
            path: call.path.clone(),
            message: e.to_string(),
        })
    }

    async fn send_empty(&self, call: &Call<'_>) -> HttpResult<()> {
        self.send(call).await.map(|_| ())
    }

    async fn send_optional<T: DeserializeOwned>(&self, call: &Call<'_>) -> HttpResult<Option<T>> {
        match self.send_json(call).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl ServiceClient for HttpServiceClient {
    async fn sign_up(&self, sign_up: &SignUp) -> HttpResult<UserId> {
        let call = Call::post("/auth/sign_up").json(sign_up)?;
        let response: SignUpResponse = self.send_json(&call).await?;
        Ok(response.user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> HttpResult<AccessToken> {
        let call = Call::post("/auth/sign_in").json(&SignInRequest { email, password })?;
        let response: SignInResponse = self.send_json(&call).await?;
        Ok(response.access_token)
    }

    async fn play_track(&self, token: &AccessToken, track_id: TrackId, start_time: u32) -> HttpResult<()> {
        let call = Call::post("/api/play")
            .json(&PlayRequest {
                song_id: track_id,
                start_time,
            })?
            .auth(token);
        self.send_empty(&call).await
    }

    async fn stop_track(
        &self,
        token: &AccessToken,
        track_id: TrackId,
        stop_time: u32,
        finished: bool,
    ) -> HttpResult<()> {
        let call = Call::post("/api/stop")
            .json(&StopRequest {
                song_id: track_id,
                stop_time,
                finished,
            })?
            .auth(token);
        self.send_empty(&call).await
    }

    async fn like(&self, token: &AccessToken, track_id: TrackId) -> HttpResult<()> {
        let call = Call::post("/api/like/song")
            .json(&LikeRequest { song_id: track_id })?
            .auth(token);
        self.send_empty(&call).await
    }

    async fn list_likes(&self, token: &AccessToken, artist_id: Option<ArtistId>) -> HttpResult<Vec<TrackId>> {
        let call = Call::get("/api/like/songs").query("artist_id", artist_id).auth(token);
        self.send_json(&call).await
    }

    async fn follow(&self, token: &AccessToken, artist_id: ArtistId) -> HttpResult<()> {
        let call = Call::post("/api/follow/artist")
            .json(&FollowRequest { artist_id })?
            .auth(token);
        self.send_empty(&call).await
    }

    async fn list_follows(&self, token: &AccessToken) -> HttpResult<Vec<ArtistId>> {
        self.send_json(&Call::get("/api/follow/artists").auth(token)).await
    }

    async fn subscribe(&self, token: &AccessToken) -> HttpResult<()> {
        self.send_empty(&Call::post("/api/subscribe").auth(token)).await
    }

    async fn create_artist(&self, artist: &NewArtist) -> HttpResult<ArtistId> {
        let call = Call::post("/music/artist").json(artist)?;
        let response: IdResponse<ArtistId> = self.send_json(&call).await?;
        Ok(response.id)
    }

    async fn create_genre(&self, genre: &NewGenre) -> HttpResult<GenreId> {
        let call = Call::post("/music/genre").json(genre)?;
        let response: IdResponse<GenreId> = self.send_json(&call).await?;
        Ok(response.id)
    }

    async fn create_collection(&self, collection: &NewCollection) -> HttpResult<CollectionId> {
        let call = Call::post("/music/collection").json(collection)?;
        let response: IdResponse<CollectionId> = self.send_json(&call).await?;
        Ok(response.id)
    }

    async fn add_country(&self, code: &str, name: &str) -> HttpResult<()> {
        let call = Call::post("/common/country").json(&AddCountryRequest { code, name })?;
        self.send_empty(&call).await
    }

    async fn enable_country(&self, code: &str) -> HttpResult<()> {
        self.send_empty(&Call::post(format!("/common/country/{}/enable", code)))
            .await
    }

    async fn list_countries(&self, only_enabled: bool) -> HttpResult<Vec<Country>> {
        let call = Call::get("/common/countries").query("enabled", Some(only_enabled));
        let entries: Vec<CountryEntry> = self.send_json(&call).await?;
        Ok(entries.into_iter().map(Country::from).collect())
    }

    async fn get_genre(&self, genre_id: GenreId) -> HttpResult<Genre> {
        self.send_json(&Call::get(format!("/music/genre/{}", genre_id)))
            .await
    }

    async fn list_genres(&self, country: Option<&str>) -> HttpResult<Vec<Genre>> {
        self.send_json(&Call::get("/music/genres").query("country", country))
            .await
    }

    async fn get_artist(&self, artist_id: ArtistId) -> HttpResult<Artist> {
        self.send_json(&Call::get(format!("/music/artist/{}", artist_id)))
            .await
    }

    async fn get_track(&self, track_id: TrackId) -> HttpResult<Track> {
        self.send_json(&Call::get(format!("/music/song/{}", track_id)))
            .await
    }

    async fn get_random_track(&self, country: Option<&str>) -> HttpResult<Option<Track>> {
        self.send_optional(&Call::get("/music/song/random").query("country", country))
            .await
    }

    async fn get_random_artist(
        &self,
        country: Option<&str>,
        genre_id: Option<GenreId>,
    ) -> HttpResult<Option<Artist>> {
        let call = Call::get("/music/artist/random")
            .query("country", country)
            .query("genre_id", genre_id);
        self.send_optional(&call).await
    }

    async fn list_collections_by_artist(&self, artist_id: ArtistId) -> HttpResult<Vec<Collection>> {
        self.send_json(&Call::get(format!("/music/artist/{}/collections", artist_id)))
            .await
    }
}
