//! Wire payloads of the backend API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use streamsim_core::ids::{ArtistId, TrackId, UserId};
use streamsim_core::Country;

/// Bearer token returned by sign-in
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpResponse {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInResponse {
    pub access_token: AccessToken,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdResponse<T> {
    pub id: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlayRequest {
    pub song_id: TrackId,
    pub start_time: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct StopRequest {
    pub song_id: TrackId,
    pub stop_time: u32,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct LikeRequest {
    pub song_id: TrackId,
}

#[derive(Debug, Serialize)]
pub(crate) struct FollowRequest {
    pub artist_id: ArtistId,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddCountryRequest<'a> {
    pub code: &'a str,
    pub name: &'a str,
}

/// Country as listed by the backend
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CountryEntry {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub enabled_at: Option<DateTime<Utc>>,
}

impl From<CountryEntry> for Country {
    fn from(entry: CountryEntry) -> Self {
        Country {
            code: entry.code,
            name: entry.name,
            enabled_at: if entry.enabled { entry.enabled_at } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_country_drops_timestamp() {
        let entry: CountryEntry = serde_json::from_str(
            r#"{"code":"NO","name":"Norway","enabled":false,"enabled_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let country = Country::from(entry);
        assert!(!country.is_enabled());
    }

    #[test]
    fn test_token_is_not_logged() {
        let token = AccessToken("secret".to_string());
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
    }
}
