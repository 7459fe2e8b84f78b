//! Records exchanged with the exercised backend

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ArtistId, CollectionId, GenreId, TrackId};

/// A country known to the backend. Users can only register in enabled countries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    /// Simulated instant the country was enabled, if it is
    #[serde(default)]
    pub enabled_at: Option<DateTime<Utc>>,
}

impl Country {
    pub fn is_enabled(&self) -> bool {
        self.enabled_at.is_some()
    }
}

/// A music genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    /// Mood of the genre, always within `[-100, 100]`
    pub happiness_index: i32,
    pub mean_duration_sec: u32,
    pub country_code: String,
}

/// Payload for creating a genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGenre {
    pub name: String,
    pub happiness_index: i32,
    pub mean_duration_sec: u32,
    pub country_code: String,
}

/// An artist (solo performer or band)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub founded_year: i32,
    pub country_code: String,
    pub genre_id: GenreId,
}

/// Payload for creating an artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArtist {
    pub name: String,
    pub founded_year: i32,
    pub country_code: String,
    pub genre_id: GenreId,
}

/// A playable track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub duration_sec: u32,
    #[serde(default)]
    pub artist_id: Option<ArtistId>,
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    #[serde(default)]
    pub genre_id: Option<GenreId>,
}

/// Payload for a track inside a new collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrack {
    pub name: String,
    pub duration_sec: u32,
}

/// Release type of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollectionKind {
    Lp,
    Ep,
    Single,
}

impl CollectionKind {
    pub fn all() -> &'static [CollectionKind] {
        &[CollectionKind::Lp, CollectionKind::Ep, CollectionKind::Single]
    }

    /// Inclusive range of track counts for this release type
    pub fn track_count_range(&self) -> (u32, u32) {
        match self {
            CollectionKind::Lp => (7, 15),
            CollectionKind::Ep => (4, 7),
            CollectionKind::Single => (1, 3),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Lp => "LP",
            CollectionKind::Ep => "EP",
            CollectionKind::Single => "SINGLE",
        };
        write!(f, "{}", name)
    }
}

/// A release (album, EP or single) with its tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub artist_id: ArtistId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub genre_id: GenreId,
    pub released_dt: NaiveDate,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Payload for creating a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCollection {
    pub artist_id: ArtistId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub genre_id: GenreId,
    pub released_dt: NaiveDate,
    pub tracks: Vec<NewTrack>,
}

/// Public profile sent with a sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
}

/// Sign-up payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub country_code: String,
    pub profile: UserProfile,
}
