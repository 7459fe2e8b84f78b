//! Core domain models and types for the streaming load simulator
//!
//! This crate holds the records exchanged with the exercised backend, the
//! simulation-side shadow records, and the small amount of shared
//! probability code the agents rely on. It has minimal dependencies and
//! defines the domain language of the simulator.

pub mod error;
pub mod ids;
pub mod models;
pub mod probability;
pub mod shadow;
pub mod time;

// Re-export commonly used types at the crate root
pub use error::{CoreError, Result};
pub use ids::{ArtistId, CollectionId, GenreId, TrackId, UserId};
pub use models::{
    Artist, Collection, CollectionKind, Country, Genre, NewArtist, NewCollection, NewGenre,
    NewTrack, SignUp, Track, UserProfile,
};
pub use probability::TraitDistribution;
pub use shadow::{ArtistSim, TrackStats, TraitProfile, UserSim, UserTraits};
pub use time::{FixedSimNow, SimNow, SimTime};
