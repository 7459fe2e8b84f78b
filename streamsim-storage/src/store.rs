//! Entity store trait

use async_trait::async_trait;
use streamsim_core::ids::{ArtistId, TrackId, UserId};
use streamsim_core::{ArtistSim, TrackStats, UserSim};

use crate::StorageResult;

/// Keyed upsert/find access to shadow records.
///
/// Implementations must be safe to share between any number of tasks.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a newly registered user; ids and e-mails are unique
    async fn insert_user(&self, user: UserSim) -> StorageResult<()>;
    async fn get_user(&self, id: UserId) -> StorageResult<Option<UserSim>>;
    /// Replace an existing user record
    async fn update_user(&self, user: UserSim) -> StorageResult<()>;
    /// Up to `limit` users in random order
    async fn random_users(&self, limit: usize) -> StorageResult<Vec<UserSim>>;
    async fn user_count(&self) -> StorageResult<usize>;

    async fn insert_artist(&self, artist: ArtistSim) -> StorageResult<()>;
    async fn get_artist(&self, id: ArtistId) -> StorageResult<Option<ArtistSim>>;
    async fn update_artist(&self, artist: ArtistSim) -> StorageResult<()>;
    /// A random artist that has not retired
    async fn random_active_artist(&self) -> StorageResult<Option<ArtistSim>>;
    async fn artist_count(&self) -> StorageResult<usize>;

    /// Count one more listen of a track, creating its counter on first use.
    /// Returns the new count.
    async fn increment_listen_count(&self, track_id: TrackId) -> StorageResult<u64>;
    async fn track_stats(&self, track_id: TrackId) -> StorageResult<Option<TrackStats>>;
    /// Up to `limit` tracks with the highest listen counts, highest first
    async fn most_listened(&self, limit: usize) -> StorageResult<Vec<TrackStats>>;
}
