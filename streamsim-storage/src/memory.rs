//! In-memory entity store

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::{IndexedRandom, IteratorRandom};
use std::collections::HashMap;
use std::sync::Arc;
use streamsim_core::ids::{ArtistId, TrackId, UserId};
use streamsim_core::{ArtistSim, TrackStats, UserSim};
use tracing::debug;

use crate::{EntityStore, StorageError, StorageResult};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserSim>,
    emails: HashMap<String, UserId>,
    artists: HashMap<ArtistId, ArtistSim>,
    tracks: HashMap<TrackId, u64>,
}

/// Entity store backed by hash maps
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn insert_user(&self, user: UserSim) -> StorageResult<()> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id) {
            return Err(StorageError::DuplicateKey(format!("user {}", user.id)));
        }
        if tables.emails.contains_key(&user.email) {
            return Err(StorageError::DuplicateKey(format!("email {}", user.email)));
        }
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StorageResult<Option<UserSim>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn update_user(&self, user: UserSim) -> StorageResult<()> {
        let mut tables = self.tables.write();
        match tables.users.get_mut(&user.id) {
            Some(existing) if existing.email == user.email => {
                *existing = user;
                Ok(())
            }
            Some(_) => Err(StorageError::Other(format!(
                "e-mail of user {} cannot change",
                user.id
            ))),
            None => Err(StorageError::not_found("user", user.id)),
        }
    }

    async fn random_users(&self, limit: usize) -> StorageResult<Vec<UserSim>> {
        let tables = self.tables.read();
        let mut rng = rand::rng();
        Ok(tables
            .users
            .values()
            .choose_multiple(&mut rng, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn user_count(&self) -> StorageResult<usize> {
        Ok(self.tables.read().users.len())
    }

    async fn insert_artist(&self, artist: ArtistSim) -> StorageResult<()> {
        let mut tables = self.tables.write();
        if tables.artists.contains_key(&artist.artist_id) {
            return Err(StorageError::DuplicateKey(format!("artist {}", artist.artist_id)));
        }
        tables.artists.insert(artist.artist_id, artist);
        Ok(())
    }

    async fn get_artist(&self, id: ArtistId) -> StorageResult<Option<ArtistSim>> {
        Ok(self.tables.read().artists.get(&id).cloned())
    }

    async fn update_artist(&self, artist: ArtistSim) -> StorageResult<()> {
        let mut tables = self.tables.write();
        match tables.artists.get_mut(&artist.artist_id) {
            Some(existing) => {
                *existing = artist;
                Ok(())
            }
            None => Err(StorageError::not_found("artist", artist.artist_id)),
        }
    }

    async fn random_active_artist(&self) -> StorageResult<Option<ArtistSim>> {
        let tables = self.tables.read();
        let active: Vec<&ArtistSim> = tables.artists.values().filter(|a| !a.retired).collect();
        Ok(active.choose(&mut rand::rng()).map(|a| (*a).clone()))
    }

    async fn artist_count(&self) -> StorageResult<usize> {
        Ok(self.tables.read().artists.len())
    }

    async fn increment_listen_count(&self, track_id: TrackId) -> StorageResult<u64> {
        let mut tables = self.tables.write();
        let count = tables.tracks.entry(track_id).or_insert(0);
        *count += 1;
        debug!(%track_id, listen_count = *count, "Track listened");
        Ok(*count)
    }

    async fn track_stats(&self, track_id: TrackId) -> StorageResult<Option<TrackStats>> {
        Ok(self
            .tables
            .read()
            .tracks
            .get(&track_id)
            .map(|&listen_count| TrackStats {
                track_id,
                listen_count,
            }))
    }

    async fn most_listened(&self, limit: usize) -> StorageResult<Vec<TrackStats>> {
        let tables = self.tables.read();
        let mut stats: Vec<TrackStats> = tables
            .tracks
            .iter()
            .map(|(&track_id, &listen_count)| TrackStats {
                track_id,
                listen_count,
            })
            .collect();
        // Ties broken by id so the ranking is stable
        stats.sort_by(|a, b| {
            b.listen_count
                .cmp(&a.listen_count)
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
        stats.truncate(limit);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use streamsim_core::UserTraits;

    fn user(email: &str) -> UserSim {
        UserSim {
            id: UserId::new(),
            email: email.to_string(),
            password: "secret".to_string(),
            country_code: "NO".to_string(),
            is_premium: false,
            traits: UserTraits::uniform(0.5),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_upsert_and_find() {
        let store = InMemoryEntityStore::new();
        let mut u = user("a@example.com");
        store.insert_user(u.clone()).await.unwrap();

        u.is_premium = true;
        store.update_user(u.clone()).await.unwrap();
        assert!(store.get_user(u.id).await.unwrap().unwrap().is_premium);
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryEntityStore::new();
        store.insert_user(user("a@example.com")).await.unwrap();
        let err = store.insert_user(user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_user_fails() {
        let store = InMemoryEntityStore::new();
        let err = store.update_user(user("x@example.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { kind: "user", .. }));
    }

    #[tokio::test]
    async fn test_random_users_respects_limit() {
        let store = InMemoryEntityStore::new();
        for i in 0..10 {
            store.insert_user(user(&format!("u{}@example.com", i))).await.unwrap();
        }
        assert_eq!(store.random_users(3).await.unwrap().len(), 3);
        assert_eq!(store.random_users(50).await.unwrap().len(), 10);
        assert!(store.random_users(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retired_artists_never_selected() {
        let store = InMemoryEntityStore::new();
        let mut retired = ArtistSim::new(ArtistId::new(), Utc::now());
        retired.retired = true;
        store.insert_artist(retired).await.unwrap();
        assert!(store.random_active_artist().await.unwrap().is_none());

        let active = ArtistSim::new(ArtistId::new(), Utc::now());
        store.insert_artist(active.clone()).await.unwrap();
        for _ in 0..20 {
            let picked = store.random_active_artist().await.unwrap().unwrap();
            assert_eq!(picked.artist_id, active.artist_id);
        }
    }

    #[tokio::test]
    async fn test_listen_counter_is_monotonic() {
        let store = InMemoryEntityStore::new();
        let track = TrackId::new();
        assert_eq!(store.increment_listen_count(track).await.unwrap(), 1);
        assert_eq!(store.increment_listen_count(track).await.unwrap(), 2);
        assert_eq!(store.track_stats(track).await.unwrap().unwrap().listen_count, 2);
    }

    #[tokio::test]
    async fn test_most_listened_ranking() {
        let store = InMemoryEntityStore::new();
        let hit = TrackId::new();
        let filler = TrackId::new();
        let flop = TrackId::new();
        for _ in 0..5 {
            store.increment_listen_count(hit).await.unwrap();
        }
        for _ in 0..2 {
            store.increment_listen_count(filler).await.unwrap();
        }
        store.increment_listen_count(flop).await.unwrap();

        let top = store.most_listened(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].track_id, hit);
        assert_eq!(top[1].track_id, filler);
    }
}
