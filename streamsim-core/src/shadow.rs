//! Simulation-side shadow records
//!
//! These track bookkeeping the exercised backend does not expose (login
//! credentials, behavioral traits, popularity counters, release history),
//! so the simulator never has to re-query the backend for them.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{ArtistId, TrackId, UserId};
use crate::probability::TraitDistribution;

/// Distributions the six behavioral traits are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitProfile {
    pub patriotism: TraitDistribution,
    pub explorer: TraitDistribution,
    pub skip: TraitDistribution,
    pub picky: TraitDistribution,
    pub collection: TraitDistribution,
    pub popularity: TraitDistribution,
}

impl Default for TraitProfile {
    fn default() -> Self {
        Self {
            patriotism: TraitDistribution::new(30.0, 20.0),
            explorer: TraitDistribution::new(30.0, 20.0),
            skip: TraitDistribution::new(80.0, 30.0),
            picky: TraitDistribution::new(30.0, 20.0),
            collection: TraitDistribution::new(20.0, 20.0),
            popularity: TraitDistribution::new(80.0, 20.0),
        }
    }
}

impl TraitProfile {
    pub fn all(&self) -> [(&'static str, &TraitDistribution); 6] {
        [
            ("patriotism", &self.patriotism),
            ("explorer", &self.explorer),
            ("skip", &self.skip),
            ("picky", &self.picky),
            ("collection", &self.collection),
            ("popularity", &self.popularity),
        ]
    }
}

/// Behavioral traits of a simulated listener, each a probability in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserTraits {
    /// Preference for music from the user's own country
    pub patriotism: f64,
    /// Tendency to look for new music instead of replaying liked content
    pub explorer: f64,
    /// Tendency to skip a track before it ends
    pub skip: f64,
    /// Reluctance to like a track
    pub picky: f64,
    /// Preference for whole collections over single tracks
    pub collection: f64,
    /// Bias towards the most listened tracks
    pub popularity: f64,
}

impl UserTraits {
    /// Draw a fresh set of traits, once per user at creation
    pub fn sample<R: Rng + ?Sized>(profile: &TraitProfile, rng: &mut R) -> Result<Self> {
        Ok(Self {
            patriotism: profile.patriotism.sample_probability(rng)?,
            explorer: profile.explorer.sample_probability(rng)?,
            skip: profile.skip.sample_probability(rng)?,
            picky: profile.picky.sample_probability(rng)?,
            collection: profile.collection.sample_probability(rng)?,
            popularity: profile.popularity.sample_probability(rng)?,
        })
    }

    /// Traits with the same value everywhere
    pub fn uniform(p: f64) -> Self {
        Self {
            patriotism: p,
            explorer: p,
            skip: p,
            picky: p,
            collection: p,
            popularity: p,
        }
    }
}

/// Shadow record of a registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSim {
    pub id: UserId,
    pub email: String,
    pub password: String,
    pub country_code: String,
    pub is_premium: bool,
    pub traits: UserTraits,
    pub created_at: DateTime<Utc>,
}

/// Shadow record of an artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSim {
    pub artist_id: ArtistId,
    pub last_release_at: Option<DateTime<Utc>>,
    pub retired: bool,
    pub created_at: DateTime<Utc>,
}

impl ArtistSim {
    pub fn new(artist_id: ArtistId, created_at: DateTime<Utc>) -> Self {
        Self {
            artist_id,
            last_release_at: None,
            retired: false,
            created_at,
        }
    }
}

/// Simulated popularity counter of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStats {
    pub track_id: TrackId,
    pub listen_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sampled_traits_are_probabilities() {
        let mut rng = StdRng::seed_from_u64(42);
        let profile = TraitProfile::default();
        for _ in 0..500 {
            let t = UserTraits::sample(&profile, &mut rng).unwrap();
            for p in [t.patriotism, t.explorer, t.skip, t.picky, t.collection, t.popularity] {
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_default_profile_is_valid() {
        for (name, dist) in TraitProfile::default().all() {
            assert!(dist.validate().is_ok(), "{} invalid", name);
        }
    }
}
