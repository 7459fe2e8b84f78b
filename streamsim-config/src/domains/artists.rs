//! Artist population controller configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_probability, Validatable};
use serde::{Deserialize, Serialize};

/// Genre drift probabilities and release cadence of artists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistsConfig {
    /// A new artist invents a brand-new genre
    pub prob_new_genre: f64,
    /// An existing genre is taken from the artist's own country
    pub prob_same_country_genre: f64,
    /// A same-country genre is derived into a new one
    pub prob_derived_genre_same_country: f64,
    /// A foreign genre is derived into a new one
    pub prob_derived_genre_diff_country: f64,
    /// The artist retires after a release
    pub prob_retired: f64,
    /// A release switches to another genre
    pub prob_collection_new_genre: f64,
    /// A switched release invents its genre instead of deriving it
    pub prob_collection_invent_genre: f64,

    pub queue_capacity: usize,

    pub delay_create_secs: u64,
    pub delay_select_secs: u64,
    pub delay_run_secs: u64,
}

impl Default for ArtistsConfig {
    fn default() -> Self {
        Self {
            prob_new_genre: 0.03,
            prob_same_country_genre: 0.8,
            prob_derived_genre_same_country: 0.02,
            prob_derived_genre_diff_country: 0.1,
            prob_retired: 0.1,
            prob_collection_new_genre: 0.1,
            prob_collection_invent_genre: 0.03,
            queue_capacity: 100,
            delay_create_secs: 86_400,
            delay_select_secs: 86_400,
            delay_run_secs: 18_000,
        }
    }
}

impl ArtistsConfig {
    fn probabilities(&self) -> [(&'static str, f64); 7] {
        [
            ("prob_new_genre", self.prob_new_genre),
            ("prob_same_country_genre", self.prob_same_country_genre),
            ("prob_derived_genre_same_country", self.prob_derived_genre_same_country),
            ("prob_derived_genre_diff_country", self.prob_derived_genre_diff_country),
            ("prob_retired", self.prob_retired),
            ("prob_collection_new_genre", self.prob_collection_new_genre),
            ("prob_collection_invent_genre", self.prob_collection_invent_genre),
        ]
    }
}

impl Validatable for ArtistsConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        for (name, p) in self.probabilities() {
            validate_probability(p, name, domain)?;
        }
        validate_positive(self.queue_capacity, "queue_capacity", domain)?;
        validate_positive(self.delay_create_secs, "delay_create_secs", domain)?;
        validate_positive(self.delay_select_secs, "delay_select_secs", domain)?;
        validate_positive(self.delay_run_secs, "delay_run_secs", domain)?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "artists"
    }
}
