//! Weighted random selection
//!
//! Pure functions over a weight map and a caller-provided random source, so
//! tests can seed them.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::LN_2;
use streamsim_core::{Country, SimTime};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Pick a key with probability proportional to its weight.
///
/// With `with_none`, weights summing to `w < 1` leave `1 - w` of the
/// probability mass to a "no selection" outcome. Negative or non-finite
/// weights count as zero; an empty or all-zero map yields `None`.
pub fn choose_weighted<K, R>(weights: &BTreeMap<K, f64>, with_none: bool, rng: &mut R) -> Option<K>
where
    K: Ord + Clone,
    R: Rng + ?Sized,
{
    let keys: Vec<&K> = weights.keys().collect();
    let mut masses: Vec<f64> = weights
        .values()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();

    let total: f64 = masses.iter().sum();
    if with_none && total < 1.0 {
        masses.push(1.0 - total);
    }

    let index = WeightedIndex::new(&masses).ok()?.sample(rng);
    keys.get(index).map(|k| (*k).clone())
}

/// Recency weight of something `age_days` old: 1 when new, halving every `half_life_days`
pub fn decay_weight(age_days: f64, half_life_days: f64) -> f64 {
    let lambda = LN_2 / half_life_days;
    (-lambda * age_days.max(0.0)).exp()
}

/// Weights of the enabled countries at `now`; disabled countries are left out
pub fn country_weights(countries: &[Country], now: SimTime, half_life_days: f64) -> BTreeMap<String, f64> {
    countries
        .iter()
        .filter_map(|c| {
            let enabled_at = c.enabled_at?;
            let age_days = (now - enabled_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
            Some((c.code.clone(), decay_weight(age_days, half_life_days)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn country(code: &str, enabled_at: Option<SimTime>) -> Country {
        Country {
            code: code.to_string(),
            name: code.to_string(),
            enabled_at,
        }
    }

    #[test]
    fn test_none_share_matches_missing_mass() {
        let mut rng = StdRng::seed_from_u64(2024);
        let weights = BTreeMap::from([("a", 0.2), ("b", 0.3)]);
        let draws = 100_000;

        let mut counts = [0usize; 3];
        for _ in 0..draws {
            match choose_weighted(&weights, true, &mut rng) {
                Some("a") => counts[0] += 1,
                Some("b") => counts[1] += 1,
                None => counts[2] += 1,
                Some(other) => panic!("unexpected key {}", other),
            }
        }

        // chi-square, 2 degrees of freedom, critical value at p = 0.001
        let expected = [0.2, 0.3, 0.5].map(|p| p * draws as f64);
        let chi2: f64 = counts
            .iter()
            .zip(expected)
            .map(|(&observed, e)| (observed as f64 - e).powi(2) / e)
            .sum();
        assert!(chi2 < 13.82, "chi2 = {}, counts = {:?}", chi2, counts);
    }

    #[test]
    fn test_without_none_always_selects() {
        let mut rng = StdRng::seed_from_u64(1);
        let weights = BTreeMap::from([("a", 0.1), ("b", 0.1)]);
        for _ in 0..1000 {
            assert!(choose_weighted(&weights, false, &mut rng).is_some());
        }
    }

    #[test]
    fn test_mass_above_one_never_yields_none() {
        let mut rng = StdRng::seed_from_u64(9);
        let weights = BTreeMap::from([("a", 0.8), ("b", 0.7)]);
        for _ in 0..1000 {
            assert!(choose_weighted(&weights, true, &mut rng).is_some());
        }
    }

    #[test]
    fn test_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let empty: BTreeMap<&str, f64> = BTreeMap::new();
        assert_eq!(choose_weighted(&empty, false, &mut rng), None);
        assert_eq!(choose_weighted(&empty, true, &mut rng), None);

        let zeros = BTreeMap::from([("a", 0.0), ("b", -1.0)]);
        assert_eq!(choose_weighted(&zeros, false, &mut rng), None);

        let one = BTreeMap::from([("a", 0.0), ("b", 2.0)]);
        assert_eq!(choose_weighted(&one, false, &mut rng), Some("b"));
    }

    #[test]
    fn test_decay_weight() {
        assert_eq!(decay_weight(0.0, 14.0), 1.0);
        assert!((decay_weight(14.0, 14.0) - 0.5).abs() < 1e-12);
        assert!((decay_weight(28.0, 14.0) - 0.25).abs() < 1e-12);
        assert_eq!(decay_weight(-3.0, 14.0), 1.0);
    }

    #[test]
    fn test_recent_countries_weigh_more() {
        let now = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let countries = vec![
            country("NO", Some(now - Duration::days(40))),
            country("SE", Some(now - Duration::days(3))),
            country("FI", Some(now)),
            country("DK", None),
        ];

        let weights = country_weights(&countries, now, 14.0);
        assert_eq!(weights.len(), 3);
        assert!(!weights.contains_key("DK"));
        assert!(weights["NO"] <= weights["SE"]);
        assert!(weights["SE"] <= weights["FI"]);
        assert_eq!(weights["FI"], 1.0);
    }
}
