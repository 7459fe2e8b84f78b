//! Probability helpers shared by the agents
//!
//! Behavioral traits are percentages drawn from a normal distribution
//! truncated to `[0, 100]`, then scaled to a probability in `[0, 1]`.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Rejection sampling gives up after this many draws and clamps instead
const MAX_REJECTION_ATTEMPTS: usize = 1000;

/// Mean and standard deviation of a behavioral trait, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitDistribution {
    pub mean: f64,
    pub sigma: f64,
}

impl TraitDistribution {
    pub const fn new(mean: f64, sigma: f64) -> Self {
        Self { mean, sigma }
    }

    /// Draw a probability in `[0, 1]`
    pub fn sample_probability<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let percent = truncated_normal(rng, self.mean, self.sigma, 0.0, 100.0)?;
        Ok(percent.clamp(0.0, 100.0) * 0.01)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(CoreError::InvalidDistribution(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !self.mean.is_finite() {
            return Err(CoreError::InvalidDistribution(format!(
                "mean must be finite, got {}",
                self.mean
            )));
        }
        Ok(())
    }
}

/// Draw from N(mean, sigma) restricted to `[min, max]`
pub fn truncated_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    sigma: f64,
    min: f64,
    max: f64,
) -> Result<f64> {
    if min > max {
        return Err(CoreError::InvalidDistribution(format!(
            "empty truncation interval [{}, {}]",
            min, max
        )));
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CoreError::InvalidDistribution(format!(
            "sigma must be positive and finite, got {}",
            sigma
        )));
    }
    let normal = Normal::new(mean, sigma)
        .map_err(|e| CoreError::InvalidDistribution(format!("N({}, {}): {}", mean, sigma, e)))?;

    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let value = normal.sample(rng);
        if (min..=max).contains(&value) {
            return Ok(value);
        }
    }
    // The interval sits far in a tail; settle for the nearest bound
    Ok(mean.clamp(min, max))
}

/// Bernoulli trial with probability `p`; values outside `[0, 1]` saturate
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}
