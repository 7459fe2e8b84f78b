//! Backoff strategies for retry policies

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,

    /// Linear increase: delay = initial_delay * attempt
    Linear,

    /// Exponential increase: delay = initial_delay * base^(attempt-1)
    Exponential {
        /// Base for exponential calculation (e.g., 2.0 for doubling)
        base: f64,
    },

    /// Uniform draw in `[0, min(max_delay, initial_delay * base^(attempt-1))]`
    ///
    /// Also known as "full jitter". Spreads retries of many concurrent agents
    /// that failed at the same instant.
    RandomExponential { base: f64 },
}

/// Backoff delay calculator
pub struct BackoffCalculator {
    strategy: BackoffStrategy,
    initial_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl BackoffCalculator {
    /// Create a new backoff calculator
    pub fn new(
        strategy: BackoffStrategy,
        initial_delay: Duration,
        max_delay: Duration,
        jitter: bool,
    ) -> Self {
        Self {
            strategy,
            initial_delay,
            max_delay,
            jitter,
        }
    }

    /// Calculate delay for a specific attempt (1-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let capped_delay = self.calculate_base_delay(attempt).min(self.max_delay);

        match self.strategy {
            // Already fully randomized
            BackoffStrategy::RandomExponential { .. } => {
                let ceiling = capped_delay.as_secs_f64();
                if ceiling <= 0.0 {
                    return Duration::ZERO;
                }
                Duration::from_secs_f64(rand::rng().random_range(0.0..=ceiling))
            }
            _ if self.jitter => self.add_jitter(capped_delay),
            _ => capped_delay,
        }
    }

    fn calculate_base_delay(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Fixed => self.initial_delay,

            BackoffStrategy::Linear => self.initial_delay.saturating_mul(attempt),

            BackoffStrategy::Exponential { base } | BackoffStrategy::RandomExponential { base } => {
                if attempt == 0 {
                    return Duration::ZERO;
                }
                let factor = base.powi(attempt as i32 - 1);
                let secs = self.initial_delay.as_secs_f64() * factor;
                if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
                    self.max_delay
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        // Add ±20% jitter
        let jitter_factor = rand::rng().random_range(0.8..1.2);
        delay.mul_f64(jitter_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Fixed,
            Duration::from_millis(100),
            Duration::from_secs(1),
            false,
        );

        assert_eq!(calc.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(calc.calculate_delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_linear_backoff() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Linear,
            Duration::from_millis(100),
            Duration::from_secs(1),
            false,
        );

        assert_eq!(calc.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(calc.calculate_delay(20), Duration::from_secs(1)); // Capped at max
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Exponential { base: 2.0 },
            Duration::from_secs(1),
            Duration::from_secs(5),
            false,
        );

        assert_eq!(calc.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(calc.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(calc.calculate_delay(3), Duration::from_secs(4));
        assert_eq!(calc.calculate_delay(4), Duration::from_secs(5));
        assert_eq!(calc.calculate_delay(500), Duration::from_secs(5));
    }

    #[test]
    fn test_random_exponential_stays_under_ceiling() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::RandomExponential { base: 2.0 },
            Duration::from_secs(1),
            Duration::from_secs(5),
            false,
        );

        for _ in 0..200 {
            assert!(calc.calculate_delay(1) <= Duration::from_secs(1));
            assert!(calc.calculate_delay(2) <= Duration::from_secs(2));
            assert!(calc.calculate_delay(8) <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_jitter() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Fixed,
            Duration::from_millis(1000),
            Duration::from_secs(10),
            true,
        );

        let delay = calc.calculate_delay(1);
        assert!(delay >= Duration::from_millis(800));
        assert!(delay <= Duration::from_millis(1200));
    }
}
