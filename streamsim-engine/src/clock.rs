//! Simulated clock
//!
//! Simulated "now" is the anchored simulated instant plus the real time
//! elapsed since the anchor, scaled by the multiplier. Changing the
//! multiplier re-anchors first, so simulated time already accrued is never
//! rescaled. Waits are expressed in simulated time and follow multiplier
//! changes while they are suspended.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use streamsim_config::ClockConfig;
use streamsim_core::{SimNow, SimTime};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::gate::RunGate;
use crate::schedule::every;

/// A span of simulated time. The unit decides how much jitter a wait gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimSpan {
    Seconds(f64),
    Minutes(f64),
    Hours(f64),
    Days(f64),
}

impl SimSpan {
    pub fn as_secs(&self) -> f64 {
        match self {
            SimSpan::Seconds(n) => *n,
            SimSpan::Minutes(n) => n * 60.0,
            SimSpan::Hours(n) => n * 3_600.0,
            SimSpan::Days(n) => n * 86_400.0,
        }
    }

    /// Largest jitter, in simulated seconds, added to a wait of this span
    pub fn jitter_secs(&self) -> i64 {
        match self {
            SimSpan::Seconds(n) if *n < 60.0 => 1,
            SimSpan::Seconds(_) | SimSpan::Minutes(_) => 5,
            SimSpan::Hours(_) => 5 * 60,
            SimSpan::Days(_) => 2 * 3_600,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    real: Instant,
    sim: SimTime,
    multiplier: f64,
}

impl Anchor {
    fn sim_at(&self, at: Instant) -> SimTime {
        let elapsed = at.saturating_duration_since(self.real);
        let micros = elapsed.as_secs_f64() * self.multiplier * 1e6;
        self.sim
            .checked_add_signed(TimeDelta::microseconds(micros as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn check_multiplier(multiplier: f64) -> EngineResult<()> {
    if multiplier.is_finite() && multiplier > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidMultiplier(multiplier))
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Virtual clock shared by every loop of the engine
#[derive(Debug)]
pub struct SimClock {
    anchor: RwLock<Anchor>,
    multiplier_tx: watch::Sender<f64>,
}

impl SimClock {
    /// Start a clock at `start`, advancing `multiplier` simulated seconds per real second
    pub fn new(start: SimTime, multiplier: f64) -> EngineResult<Self> {
        check_multiplier(multiplier)?;
        let (multiplier_tx, _rx) = watch::channel(multiplier);
        Ok(Self {
            anchor: RwLock::new(Anchor {
                real: Instant::now(),
                sim: start,
                multiplier,
            }),
            multiplier_tx,
        })
    }

    pub fn from_config(config: &ClockConfig, start: SimTime) -> EngineResult<Self> {
        Self::new(start, config.multiplier)
    }

    pub fn now(&self) -> SimTime {
        self.anchor.read().sim_at(Instant::now())
    }

    pub fn multiplier(&self) -> f64 {
        self.anchor.read().multiplier
    }

    /// Simulated duration covered by `real` at the current multiplier
    pub fn to_sim_duration(&self, real: Duration) -> Duration {
        secs_to_duration(real.as_secs_f64() * self.multiplier())
    }

    /// Real duration needed to cover `sim` at the current multiplier
    pub fn to_real_duration(&self, sim: Duration) -> Duration {
        secs_to_duration(sim.as_secs_f64() / self.multiplier())
    }

    /// Change the speed of the simulation from now on
    pub fn set_multiplier(&self, multiplier: f64) -> EngineResult<()> {
        check_multiplier(multiplier)?;
        let previous = {
            let mut anchor = self.anchor.write();
            let at = Instant::now();
            let previous = anchor.multiplier;
            *anchor = Anchor {
                real: at,
                sim: anchor.sim_at(at),
                multiplier,
            };
            previous
        };
        self.multiplier_tx.send_replace(multiplier);
        info!(from = previous, to = multiplier, "Changed clock multiplier");
        Ok(())
    }

    /// Fold the real time elapsed since the last anchor into the simulated anchor
    pub fn resync(&self) {
        let mut anchor = self.anchor.write();
        let at = Instant::now();
        anchor.sim = anchor.sim_at(at);
        anchor.real = at;
    }

    /// Suspend for `span` of simulated time, optionally jittered
    pub async fn wait(&self, span: SimSpan, jitter: bool) {
        let mut secs = span.as_secs();
        if jitter {
            let max = span.jitter_secs();
            secs += rand::rng().random_range(-max..=max) as f64;
        }
        self.sleep_sim(secs).await;
    }

    pub async fn wait_sim_seconds(&self, seconds: f64, jitter: bool) {
        self.wait(SimSpan::Seconds(seconds), jitter).await;
    }

    pub async fn wait_sim_minutes(&self, minutes: f64, jitter: bool) {
        self.wait(SimSpan::Minutes(minutes), jitter).await;
    }

    pub async fn wait_sim_hours(&self, hours: f64, jitter: bool) {
        self.wait(SimSpan::Hours(hours), jitter).await;
    }

    pub async fn wait_sim_days(&self, days: f64, jitter: bool) {
        self.wait(SimSpan::Days(days), jitter).await;
    }

    async fn sleep_sim(&self, sim_secs: f64) {
        let mut rx = self.multiplier_tx.subscribe();
        let mut remaining = sim_secs;
        while remaining > 0.0 {
            let multiplier = *rx.borrow_and_update();
            let real = secs_to_duration(remaining / multiplier);
            let started = Instant::now();
            tokio::select! {
                _ = tokio::time::sleep(real) => return,
                changed = rx.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep(real.saturating_sub(started.elapsed())).await;
                        return;
                    }
                    remaining -= started.elapsed().as_secs_f64() * multiplier;
                    debug!(remaining_sim_secs = remaining, "Wait rescaled to new multiplier");
                }
            }
        }
    }

    /// Re-anchor every `interval_secs` simulated seconds while the gate is open
    pub async fn run_resync(self: Arc<Self>, gate: RunGate, interval_secs: u64) -> EngineResult<()> {
        let clock = &self;
        every(
            "clock_resync",
            &gate,
            &self,
            SimSpan::Seconds(interval_secs as f64),
            false,
            move || async move {
                clock.resync();
                Ok(())
            },
        )
        .await
    }

    /// Log the simulated time every `interval_secs` simulated seconds
    pub async fn run_report(self: Arc<Self>, gate: RunGate, interval_secs: u64) -> EngineResult<()> {
        let clock = &self;
        let started = Instant::now();
        every(
            "clock_report",
            &gate,
            &self,
            SimSpan::Seconds(interval_secs as f64),
            true,
            move || async move {
                info!(
                    sim_time = %clock.now(),
                    real_elapsed_secs = started.elapsed().as_secs(),
                    multiplier = clock.multiplier(),
                    "Simulation clock"
                );
                Ok(())
            },
        )
        .await
    }
}

impl SimNow for SimClock {
    fn now(&self) -> SimTime {
        SimClock::now(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> SimTime {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_scales_real_time() {
        let clock = SimClock::new(start(), 3600.0).unwrap();
        assert_eq!(clock.now(), start());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(clock.now(), start() + TimeDelta::hours(2));
    }

    #[test]
    fn test_duration_conversion() {
        let clock = SimClock::new(start(), 60.0).unwrap();
        assert_eq!(clock.to_sim_duration(Duration::from_secs(3)), Duration::from_secs(180));
        assert_eq!(clock.to_real_duration(Duration::from_secs(180)), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplier_change_is_not_retroactive() {
        let clock = SimClock::new(start(), 3600.0).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        let before = clock.now();
        clock.set_multiplier(1.0).unwrap();
        assert_eq!(clock.now(), before);
        assert_eq!(before, start() + TimeDelta::hours(1));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(clock.now(), before + TimeDelta::seconds(10));
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        assert!(matches!(
            SimClock::new(start(), 0.0),
            Err(EngineError::InvalidMultiplier(_))
        ));
        let clock = SimClock::new(start(), 1.0).unwrap();
        assert!(clock.set_multiplier(-2.0).is_err());
        assert!(clock.set_multiplier(f64::NAN).is_err());
        assert_eq!(clock.multiplier(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_keeps_now() {
        let clock = SimClock::new(start(), 100.0).unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;
        let before = clock.now();
        clock.resync();
        assert_eq!(clock.now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_translates_to_real_time() {
        let clock = SimClock::new(start(), 3600.0).unwrap();
        let begin = Instant::now();
        clock.wait_sim_seconds(3600.0, false).await;
        let elapsed = begin.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_follows_multiplier_change() {
        let clock = Arc::new(SimClock::new(start(), 3600.0).unwrap());
        let begin = Instant::now();
        let waiter = {
            let clock = clock.clone();
            tokio::spawn(async move { clock.wait_sim_seconds(7200.0, false).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        clock.set_multiplier(7200.0).unwrap();
        waiter.await.unwrap();

        let elapsed = begin.elapsed();
        assert!(elapsed >= Duration::from_millis(1400), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1600), "{:?}", elapsed);
    }

    #[test]
    fn test_jitter_grows_with_span() {
        assert_eq!(SimSpan::Seconds(10.0).jitter_secs(), 1);
        assert_eq!(SimSpan::Seconds(120.0).jitter_secs(), 5);
        assert_eq!(SimSpan::Minutes(1.0).jitter_secs(), 5);
        assert_eq!(SimSpan::Hours(1.0).jitter_secs(), 300);
        assert_eq!(SimSpan::Days(30.0).jitter_secs(), 7200);
        assert_eq!(SimSpan::Days(2.0).as_secs(), 172_800.0);
    }
}
