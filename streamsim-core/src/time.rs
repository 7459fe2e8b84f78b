//! Simulated time abstraction
//!
//! Anything that needs "now" in the simulated timeline takes a [`SimNow`]
//! rather than reading the system clock, so the backend client can stamp
//! requests without depending on the engine that owns the clock.

use chrono::{DateTime, Utc};

/// An absolute instant in the simulated timeline
pub type SimTime = DateTime<Utc>;

/// Source of the current simulated time
pub trait SimNow: Send + Sync {
    /// Current simulated time
    fn now(&self) -> SimTime;
}

/// Fixed time source, mostly useful in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedSimNow(pub SimTime);

impl SimNow for FixedSimNow {
    fn now(&self) -> SimTime {
        self.0
    }
}
