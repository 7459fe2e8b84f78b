//! Shadow-record storage for the simulator
//!
//! The simulator keeps its own bookkeeping next to the exercised backend:
//! user credentials and traits, artist release history and per-track listen
//! counters. [`EntityStore`] is the seam; [`InMemoryEntityStore`] is the
//! implementation used by the engine.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryEntityStore;
pub use store::EntityStore;
