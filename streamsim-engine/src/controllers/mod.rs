//! Population controllers
//!
//! Each controller owns its queue and registry and runs a few independent
//! periodic loops (create, select, run, and for users clean-up) under the
//! engine's run gate.

pub mod artist;
pub mod country;
pub mod user;

pub use artist::ArtistController;
pub use country::CountryController;
pub use user::UserController;
