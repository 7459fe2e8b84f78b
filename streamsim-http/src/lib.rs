//! Client for the backend exercised by the simulator
//!
//! Every call goes through [`ServiceClient`]. The production implementation,
//! [`HttpServiceClient`], stamps each request with the simulated time and
//! retries transport failures with randomized exponential backoff.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types for convenience
pub use client::{HttpServiceClient, ServiceClient};
pub use config::ServiceClientConfig;
pub use errors::{HttpError, HttpResult};
pub use types::AccessToken;
