//! Collaborators shared by the agents and controllers

use std::sync::Arc;
use streamsim_http::ServiceClient;
use streamsim_storage::EntityStore;

use crate::clock::SimClock;

/// Backend client, shadow-record store and clock, as one cheap-to-clone bundle
#[derive(Clone)]
pub struct SimContext {
    pub client: Arc<dyn ServiceClient>,
    pub store: Arc<dyn EntityStore>,
    pub clock: Arc<SimClock>,
}

impl SimContext {
    pub fn new(client: Arc<dyn ServiceClient>, store: Arc<dyn EntityStore>, clock: Arc<SimClock>) -> Self {
        Self { client, store, clock }
    }
}
