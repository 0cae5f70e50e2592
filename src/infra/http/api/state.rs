use std::sync::Arc;
use std::time::Duration;

use crate::application::analytics::AnalyticsService;
use crate::application::auth::IdentityVerifier;
use crate::application::events::EventService;
use crate::application::locations::LocationService;
use crate::application::repos::StoreHealth;
use crate::cache::{CacheStore, InvalidationCoordinator};
use crate::realtime::SessionRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub events: Arc<EventService>,
    pub locations: Arc<LocationService>,
    pub analytics: Arc<AnalyticsService>,
    pub invalidation: InvalidationCoordinator,
    pub sessions: Arc<SessionRegistry>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub health: Arc<dyn StoreHealth>,
    pub cache_store: Arc<dyn CacheStore>,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}
