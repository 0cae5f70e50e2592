//! Cache configuration.
//!
//! TTLs live in one place, `[cache.ttl]`, and are looked up per key.

use std::time::Duration;

use super::keys::CacheKey;

const DEFAULT_EVENTS_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_LOCATIONS_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_ANALYTICS_TTL: Duration = Duration::from_secs(600);

/// Expiry backstop per cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub events_ttl: Duration,
    pub locations_ttl: Duration,
    pub analytics_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            events_ttl: DEFAULT_EVENTS_TTL,
            locations_ttl: DEFAULT_LOCATIONS_TTL,
            analytics_ttl: DEFAULT_ANALYTICS_TTL,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            events_ttl: settings.ttl.events,
            locations_ttl: settings.ttl.locations,
            analytics_ttl: settings.ttl.analytics,
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, key: CacheKey) -> Duration {
        match key {
            CacheKey::EventsAll => self.events_ttl,
            CacheKey::LocationsAll => self.locations_ttl,
            CacheKey::AnalyticsSummary => self.analytics_ttl,
        }
    }
}
