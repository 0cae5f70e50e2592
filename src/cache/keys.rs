//! Logical cache keys and the static collection dependency table.

use std::fmt;

use crate::domain::types::Collection;

/// A cached collection snapshot. Each key names a query shape, never a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Every event, ordered by date then title, with the joined location name.
    EventsAll,
    /// Every location, ordered by name.
    LocationsAll,
    /// Aggregate counts across both collections.
    AnalyticsSummary,
}

impl CacheKey {
    pub const ALL: [CacheKey; 3] = [
        CacheKey::EventsAll,
        CacheKey::LocationsAll,
        CacheKey::AnalyticsSummary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::EventsAll => "events:all",
            CacheKey::LocationsAll => "locations:all",
            CacheKey::AnalyticsSummary => "analytics:summary",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EVENTS_DEPENDENTS: &[CacheKey] = &[CacheKey::EventsAll, CacheKey::AnalyticsSummary];

// The events listing embeds location names, so a location change stales it too.
const LOCATIONS_DEPENDENTS: &[CacheKey] = &[
    CacheKey::LocationsAll,
    CacheKey::EventsAll,
    CacheKey::AnalyticsSummary,
];

/// Keys whose content is derived from `collection`.
pub fn dependent_keys(collection: Collection) -> &'static [CacheKey] {
    match collection {
        Collection::Events => EVENTS_DEPENDENTS,
        Collection::Locations => LOCATIONS_DEPENDENTS,
    }
}
