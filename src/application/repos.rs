//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::domain::entities::{AnalyticsSummary, EventRecord, LocationRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateEventParams {
    pub title: String,
    pub date: Date,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
}

/// Full replacement of an event's mutable fields.
#[derive(Debug, Clone)]
pub struct UpdateEventParams {
    pub id: Uuid,
    pub title: String,
    pub date: Date,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateLocationParams {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

#[async_trait]
pub trait EventsRepo: Send + Sync {
    /// All events ordered by date, then title.
    async fn list_events(&self) -> Result<Vec<EventRecord>, RepoError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError>;
}

#[async_trait]
pub trait EventsWriteRepo: Send + Sync {
    async fn create_event(&self, params: CreateEventParams) -> Result<EventRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the event does not exist.
    async fn update_event(&self, params: UpdateEventParams) -> Result<EventRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the event does not exist.
    async fn delete_event(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait LocationsRepo: Send + Sync {
    /// All locations ordered by name.
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError>;

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError>;
}

#[async_trait]
pub trait LocationsWriteRepo: Send + Sync {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError>;

    async fn update_location(
        &self,
        params: UpdateLocationParams,
    ) -> Result<LocationRecord, RepoError>;

    /// Events at the removed location keep existing without one.
    async fn delete_location(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    /// Aggregate counts; events dated on or after `today` count as upcoming.
    async fn load_summary(&self, today: Date) -> Result<AnalyticsSummary, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
