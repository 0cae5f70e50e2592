use std::sync::Arc;

use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::application::mutation::MutationPipeline;
use crate::application::repos::{
    CreateEventParams, EventsRepo, EventsWriteRepo, LocationsRepo, RepoError, UpdateEventParams,
};
use crate::cache::{CacheAside, CacheKey};
use crate::domain::entities::{EventRecord, normalize_label, normalize_optional};
use crate::domain::error::DomainError;
use crate::domain::types::Collection;
use crate::realtime::Change;

#[derive(Debug, Error)]
pub enum EventServiceError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("event not found")]
    NotFound,
    #[error("location `{0}` does not exist")]
    UnknownLocation(Uuid),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateEventCommand {
    pub title: String,
    pub date: Date,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
}

/// Partial update. `None` keeps the current value; `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default)]
pub struct UpdateEventCommand {
    pub title: Option<String>,
    pub date: Option<Date>,
    pub location_id: Option<Option<Uuid>>,
    pub description: Option<Option<String>>,
}

#[derive(Clone)]
pub struct EventService {
    reader: Arc<dyn EventsRepo>,
    writer: Arc<dyn EventsWriteRepo>,
    locations: Arc<dyn LocationsRepo>,
    cache: CacheAside,
    pipeline: Arc<MutationPipeline>,
}

impl EventService {
    pub fn new(
        reader: Arc<dyn EventsRepo>,
        writer: Arc<dyn EventsWriteRepo>,
        locations: Arc<dyn LocationsRepo>,
        cache: CacheAside,
        pipeline: Arc<MutationPipeline>,
    ) -> Self {
        Self {
            reader,
            writer,
            locations,
            cache,
            pipeline,
        }
    }

    pub async fn list(&self) -> Result<Vec<EventRecord>, EventServiceError> {
        let reader = Arc::clone(&self.reader);
        self.cache
            .read(CacheKey::EventsAll, || async move { reader.list_events().await })
            .await
            .map_err(EventServiceError::from)
    }

    pub async fn create(
        &self,
        command: CreateEventCommand,
    ) -> Result<EventRecord, EventServiceError> {
        let params = CreateEventParams {
            title: normalize_label("title", &command.title)?,
            date: command.date,
            location_id: command.location_id,
            description: normalize_optional(command.description),
        };
        self.ensure_location(params.location_id).await?;

        let record = self
            .pipeline
            .apply(
                Collection::Events,
                self.writer.create_event(params),
                |record| Change::event_added(record.clone()),
            )
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        command: UpdateEventCommand,
    ) -> Result<EventRecord, EventServiceError> {
        let current = self
            .reader
            .find_event(id)
            .await?
            .ok_or(EventServiceError::NotFound)?;

        let title = match command.title {
            Some(title) => normalize_label("title", &title)?,
            None => current.title,
        };
        let location_id = command.location_id.unwrap_or(current.location_id);
        let description = match command.description {
            Some(description) => normalize_optional(description),
            None => current.description,
        };
        let params = UpdateEventParams {
            id,
            title,
            date: command.date.unwrap_or(current.date),
            location_id,
            description,
        };
        self.ensure_location(params.location_id).await?;

        self.pipeline
            .apply(
                Collection::Events,
                self.writer.update_event(params),
                |record| Change::event_updated(record.clone()),
            )
            .await
            .map_err(not_found_as_missing)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EventServiceError> {
        self.pipeline
            .apply(
                Collection::Events,
                self.writer.delete_event(id),
                |_| Change::event_deleted(id),
            )
            .await
            .map_err(not_found_as_missing)
    }

    async fn ensure_location(&self, location_id: Option<Uuid>) -> Result<(), EventServiceError> {
        let Some(location_id) = location_id else {
            return Ok(());
        };
        match self.locations.find_location(location_id).await? {
            Some(_) => Ok(()),
            None => Err(EventServiceError::UnknownLocation(location_id)),
        }
    }
}

fn not_found_as_missing(err: RepoError) -> EventServiceError {
    match err {
        RepoError::NotFound => EventServiceError::NotFound,
        other => EventServiceError::Repo(other),
    }
}
