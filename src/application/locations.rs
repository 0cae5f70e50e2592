use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::mutation::MutationPipeline;
use crate::application::repos::{
    CreateLocationParams, LocationsRepo, LocationsWriteRepo, RepoError, UpdateLocationParams,
};
use crate::cache::{CacheAside, CacheKey};
use crate::domain::entities::{LocationRecord, normalize_label, normalize_optional};
use crate::domain::error::DomainError;
use crate::domain::types::Collection;
use crate::realtime::Change;

#[derive(Debug, Error)]
pub enum LocationServiceError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("location not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateLocationCommand {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLocationCommand {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
}

#[derive(Clone)]
pub struct LocationService {
    reader: Arc<dyn LocationsRepo>,
    writer: Arc<dyn LocationsWriteRepo>,
    cache: CacheAside,
    pipeline: Arc<MutationPipeline>,
}

impl LocationService {
    pub fn new(
        reader: Arc<dyn LocationsRepo>,
        writer: Arc<dyn LocationsWriteRepo>,
        cache: CacheAside,
        pipeline: Arc<MutationPipeline>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            pipeline,
        }
    }

    pub async fn list(&self) -> Result<Vec<LocationRecord>, LocationServiceError> {
        let reader = Arc::clone(&self.reader);
        self.cache
            .read(CacheKey::LocationsAll, || async move {
                reader.list_locations().await
            })
            .await
            .map_err(LocationServiceError::from)
    }

    pub async fn create(
        &self,
        command: CreateLocationCommand,
    ) -> Result<LocationRecord, LocationServiceError> {
        let params = CreateLocationParams {
            name: normalize_label("name", &command.name)?,
            address: normalize_optional(command.address),
        };

        let record = self
            .pipeline
            .apply(
                Collection::Locations,
                self.writer.create_location(params),
                |record| Change::location_added(record.clone()),
            )
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        command: UpdateLocationCommand,
    ) -> Result<LocationRecord, LocationServiceError> {
        let current = self
            .reader
            .find_location(id)
            .await?
            .ok_or(LocationServiceError::NotFound)?;

        let name = match command.name {
            Some(name) => normalize_label("name", &name)?,
            None => current.name,
        };
        let address = match command.address {
            Some(address) => normalize_optional(address),
            None => current.address,
        };

        self.pipeline
            .apply(
                Collection::Locations,
                self.writer
                    .update_location(UpdateLocationParams { id, name, address }),
                |record| Change::location_updated(record.clone()),
            )
            .await
            .map_err(not_found_as_missing)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), LocationServiceError> {
        self.pipeline
            .apply(
                Collection::Locations,
                self.writer.delete_location(id),
                |_| Change::location_deleted(id),
            )
            .await
            .map_err(not_found_as_missing)
    }
}

fn not_found_as_missing(err: RepoError) -> LocationServiceError {
    match err {
        RepoError::NotFound => LocationServiceError::NotFound,
        other => LocationServiceError::Repo(other),
    }
}
