use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateLocationParams, LocationsRepo, LocationsWriteRepo, RepoError, UpdateLocationParams,
    },
    domain::entities::LocationRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl LocationsRepo for PostgresRepositories {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, name, address, created_at, updated_at
            FROM locations
            ORDER BY LOWER(name), id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, name, address, created_at, updated_at
            FROM locations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LocationRecord::from))
    }
}

#[async_trait]
impl LocationsWriteRepo for PostgresRepositories {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            INSERT INTO locations (id, name, address)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&params.name)
        .bind(params.address.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_location(
        &self,
        params: UpdateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            UPDATE locations
            SET name = $2, address = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, name, address, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(params.address.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(LocationRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_location(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
