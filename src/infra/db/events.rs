use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateEventParams, EventsRepo, EventsWriteRepo, RepoError, UpdateEventParams,
    },
    domain::entities::EventRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const SELECT_EVENTS: &str = r#"
    SELECT e.id, e.title, e.event_date, e.location_id, l.name AS location_name,
           e.description, e.created_at, e.updated_at
    FROM events e
    LEFT JOIN locations l ON l.id = e.location_id
"#;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    event_date: Date,
    location_id: Option<Uuid>,
    location_name: Option<String>,
    description: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            date: row.event_date,
            location_id: row.location_id,
            location_name: row.location_name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn event_by_id(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError> {
        let sql = format!("{SELECT_EVENTS} WHERE e.id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EventRecord::from))
    }
}

#[async_trait]
impl EventsRepo for PostgresRepositories {
    async fn list_events(&self) -> Result<Vec<EventRecord>, RepoError> {
        let sql = format!("{SELECT_EVENTS} ORDER BY e.event_date, e.title, e.id");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError> {
        self.event_by_id(id).await
    }
}

/// Joined projection over the rows a data-modifying CTE named `written`
/// returns, so the write and its read-back are one statement.
const SELECT_WRITTEN: &str = r#"
    SELECT w.id, w.title, w.event_date, w.location_id, l.name AS location_name,
           w.description, w.created_at, w.updated_at
    FROM written w
    LEFT JOIN locations l ON l.id = w.location_id
"#;

const RETURNING_EVENT: &str =
    "RETURNING id, title, event_date, location_id, description, created_at, updated_at";

#[async_trait]
impl EventsWriteRepo for PostgresRepositories {
    async fn create_event(&self, params: CreateEventParams) -> Result<EventRecord, RepoError> {
        let sql = format!(
            r#"
            WITH written AS (
                INSERT INTO events (id, title, event_date, location_id, description)
                VALUES ($1, $2, $3, $4, $5)
                {RETURNING_EVENT}
            )
            {SELECT_WRITTEN}
            "#
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.title)
            .bind(params.date)
            .bind(params.location_id)
            .bind(params.description.as_deref())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_event(&self, params: UpdateEventParams) -> Result<EventRecord, RepoError> {
        let sql = format!(
            r#"
            WITH written AS (
                UPDATE events
                SET title = $2, event_date = $3, location_id = $4, description = $5,
                    updated_at = now()
                WHERE id = $1
                {RETURNING_EVENT}
            )
            {SELECT_WRITTEN}
            "#
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(params.id)
            .bind(&params.title)
            .bind(params.date)
            .bind(params.location_id)
            .bind(params.description.as_deref())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(EventRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
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
