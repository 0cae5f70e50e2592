use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::repos::{AnalyticsRepo, RepoError},
    domain::entities::{AnalyticsSummary, LocationEventCount},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_events: i64,
    upcoming_events: i64,
    total_locations: i64,
}

#[derive(sqlx::FromRow)]
struct LocationCountRow {
    location_id: Uuid,
    name: String,
    event_count: i64,
}

#[async_trait]
impl AnalyticsRepo for PostgresRepositories {
    async fn load_summary(&self, today: Date) -> Result<AnalyticsSummary, RepoError> {
        let totals = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM events) AS total_events,
                (SELECT COUNT(*) FROM events WHERE event_date >= $1) AS upcoming_events,
                (SELECT COUNT(*) FROM locations) AS total_locations
            "#,
        )
        .bind(today)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let rows = sqlx::query_as::<_, LocationCountRow>(
            r#"
            SELECT l.id AS location_id, l.name, COUNT(e.id) AS event_count
            FROM locations l
            LEFT JOIN events e ON e.location_id = l.id
            GROUP BY l.id, l.name
            ORDER BY event_count DESC, LOWER(l.name), l.id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let events_per_location = rows
            .into_iter()
            .map(|row| {
                Ok(LocationEventCount {
                    location_id: row.location_id,
                    name: row.name,
                    event_count: Self::convert_count(row.event_count)?,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(AnalyticsSummary {
            total_events: Self::convert_count(totals.total_events)?,
            upcoming_events: Self::convert_count(totals.upcoming_events)?,
            total_locations: Self::convert_count(totals.total_locations)?,
            events_per_location,
            generated_at: OffsetDateTime::now_utc(),
        })
    }
}
