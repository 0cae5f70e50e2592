//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::error::DomainError;
use super::types::calendar_date;

pub const MAX_LABEL_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "calendar_date")]
    pub date: Date,
    pub location_id: Option<Uuid>,
    /// Joined from `locations`; the events listing therefore depends on both collections.
    pub location_name: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEventCount {
    pub location_id: Uuid,
    pub name: String,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_events: u64,
    pub upcoming_events: u64,
    pub total_locations: u64,
    pub events_per_location: Vec<LocationEventCount>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

/// Trim a user-supplied label and enforce the shared length bounds.
pub fn normalize_label(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_LABEL_CHARS {
        return Err(DomainError::validation(
            field,
            format!("must be at most {MAX_LABEL_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Collapse blank optional text to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn normalize_label_trims_and_rejects_blank() {
        assert_eq!(normalize_label("title", "  Feria ").unwrap(), "Feria");
        assert!(matches!(
            normalize_label("title", "   "),
            Err(DomainError::Validation { field: "title", .. })
        ));
    }

    #[test]
    fn normalize_label_enforces_length() {
        let long = "x".repeat(MAX_LABEL_CHARS + 1);
        assert!(normalize_label("name", &long).is_err());
        let exact = "y".repeat(MAX_LABEL_CHARS);
        assert_eq!(normalize_label("name", &exact).unwrap().len(), MAX_LABEL_CHARS);
    }

    #[test]
    fn normalize_optional_drops_blank_text() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" Plaza ".into())), Some("Plaza".into()));
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn event_record_round_trips_through_json() {
        let record = EventRecord {
            id: Uuid::nil(),
            title: "Feria".to_string(),
            date: date!(2025 - 01 - 20),
            location_id: None,
            location_name: None,
            description: None,
            created_at: datetime!(2025-01-01 10:00 UTC),
            updated_at: datetime!(2025-01-01 10:00 UTC),
        };

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["date"], "2025-01-20");
        assert_eq!(json["created_at"], "2025-01-01T10:00:00Z");

        let back: EventRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, record);
    }
}
