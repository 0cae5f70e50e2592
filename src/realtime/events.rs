//! Change events pushed to live viewer sessions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{EventRecord, LocationRecord};
use crate::domain::types::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    RecordAdded,
    RecordUpdated,
    RecordDeleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::RecordAdded => "record_added",
            ChangeKind::RecordUpdated => "record_updated",
            ChangeKind::RecordDeleted => "record_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangedRecord {
    Event(EventRecord),
    Location(LocationRecord),
}

/// Full record for additions and updates, identifier only for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangePayload {
    Record { record: ChangedRecord },
    Deleted { record_id: Uuid },
}

/// A committed mutation, before the notifier stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: ChangeKind,
    pub collection: Collection,
    pub payload: ChangePayload,
}

impl Change {
    pub fn event_added(record: EventRecord) -> Self {
        Self::record(ChangeKind::RecordAdded, ChangedRecord::Event(record))
    }

    pub fn event_updated(record: EventRecord) -> Self {
        Self::record(ChangeKind::RecordUpdated, ChangedRecord::Event(record))
    }

    pub fn event_deleted(id: Uuid) -> Self {
        Self::deleted(Collection::Events, id)
    }

    pub fn location_added(record: LocationRecord) -> Self {
        Self::record(ChangeKind::RecordAdded, ChangedRecord::Location(record))
    }

    pub fn location_updated(record: LocationRecord) -> Self {
        Self::record(ChangeKind::RecordUpdated, ChangedRecord::Location(record))
    }

    pub fn location_deleted(id: Uuid) -> Self {
        Self::deleted(Collection::Locations, id)
    }

    fn record(kind: ChangeKind, record: ChangedRecord) -> Self {
        let collection = match record {
            ChangedRecord::Event(_) => Collection::Events,
            ChangedRecord::Location(_) => Collection::Locations,
        };
        Self {
            kind,
            collection,
            payload: ChangePayload::Record { record },
        }
    }

    fn deleted(collection: Collection, record_id: Uuid) -> Self {
        Self {
            kind: ChangeKind::RecordDeleted,
            collection,
            payload: ChangePayload::Deleted { record_id },
        }
    }
}

/// Wire form of a change, one SSE `change` frame per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub sequence: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub emitted_at: OffsetDateTime,
    pub kind: ChangeKind,
    pub collection: Collection,
    #[serde(flatten)]
    pub payload: ChangePayload,
}

impl ChangeEvent {
    pub fn stamp(change: Change, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            emitted_at: OffsetDateTime::now_utc(),
            kind: change.kind,
            collection: change.collection,
            payload: change.payload,
        }
    }

    pub fn record_id(&self) -> Uuid {
        match &self.payload {
            ChangePayload::Record {
                record: ChangedRecord::Event(record),
            } => record.id,
            ChangePayload::Record {
                record: ChangedRecord::Location(record),
            } => record.id,
            ChangePayload::Deleted { record_id } => *record_id,
        }
    }
}
