//! Deletion audit record and cascade payload.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Record, RecordKey, UNKNOWN_KEY};

/// Payload key holding the captured cascade children.
pub const CASCADE_KEY: &str = "_cascadeDeleted";

/// Child entity type → rows that the store removes by cascade.
pub type CascadeMap = BTreeMap<String, Vec<Record>>;

/// Render a cascade map as the JSON object stored under [`CASCADE_KEY`].
#[must_use]
pub fn cascade_value(cascade: &CascadeMap) -> Value {
    Value::Object(
        cascade
            .iter()
            .map(|(entity, rows)| {
                let rows = rows.iter().cloned().map(Value::Object).collect();
                (entity.clone(), Value::Array(rows))
            })
            .collect(),
    )
}

/// How far cascade capture follows the relationship catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureDepth {
    /// Direct children only.
    #[default]
    Direct,
    /// Children, grandchildren, and so on. Each captured child carries its
    /// own nested `_cascadeDeleted` map. Entity types already on the current
    /// path are not revisited.
    Transitive,
}

impl CaptureDepth {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Transitive => "transitive",
        }
    }
}

impl fmt::Display for CaptureDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one deleted row, its cascaded children, and who
/// deleted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionAuditRecord {
    /// Row id, set once persisted.
    pub id: Option<i64>,
    pub entity_type: String,
    /// Display form of the primary key, or [`UNKNOWN_KEY`].
    pub primary_key: String,
    /// Full before-image of the deleted row.
    pub record: Record,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cascade_deleted: CascadeMap,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DeletionAuditRecord {
    /// A fresh, unpersisted record stamped with the current time.
    #[must_use]
    pub fn new(
        entity_type: impl Into<String>,
        key: Option<&RecordKey>,
        record: Record,
        cascade_deleted: CascadeMap,
        actor_id: Option<String>,
    ) -> Self {
        Self {
            id: None,
            entity_type: entity_type.into(),
            primary_key: key.map_or_else(|| UNKNOWN_KEY.to_string(), ToString::to_string),
            record,
            cascade_deleted,
            actor_id,
            created_at: Utc::now(),
        }
    }

    /// Stored payload: the record's fields, plus [`CASCADE_KEY`] when any
    /// cascade children were captured.
    #[must_use]
    pub fn payload(&self) -> Value {
        let mut data = self.record.clone();
        if !self.cascade_deleted.is_empty() {
            data.insert(CASCADE_KEY.to_string(), cascade_value(&self.cascade_deleted));
        }
        Value::Object(data)
    }

    /// Split a stored payload back into record fields and cascade map.
    ///
    /// Non-object payloads become an empty record; malformed cascade entries
    /// are dropped.
    #[must_use]
    pub fn split_payload(payload: Value) -> (Record, CascadeMap) {
        let Value::Object(mut record) = payload else {
            return (Record::new(), CascadeMap::new());
        };
        let mut cascade = CascadeMap::new();
        if let Some(Value::Object(children)) = record.remove(CASCADE_KEY) {
            for (entity, rows) in children {
                let Value::Array(rows) = rows else { continue };
                let rows = rows
                    .into_iter()
                    .filter_map(|row| match row {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                cascade.insert(entity, rows);
            }
        }
        (record, cascade)
    }

    /// `OrderLine(2), Note(1)`; `None` when nothing cascaded.
    #[must_use]
    pub fn cascade_summary(&self) -> Option<String> {
        if self.cascade_deleted.is_empty() {
            return None;
        }
        Some(
            self.cascade_deleted
                .iter()
                .map(|(entity, rows)| format!("{entity}({})", rows.len()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}
