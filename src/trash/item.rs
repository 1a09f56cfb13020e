use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::model::{EntityRecord, Section};

/// What a trash item holds.
#[derive(Debug, Clone, PartialEq)]
pub enum TrashPayload {
    Known(EntityRecord),
    /// A known section whose data does not decode as that section's entity.
    /// Kept verbatim and never restored.
    Unreadable { section: Section, data: Value },
    /// A section tag this build does not know. Kept verbatim so it survives
    /// a round trip.
    Unrecognized { section: String, data: Value },
}

/// One deleted entity and where it came from.
///
/// Stored as `{ "id", "deletedAt", "originalSection", "data" }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTrashItem")]
pub struct TrashItem {
    pub id: String,
    pub deleted_at: i64,
    pub payload: TrashPayload,
}

impl TrashItem {
    pub fn section_tag(&self) -> &str {
        match &self.payload {
            TrashPayload::Known(record) => record.section().tag(),
            TrashPayload::Unreadable { section, .. } => section.tag(),
            TrashPayload::Unrecognized { section, .. } => section,
        }
    }

    pub fn section(&self) -> Option<Section> {
        match &self.payload {
            TrashPayload::Known(record) => Some(record.section()),
            TrashPayload::Unreadable { section, .. } => Some(*section),
            TrashPayload::Unrecognized { .. } => None,
        }
    }

    pub fn original_id(&self) -> Option<&str> {
        match &self.payload {
            TrashPayload::Known(record) => Some(record.id()),
            TrashPayload::Unreadable { data, .. } | TrashPayload::Unrecognized { data, .. } => {
                data.get("id").and_then(Value::as_str)
            }
        }
    }

    pub fn display_name(&self) -> &str {
        match &self.payload {
            TrashPayload::Known(record) => record.display_name(),
            TrashPayload::Unreadable { .. } | TrashPayload::Unrecognized { .. } => {
                self.original_id().unwrap_or(&self.id)
            }
        }
    }

    /// Whether the original section is one this build knows.
    pub fn is_recognized(&self) -> bool {
        !matches!(self.payload, TrashPayload::Unrecognized { .. })
    }

    /// Whether the data decoded into a typed record.
    pub fn is_readable(&self) -> bool {
        matches!(self.payload, TrashPayload::Known(_))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrashItem {
    id: String,
    #[serde(default)]
    deleted_at: i64,
    #[serde(default)]
    original_section: String,
    #[serde(default)]
    data: Value,
}

impl From<RawTrashItem> for TrashItem {
    fn from(raw: RawTrashItem) -> Self {
        let payload = match Section::from_str(&raw.original_section) {
            Ok(section) => match EntityRecord::from_value(section, raw.data.clone()) {
                Ok(record) => TrashPayload::Known(record),
                Err(err) => {
                    tracing::warn!(
                        trash_id = %raw.id,
                        section = %section,
                        error = %err,
                        "trashed data does not match its section"
                    );
                    TrashPayload::Unreadable {
                        section,
                        data: raw.data,
                    }
                }
            },
            Err(_) => TrashPayload::Unrecognized {
                section: raw.original_section,
                data: raw.data,
            },
        };
        TrashItem {
            id: raw.id,
            deleted_at: raw.deleted_at,
            payload,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrashItemRef<'a, D> {
    id: &'a str,
    deleted_at: i64,
    original_section: &'a str,
    data: &'a D,
}

impl Serialize for TrashItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.payload {
            TrashPayload::Known(record) => TrashItemRef {
                id: &self.id,
                deleted_at: self.deleted_at,
                original_section: record.section().tag(),
                data: record,
            }
            .serialize(serializer),
            TrashPayload::Unreadable { section, data } => TrashItemRef {
                id: &self.id,
                deleted_at: self.deleted_at,
                original_section: section.tag(),
                data,
            }
            .serialize(serializer),
            TrashPayload::Unrecognized { section, data } => TrashItemRef {
                id: &self.id,
                deleted_at: self.deleted_at,
                original_section: section,
                data,
            }
            .serialize(serializer),
        }
    }
}
