/// Resource <-> document field mapping
///
/// Stored shape of a resource document:
///
/// - `id`: string, duplicated from the document key
/// - `title`: string
/// - `url`: string
/// - `tags`: array of strings
/// - `createdAt`: server timestamp (microseconds since the epoch)
use serde_json::Value;
use thiserror::Error;

use crate::docstore::{DocumentSnapshot, FieldValue, Fields, WriteMode};
use crate::domain::{Resource, ResourceError};

pub const FIELD_ID: &str = "id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_URL: &str = "url";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_CREATED_AT: &str = "createdAt";

/// Why a stored document could not be read as a resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedDocument {
    #[error("missing or non-string field '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Invalid(#[from] ResourceError),
}

/// Fields written for `resource`.
///
/// A merge keeps an existing `createdAt`; a replace stamps a fresh one.
pub fn to_fields(resource: &Resource, mode: WriteMode) -> Fields {
    let created_at = match mode {
        WriteMode::Merge => FieldValue::ServerTimestampIfAbsent,
        WriteMode::Replace => FieldValue::ServerTimestamp,
    };
    let tags: Vec<Value> = resource.tags().iter().cloned().map(Value::String).collect();

    Fields::from([
        (FIELD_ID.to_string(), FieldValue::value(resource.id())),
        (FIELD_TITLE.to_string(), FieldValue::value(resource.title())),
        (FIELD_URL.to_string(), FieldValue::value(resource.url())),
        (FIELD_TAGS.to_string(), FieldValue::value(tags)),
        (FIELD_CREATED_AT.to_string(), created_at),
    ])
}

/// Read a resource back, tolerating a missing or partly bogus tag list.
pub fn from_snapshot(doc: &DocumentSnapshot) -> Result<Resource, MalformedDocument> {
    let id = doc
        .get_str(FIELD_ID)
        .ok_or(MalformedDocument::MissingField(FIELD_ID))?;
    let title = doc
        .get_str(FIELD_TITLE)
        .ok_or(MalformedDocument::MissingField(FIELD_TITLE))?;
    let url = doc
        .get_str(FIELD_URL)
        .ok_or(MalformedDocument::MissingField(FIELD_URL))?;
    let tags = doc
        .get(FIELD_TAGS)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    Ok(Resource::new(id, title, url, tags)?)
}
