use serde_json::{Map, Value};

use super::value::{FieldValue, Fields};

/// A stored document as read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl DocumentSnapshot {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// How a set operation treats fields it does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Keep unmentioned fields of an existing document.
    #[default]
    Merge,
    /// Drop the existing document and write only the given fields.
    Replace,
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        id: String,
        fields: Fields,
        mode: WriteMode,
    },
    Delete {
        id: String,
    },
}

impl WriteOp {
    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Delete { id } => id,
        }
    }
}

/// Compute the stored field map after a set.
///
/// `now_micros` resolves server timestamps; every timestamp in one commit
/// shares the same value.
pub fn apply_set(
    existing: Option<Map<String, Value>>,
    fields: &Fields,
    mode: WriteMode,
    now_micros: i64,
) -> Map<String, Value> {
    let mut doc = match mode {
        WriteMode::Merge => existing.unwrap_or_default(),
        WriteMode::Replace => Map::new(),
    };

    for (name, value) in fields {
        match value {
            FieldValue::Value(v) => {
                doc.insert(name.clone(), v.clone());
            }
            FieldValue::ServerTimestamp => {
                doc.insert(name.clone(), Value::from(now_micros));
            }
            FieldValue::ServerTimestampIfAbsent => {
                doc.entry(name.clone()).or_insert_with(|| Value::from(now_micros));
            }
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn existing() -> Map<String, Value> {
        json!({"title": "old", "createdAt": 100, "note": "keep me"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn write() -> Fields {
        Fields::from([
            ("title".to_string(), FieldValue::value("new")),
            ("createdAt".to_string(), FieldValue::ServerTimestampIfAbsent),
            ("updatedAt".to_string(), FieldValue::ServerTimestamp),
        ])
    }

    #[test]
    fn test_merge_preserves_unmentioned_and_existing_timestamp() {
        let doc = apply_set(Some(existing()), &write(), WriteMode::Merge, 500);

        assert_eq!(doc["title"], json!("new"));
        assert_eq!(doc["note"], json!("keep me"));
        assert_eq!(doc["createdAt"], json!(100));
        assert_eq!(doc["updatedAt"], json!(500));
    }

    #[test]
    fn test_replace_drops_everything_else() {
        let doc = apply_set(Some(existing()), &write(), WriteMode::Replace, 500);

        assert_eq!(doc["title"], json!("new"));
        assert!(doc.get("note").is_none());
        assert_eq!(doc["createdAt"], json!(500));
    }

    #[test]
    fn test_merge_into_missing_document() {
        let doc = apply_set(None, &write(), WriteMode::Merge, 7);
        assert_eq!(doc["createdAt"], json!(7));
        assert_eq!(doc.len(), 3);
    }
}
