/// Key layout for the `documents` partition
///
/// - `{collection}/{id}` -> JSON object of document fields
///
/// Collection names never contain `/`, so the first separator always splits
/// collection from id, and `{collection}/` is a prefix covering exactly one
/// collection.
use super::error::{Result, StoreError};

const SEPARATOR: char = '/';

/// Reject collection names that would break prefix scans.
pub fn check_collection(collection: &str) -> Result<()> {
    if collection.is_empty() || collection.contains(SEPARATOR) {
        return Err(StoreError::InvalidKey(format!(
            "collection name '{}' must be non-empty and must not contain '{}'",
            collection, SEPARATOR
        )));
    }
    Ok(())
}

pub fn check_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidKey("document id must not be empty".into()));
    }
    Ok(())
}

/// Encode a document key: {collection}/{id}
pub fn encode_doc_key(collection: &str, id: &str) -> Vec<u8> {
    format!("{}{}{}", collection, SEPARATOR, id).into_bytes()
}

/// Encode a collection prefix for range scans: {collection}/
pub fn encode_collection_prefix(collection: &str) -> Vec<u8> {
    format!("{}{}", collection, SEPARATOR).into_bytes()
}

/// Decode a document key: {collection}/{id} -> (collection, id)
pub fn decode_doc_key(key: &[u8]) -> Option<(String, String)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (collection, id) = key_str.split_once(SEPARATOR)?;
    if collection.is_empty() || id.is_empty() {
        return None;
    }
    Some((collection.to_string(), id.to_string()))
}
