use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, StorageError>;
pub type BoxedStorage = Arc<dyn Storage>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// An unknown or internal error happened with the backing store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        Self::Internal(Box::new(value))
    }
}

/// The five document collections served over the REST surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Users,
    Registrations,
    Teams,
    Notifications,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Events,
        Collection::Users,
        Collection::Registrations,
        Collection::Teams,
        Collection::Notifications,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Users => "users",
            Collection::Registrations => "registrations",
            Collection::Teams => "teams",
            Collection::Notifications => "notifications",
        }
    }
}

/// Represents a type that can store and retrieve schemaless documents.
///
/// Documents are JSON objects carrying their identifier in an `id` field;
/// the store assigns one on insert when the caller did not.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All documents of a collection, in insertion order
    async fn list(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Stores a document, returning it with its assigned identifier
    async fn insert(&self, collection: Collection, document: Value) -> Result<Value>;

    /// Shallow-merges the patch into the document with the given id.
    /// Returns the merged document, or None if no document matches.
    async fn merge(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>>;

    /// Removes a document, reporting whether one matched
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// The first document whose string field equals the value,
    /// compared case-insensitively
    async fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>>;
}

/// Generates a fresh 24-character hex identifier
pub fn new_object_id() -> String {
    let mut rng = rand::thread_rng();

    (0..24)
        .map(|_| {
            let nibble: u8 = rng.gen_range(0..16);
            char::from_digit(nibble as u32, 16).unwrap_or('0')
        })
        .collect()
}

/// Overwrites the top-level fields of `document` with those of `patch`.
/// Nested objects are replaced whole, not merged.
pub fn shallow_merge(document: &mut Value, patch: Value) {
    let (Some(target), Some(source)) = (document.as_object_mut(), patch.as_object()) else {
        return;
    };

    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Ensures the document carries an id, assigning one if absent or empty.
/// Returns the id it ends up with.
pub fn ensure_id(document: &mut Value) -> String {
    let existing = document
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    match existing {
        Some(id) => id,
        None => {
            let id = new_object_id();

            if let Some(object) = document.as_object_mut() {
                object.insert("id".to_string(), Value::String(id.clone()));
            }

            id
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_shape() {
        let id = new_object_id();

        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_object_id());
    }

    #[test]
    fn test_shallow_merge_replaces_top_level_fields() {
        let mut document = json!({
            "id": "E1",
            "title": "Tech Summit",
            "schedule": [{ "time": "09:00" }]
        });

        shallow_merge(&mut document, json!({ "title": "Renamed", "registered": 3 }));

        assert_eq!(document["title"], "Renamed");
        assert_eq!(document["registered"], 3);
        assert_eq!(document["id"], "E1");
    }

    #[test]
    fn test_ensure_id() {
        let mut fresh = json!({ "title": "Tech Summit" });
        let id = ensure_id(&mut fresh);
        assert_eq!(fresh["id"], Value::String(id.clone()));
        assert_eq!(id.len(), 24);

        let mut existing = json!({ "id": "E1" });
        assert_eq!(ensure_id(&mut existing), "E1");

        let mut empty = json!({ "id": "" });
        assert_ne!(ensure_id(&mut empty), "");
    }
}
