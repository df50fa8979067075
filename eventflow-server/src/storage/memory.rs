use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{ensure_id, shallow_merge, Collection, Result, Storage};

/// A storage implementation holding everything in process memory.
///
/// Used when no database is configured or reachable. Contents are lost on
/// restart, which is acceptable for demos and development.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<Collection, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        let documents = self
            .collections
            .get(&collection)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        Ok(documents)
    }

    async fn insert(&self, collection: Collection, mut document: Value) -> Result<Value> {
        ensure_id(&mut document);

        self.collections
            .entry(collection)
            .or_default()
            .push(document.clone());

        Ok(document)
    }

    async fn merge(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>> {
        let mut entry = self.collections.entry(collection).or_default();

        let found = entry
            .iter_mut()
            .find(|document| document.get("id").and_then(Value::as_str) == Some(id));

        let Some(document) = found else {
            return Ok(None);
        };

        shallow_merge(document, patch);

        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let mut entry = self.collections.entry(collection).or_default();

        let before = entry.len();
        entry.retain(|document| document.get("id").and_then(Value::as_str) != Some(id));

        Ok(entry.len() != before)
    }

    async fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>> {
        let found = self.collections.get(&collection).and_then(|entry| {
            entry
                .iter()
                .find(|document| {
                    document
                        .get(field)
                        .and_then(Value::as_str)
                        .map(|v| v.eq_ignore_ascii_case(value))
                        .unwrap_or(false)
                })
                .cloned()
        });

        Ok(found)
    }
}
