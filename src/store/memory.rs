//! Process-local store. Records per collection are kept in insertion order.

use super::{Record, Store, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Insert a fully-formed record (fixed id and timestamps), replacing any with the same id.
    pub fn insert_record(&self, collection: &str, record: Record) -> Result<(), StoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let records = guard.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|g| g.get(collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError> {
        let record = Record::new(uuid::Uuid::new_v4().to_string(), data);
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        guard
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let guard = self.collections.read().map_err(|_| poisoned())?;
        Ok(guard
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let guard = self.collections.read().map_err(|_| poisoned())?;
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let record = guard
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        record.apply(partial);
        Ok(record.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        if let Some(records) = guard.get_mut(collection) {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }
}
