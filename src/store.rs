//! Record store contract. The engine never talks to storage except through [`Store`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{store_table, PgStore};

use crate::config::{CREATED_AT_FIELD, ID_FIELD, SYSTEM_FIELDS, UPDATED_AT_FIELD};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("store backend: {0}")]
    Backend(String),
    #[error("store serialization: {0}")]
    Serialization(String),
}

/// One stored entity: engine-owned identity and timestamps plus open fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Everything except `id`, `createdAt`, `updatedAt`.
    pub fields: Map<String, Value>,
}

impl Record {
    /// New record with `updatedAt == createdAt`. System keys in `data` are dropped.
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        let now = now();
        Record {
            id: id.into(),
            created_at: now,
            updated_at: Some(now),
            fields: strip_system_fields(data),
        }
    }

    /// Merge `partial` into the fields and refresh `updatedAt`. Identity never changes.
    pub fn apply(&mut self, partial: Map<String, Value>) {
        for (k, v) in strip_system_fields(partial) {
            self.fields.insert(k, v);
        }
        self.updated_at = Some(now());
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            ID_FIELD => Some(Value::String(self.id.clone())),
            CREATED_AT_FIELD => Some(Value::String(format_timestamp(&self.created_at))),
            UPDATED_AT_FIELD => self
                .updated_at
                .as_ref()
                .map(|t| Value::String(format_timestamp(t))),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// JSON object with `id`, `createdAt`, `updatedAt` first, then fields in stored order.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 3);
        map.insert(ID_FIELD.into(), Value::String(self.id.clone()));
        map.insert(
            CREATED_AT_FIELD.into(),
            Value::String(format_timestamp(&self.created_at)),
        );
        if let Some(updated) = &self.updated_at {
            map.insert(UPDATED_AT_FIELD.into(), Value::String(format_timestamp(updated)));
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        let Value::Object(mut map) = value else {
            return Err(StoreError::Serialization("record must be a JSON object".into()));
        };
        let id = match map.shift_remove(ID_FIELD) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(StoreError::Serialization("record is missing 'id'".into())),
        };
        let created_at = map
            .shift_remove(CREATED_AT_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .ok_or_else(|| StoreError::Serialization(format!("record '{}' has no valid createdAt", id)))?;
        let updated_at = map
            .shift_remove(UPDATED_AT_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        Ok(Record {
            id,
            created_at,
            updated_at,
            fields: map,
        })
    }
}

/// Current time at millisecond precision so timestamps survive a JSON round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub fn strip_system_fields(mut data: Map<String, Value>) -> Map<String, Value> {
    for key in SYSTEM_FIELDS {
        data.shift_remove(*key);
    }
    data
}

/// Storage backend. `update` fails with [`StoreError::NotFound`] when the record is absent;
/// `delete` of an absent record is a no-op. Implementations assign ids and timestamps.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// All records of a collection in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<Record, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
