//! Resolved resource model: descriptors validated and indexed for runtime use.

use crate::config::{FieldDescriptor, FieldType};
use std::collections::HashMap;

/// Fields every record carries regardless of its descriptor.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Keys the engine owns; client-supplied values for them are discarded.
pub const SYSTEM_FIELDS: &[&str] = &[ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// One relation-typed field and the collection its ids point into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationSpec {
    pub field: String,
    pub target_collection: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub name: String,
    pub collection: String,
    pub fields: Vec<FieldDescriptor>,
    /// Relation fields in declaration order.
    pub relations: Vec<RelationSpec>,
}

impl ResolvedResource {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, field: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.field == field)
    }

    /// Field flipped by the `complete` actions: `completed`, else `done`, else the first boolean.
    pub fn completion_field(&self) -> Option<&str> {
        let is_bool = |name: &str| {
            self.field(name)
                .map(|f| f.field_type == FieldType::Boolean)
                .unwrap_or(false)
        };
        if is_bool("completed") {
            return Some("completed");
        }
        if is_bool("done") {
            return Some("done");
        }
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::Boolean)
            .map(|f| f.name.as_str())
    }

    /// Fields matched by free-text search: text-like types plus `title` whatever its type.
    pub fn search_fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.field_type.is_text_like())
            .map(|f| f.name.as_str())
            .collect();
        if !out.contains(&"title") {
            out.push("title");
        }
        out
    }

    /// Human label used in not-found messages, e.g. "Task".
    pub fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourceModel {
    pub resources: Vec<ResolvedResource>,
    /// Lowercased collection and resource name → index into `resources`.
    index: HashMap<String, usize>,
}

impl ResourceModel {
    pub fn new(resources: Vec<ResolvedResource>) -> Self {
        let mut index = HashMap::new();
        for (i, r) in resources.iter().enumerate() {
            index.insert(r.collection.to_lowercase(), i);
            index.entry(r.name.to_lowercase()).or_insert(i);
        }
        ResourceModel { resources, index }
    }

    /// Case-insensitive lookup by collection, falling back to resource name.
    pub fn resource(&self, key: &str) -> Option<&ResolvedResource> {
        self.index
            .get(&key.to_lowercase())
            .and_then(|i| self.resources.get(*i))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
