//! Descriptor validation: naming, referential integrity and route consistency.

use crate::case::collection_name;
use crate::config::{FieldType, ResourceDescriptor, SYSTEM_FIELDS};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Path segments claimed by fixed routes under `/:collection/:id/`.
pub const RESERVED_SEGMENTS: &[&str] = &["bulk", "complete-all", "complete", "change-priority", "tags"];

/// Collection for a descriptor: explicit value, else derived from the name.
pub fn descriptor_collection(descriptor: &ResourceDescriptor) -> String {
    descriptor
        .collection
        .as_deref()
        .map(|c| c.trim_matches('/').to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| collection_name(&descriptor.name))
}

pub fn validate_descriptors(descriptors: &[ResourceDescriptor]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut collections = HashSet::new();
    for d in descriptors {
        if d.name.trim().is_empty() {
            return Err(ConfigError::Validation("resource name must not be empty".into()));
        }
        if !names.insert(d.name.to_lowercase()) {
            return Err(ConfigError::Duplicate {
                kind: "resource",
                name: d.name.clone(),
            });
        }
        let collection = descriptor_collection(d);
        if collection.contains('/') {
            return Err(ConfigError::Validation(format!(
                "collection '{}' must be a single path segment",
                collection
            )));
        }
        if !collections.insert(collection.to_lowercase()) {
            return Err(ConfigError::Duplicate {
                kind: "collection",
                name: collection,
            });
        }
    }

    // Relation targets may name either a resource or a collection.
    let known: HashSet<String> = names.union(&collections).cloned().collect();

    for d in descriptors {
        let mut field_names = HashSet::new();
        for f in &d.fields {
            let invalid = |reason: &str| ConfigError::InvalidField {
                resource: d.name.clone(),
                field: f.name.clone(),
                reason: reason.to_string(),
            };
            if f.name.trim().is_empty() {
                return Err(invalid("field name must not be empty"));
            }
            if !field_names.insert(f.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "field",
                    name: format!("{}.{}", d.name, f.name),
                });
            }
            if SYSTEM_FIELDS.contains(&f.name.as_str()) && !f.auto {
                return Err(invalid("system fields must be declared auto"));
            }
            match f.field_type {
                FieldType::Enum if f.values.is_empty() => {
                    return Err(invalid("enum fields need at least one value"));
                }
                FieldType::Relation => {
                    let target = f
                        .target
                        .as_deref()
                        .ok_or_else(|| invalid("relation fields need a target"))?;
                    if !known.contains(&target.to_lowercase()) {
                        return Err(ConfigError::MissingReference {
                            kind: "relation target",
                            id: target.to_string(),
                        });
                    }
                    if RESERVED_SEGMENTS.contains(&f.name.as_str()) {
                        return Err(invalid("name collides with a fixed route segment"));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDescriptor;

    fn task() -> ResourceDescriptor {
        ResourceDescriptor::new("Task").field(FieldDescriptor::new("title", FieldType::Text).required())
    }

    #[test]
    fn accepts_well_formed_descriptors() {
        let user = ResourceDescriptor::new("User");
        let task = task().field(FieldDescriptor::relation("assignee", "User"));
        assert!(validate_descriptors(&[user, task]).is_ok());
    }

    #[test]
    fn rejects_duplicate_collections() {
        let a = task();
        let b = ResourceDescriptor::new("Job").with_collection("tasks");
        assert!(matches!(
            validate_descriptors(&[a, b]),
            Err(ConfigError::Duplicate { kind: "collection", .. })
        ));
    }

    #[test]
    fn rejects_unknown_relation_target() {
        let t = task().field(FieldDescriptor::relation("owner", "Ghost"));
        assert!(matches!(
            validate_descriptors(&[t]),
            Err(ConfigError::MissingReference { .. })
        ));
    }

    #[test]
    fn rejects_relation_named_like_fixed_route() {
        let tag = ResourceDescriptor::new("Tag");
        let t = task().field(FieldDescriptor::relation("tags", "Tag"));
        assert!(matches!(
            validate_descriptors(&[tag, t]),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn rejects_enum_without_values() {
        let t = task().field(FieldDescriptor::new("priority", FieldType::Enum));
        assert!(validate_descriptors(&[t]).is_err());
    }
}
