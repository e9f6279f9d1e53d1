//! Load descriptors from JSON and resolve them into a runtime model; engine settings from env.

use crate::config::resolved::{RelationSpec, ResolvedResource, ResourceModel};
use crate::config::types::*;
use crate::config::{descriptor_collection, validate_descriptors};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Build resolved model from descriptors (validates first).
pub fn resolve(descriptors: &[ResourceDescriptor]) -> Result<ResourceModel, ConfigError> {
    validate_descriptors(descriptors)?;

    let collection_by_key: HashMap<String, String> = descriptors
        .iter()
        .flat_map(|d| {
            let collection = descriptor_collection(d);
            [
                (d.name.to_lowercase(), collection.clone()),
                (collection.to_lowercase(), collection),
            ]
        })
        .collect();

    let mut resources = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        let mut relations = Vec::new();
        for f in d.fields.iter().filter(|f| f.field_type == FieldType::Relation) {
            let target = f.target.as_deref().unwrap_or_default();
            let target_collection = collection_by_key
                .get(&target.to_lowercase())
                .cloned()
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "relation target",
                    id: target.to_string(),
                })?;
            relations.push(RelationSpec {
                field: f.name.clone(),
                target_collection,
            });
        }
        resources.push(ResolvedResource {
            name: d.name.clone(),
            collection: descriptor_collection(d),
            fields: d.fields.clone(),
            relations,
        });
    }
    Ok(ResourceModel::new(resources))
}

/// Parse a JSON array of descriptors.
pub fn load_descriptors_from_str(json: &str) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

pub async fn load_descriptors_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading resource descriptors");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_descriptors_from_str(&raw)
}

impl EngineConfig {
    /// Defaults overridden by `RESOURCE_API_*` env vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();
        if let Some(prefix) = lookup("RESOURCE_API_PREFIX") {
            config.prefix = normalize_prefix(&prefix);
        }
        if let Some(v) = parse_var(&lookup, "RESOURCE_API_DEFAULT_PAGE_SIZE")? {
            config.default_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "RESOURCE_API_MAX_PAGE_SIZE")? {
            config.max_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "RESOURCE_API_BULK_LIMIT")? {
            config.bulk_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "RESOURCE_API_BODY_LIMIT")? {
            config.body_limit_bytes = v;
        }
        if config.default_page_size == 0 || config.max_page_size == 0 {
            return Err(ConfigError::Validation("page sizes must be positive".into()));
        }
        config.default_page_size = config.default_page_size.min(config.max_page_size);
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Load(format!("{} must be a number, got '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTORS: &str = r#"[
        { "name": "User", "fields": [ { "name": "email", "type": "email", "required": true, "unique": true } ] },
        { "name": "Task", "fields": [
            { "name": "title", "type": "string", "required": true },
            { "name": "assignee", "type": "relation", "target": "users" }
        ] }
    ]"#;

    #[test]
    fn resolves_collections_and_relations() {
        let descriptors = load_descriptors_from_str(DESCRIPTORS).unwrap();
        let model = resolve(&descriptors).unwrap();
        let task = model.resource("tasks").unwrap();
        assert_eq!(task.collection, "tasks");
        assert_eq!(
            task.relations,
            vec![RelationSpec {
                field: "assignee".into(),
                target_collection: "users".into()
            }]
        );
        assert!(model.resource("TASKS").is_some());
        assert!(model.resource("Task").is_some());
        assert!(model.resource("projects").is_none());
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RESOURCE_API_PREFIX", "api"),
            ("RESOURCE_API_MAX_PAGE_SIZE", "50"),
            ("RESOURCE_API_DEFAULT_PAGE_SIZE", "100"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.prefix, "/api");
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.bulk_limit, 1000);
    }

    #[test]
    fn env_rejects_garbage() {
        let result = EngineConfig::from_lookup(|k| {
            (k == "RESOURCE_API_BULK_LIMIT").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
