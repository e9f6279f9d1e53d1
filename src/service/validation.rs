//! Request validation against resource descriptors. Every failing field is reported;
//! nothing fails fast.

use crate::config::{FieldDescriptor, FieldType, ResolvedResource, SYSTEM_FIELDS};
use crate::error::{AppError, FieldError};
use crate::query::filter::parse_date_millis;
use crate::query::pipeline::id_of;
use crate::store::{Store, StoreError};
use axum::http::Uri;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Create enforces every required field; update only checks keys present in the body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Type check for one non-null value. Returns the failure message, if any.
pub fn check_type(field: &FieldDescriptor, value: &Value) -> Option<String> {
    let name = &field.name;
    let ok = match field.field_type {
        FieldType::Text => value.is_string(),
        FieldType::Number => value.as_f64().map(f64::is_finite).unwrap_or(false),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Date | FieldType::Datetime => {
            value.as_str().and_then(parse_date_millis).is_some()
        }
        FieldType::Email => value
            .as_str()
            .zip(email_pattern())
            .map(|(s, re)| re.is_match(s))
            .unwrap_or(false),
        FieldType::Url => value
            .as_str()
            .and_then(|s| s.parse::<Uri>().ok())
            .map(|u| u.scheme().is_some() && u.authority().is_some())
            .unwrap_or(false),
        FieldType::Enum => value
            .as_str()
            .map(|s| field.values.iter().any(|allowed| allowed == s))
            .unwrap_or(false),
        // Existence is checked against the store separately.
        FieldType::Relation => id_of(value).is_some(),
    };
    if ok {
        return None;
    }
    Some(match field.field_type {
        FieldType::Text => format!("{} must be a string", name),
        FieldType::Number => format!("{} must be a finite number", name),
        FieldType::Boolean => format!("{} must be a boolean", name),
        FieldType::Date | FieldType::Datetime => format!("{} must be a valid date", name),
        FieldType::Email => format!("{} must be a valid email address", name),
        FieldType::Url => format!("{} must be a valid absolute URL", name),
        FieldType::Enum => format!("{} must be one of: {}", name, field.values.join(", ")),
        FieldType::Relation => format!("{} must be a record id", name),
    })
}

pub struct RequestValidator;

impl RequestValidator {
    /// Required-field policy and type checks (no store access).
    pub fn check_fields(
        body: &Map<String, Value>,
        resource: &ResolvedResource,
        mode: ValidationMode,
    ) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for field in &resource.fields {
            if field.auto || SYSTEM_FIELDS.contains(&field.name.as_str()) {
                continue;
            }
            let value = body.get(&field.name);
            let required_checked = match mode {
                ValidationMode::Create => field.required,
                ValidationMode::Update => field.required && value.is_some(),
            };
            if required_checked && is_blank(value) {
                errors.push(FieldError::new(&field.name, format!("{} is required", field.name)));
                continue;
            }
            if let Some(v) = value.filter(|v| !v.is_null()) {
                if let Some(message) = check_type(field, v) {
                    errors.push(FieldError::new(&field.name, message));
                }
            }
        }
        errors
    }

    /// Relation fields present in the body must point at existing records.
    pub async fn check_relations(
        body: &Map<String, Value>,
        resource: &ResolvedResource,
        store: &dyn Store,
    ) -> Result<Vec<FieldError>, StoreError> {
        let mut errors = Vec::new();
        for rel in &resource.relations {
            let Some(id) = body.get(&rel.field).and_then(id_of) else {
                continue;
            };
            if store.get(&rel.target_collection, &id).await?.is_none() {
                errors.push(FieldError::new(
                    &rel.field,
                    format!(
                        "{} references a missing {} record '{}'",
                        rel.field, rel.target_collection, id
                    ),
                ));
            }
        }
        Ok(errors)
    }

    /// Unique fields present in the body must not collide with any other stored record.
    pub async fn check_unique(
        body: &Map<String, Value>,
        resource: &ResolvedResource,
        store: &dyn Store,
        exclude_id: Option<&str>,
    ) -> Result<Vec<FieldError>, StoreError> {
        let unique: Vec<(&str, &Value)> = resource
            .fields
            .iter()
            .filter(|f| f.unique)
            .filter_map(|f| {
                body.get(&f.name)
                    .filter(|v| !v.is_null())
                    .map(|v| (f.name.as_str(), v))
            })
            .collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }
        let existing = store.list(&resource.collection).await?;
        let mut errors = Vec::new();
        for (name, value) in unique {
            let taken = existing
                .iter()
                .filter(|r| Some(r.id.as_str()) != exclude_id)
                .any(|r| r.fields.get(name) == Some(value));
            if taken {
                errors.push(FieldError::new(
                    name,
                    format!("{} must be unique; {} is already taken", name, value),
                ));
            }
        }
        Ok(errors)
    }

    /// Field and relation errors answer `Validation`; collisions answer `Conflict`.
    pub async fn validate(
        body: &Map<String, Value>,
        resource: &ResolvedResource,
        store: &dyn Store,
        mode: ValidationMode,
        exclude_id: Option<&str>,
    ) -> Result<(), AppError> {
        let mut errors = Self::check_fields(body, resource, mode);
        let invalid: Vec<&str> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
        let relation_body: Map<String, Value> = body
            .iter()
            .filter(|(k, _)| !invalid.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        errors.extend(Self::check_relations(&relation_body, resource, store).await?);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        let conflicts = Self::check_unique(body, resource, store, exclude_id).await?;
        if !conflicts.is_empty() {
            return Err(AppError::Conflict(conflicts));
        }
        Ok(())
    }
}
