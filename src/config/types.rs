//! Typed resource descriptors and engine settings. Descriptors are produced by an external
//! schema compiler (or loaded from JSON); the engine only ever reads them.

use serde::{Deserialize, Serialize};

/// Declared type of a field. `string` and `select` are accepted as aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "string")]
    Text,
    Number,
    Boolean,
    Date,
    Datetime,
    Email,
    Url,
    #[serde(alias = "select")]
    Enum,
    Relation,
}

impl FieldType {
    /// Text-like types participate in `q`/`search` matching.
    pub fn is_text_like(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Email)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Enum => "enum",
            FieldType::Relation => "relation",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// Generated by the store or engine (timestamps etc.); never required on input.
    #[serde(default)]
    pub auto: bool,
    /// Allowed values for `enum` fields.
    #[serde(default)]
    pub values: Vec<String>,
    /// Target resource (name or collection) for `relation` fields.
    #[serde(default)]
    pub target: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            auto: false,
            values: Vec::new(),
            target: None,
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = FieldDescriptor::new(name, FieldType::Enum);
        field.values = values.into_iter().map(Into::into).collect();
        field
    }

    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        let mut field = FieldDescriptor::new(name, FieldType::Relation);
        field.target = Some(target.into());
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    /// Path-safe plural name. Derived from `name` when omitted.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ResourceDescriptor {
            name: name.into(),
            collection: None,
            fields: Vec::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Runtime settings for one engine instance.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path prefix for every resource route, e.g. `/api`. Empty for none.
    pub prefix: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Maximum items accepted by bulk create.
    pub bulk_limit: usize,
    pub body_limit_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            prefix: String::new(),
            default_page_size: 20,
            max_page_size: 1000,
            bulk_limit: 1000,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = normalize_prefix(&prefix.into());
        self
    }
}

/// `api/` → `/api`, `/` → ``.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_aliases_deserialize() {
        let f: FieldDescriptor =
            serde_json::from_value(serde_json::json!({ "name": "title", "type": "string" })).unwrap();
        assert_eq!(f.field_type, FieldType::Text);
        let f: FieldDescriptor = serde_json::from_value(
            serde_json::json!({ "name": "p", "type": "select", "values": ["a", "b"] }),
        )
        .unwrap();
        assert_eq!(f.field_type, FieldType::Enum);
        assert_eq!(f.values, vec!["a", "b"]);
        assert!(!f.required);
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(EngineConfig::default().with_prefix("v2").prefix, "/v2");
    }
}
