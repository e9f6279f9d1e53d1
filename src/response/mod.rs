//! Standard response envelopes, ETags and CORS headers.

mod format;
pub use format::{encode_csv, encode_yaml, negotiate, ResponseFormat};

use crate::query::PaginationMeta;
use axum::http::{header, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

pub fn success_one(data: Value) -> Value {
    envelope(SuccessOne { data, meta: None })
}

pub fn success_many(data: Vec<Value>, meta: PaginationMeta) -> Value {
    envelope(SuccessMany { data, meta })
}

fn envelope<T: Serialize>(body: T) -> Value {
    // Serializing owned JSON values and plain structs cannot fail.
    serde_json::to_value(body).unwrap_or(Value::Null)
}

/// 32-bit rolling hash (`h = h*31 + unit` over UTF-16 units) of the compact JSON form,
/// folded non-negative and rendered as a quoted hex string.
pub fn etag(value: &Value) -> String {
    let json = value.to_string();
    let mut hash: i32 = 0;
    for unit in json.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    format!("\"{:x}\"", i64::from(hash).abs())
}

/// True when an `If-None-Match` header names `current`. Accepts weak and unquoted forms.
pub fn etag_matches(if_none_match: &str, current: &str) -> bool {
    let bare = current.trim_matches('"');
    if_none_match.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*"
            || candidate
                .trim_start_matches("W/")
                .trim_matches('"')
                == bare
    })
}

pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str =
    "Content-Type, Accept, If-None-Match, X-HTTP-Method-Override, Authorization";
pub const EXPOSED_HEADERS: &str = "ETag, Location";

/// Permissive CORS headers carried by every engine response.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn etag_is_stable_and_content_sensitive() {
        let a = json!({ "id": "1", "title": "A" });
        let b = json!({ "id": "1", "title": "B" });
        assert_eq!(etag(&a), etag(&a.clone()));
        assert_ne!(etag(&a), etag(&b));
        let tag = etag(&a);
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert!(tag.trim_matches('"').chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn etag_of_known_input() {
        // "1" is 0x31 = 49; JSON form is "\"1\"" → 34, 49, 34.
        let expected = ((34 * 31 + 49) * 31 + 34) as i64;
        assert_eq!(etag(&json!("1")), format!("\"{:x}\"", expected));
    }

    #[test]
    fn if_none_match_forms() {
        assert!(etag_matches("\"abc\"", "\"abc\""));
        assert!(etag_matches("abc", "\"abc\""));
        assert!(etag_matches("W/\"abc\", \"def\"", "\"abc\""));
        assert!(etag_matches("*", "\"abc\""));
        assert!(!etag_matches("\"abd\"", "\"abc\""));
    }

    #[test]
    fn envelopes() {
        let one = success_one(json!({ "id": "x" }));
        assert_eq!(one, json!({ "data": { "id": "x" } }));
        let many = success_many(
            vec![json!(1)],
            PaginationMeta {
                total: 1,
                page: 1,
                page_size: 20,
                total_pages: 1,
            },
        );
        assert_eq!(many["meta"]["pageSize"], 20);
        assert_eq!(many["meta"]["totalPages"], 1);
    }
}
