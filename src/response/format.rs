//! Content negotiation and the JSON/CSV/YAML encoders.

use crate::error::AppError;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Csv,
    Yaml,
}

impl ResponseFormat {
    fn from_media_type(media: &str) -> Option<Self> {
        match media {
            "application/json" | "*/*" => Some(ResponseFormat::Json),
            "text/csv" => Some(ResponseFormat::Csv),
            "text/yaml" | "application/yaml" | "application/x-yaml" => Some(ResponseFormat::Yaml),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Csv => "text/csv; charset=utf-8",
            ResponseFormat::Yaml => "text/yaml; charset=utf-8",
        }
    }

    /// Encode a success envelope. CSV carries only `data`; the other formats carry the
    /// whole envelope.
    pub fn encode(self, envelope: &Value) -> String {
        match self {
            ResponseFormat::Json => envelope.to_string(),
            ResponseFormat::Csv => encode_csv(envelope.get("data").unwrap_or(&Value::Null)),
            ResponseFormat::Yaml => encode_yaml(envelope),
        }
    }

    pub fn render(self, status: StatusCode, envelope: &Value) -> Response {
        let mut response = Response::new(Body::from(self.encode(envelope)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type()),
        );
        response
    }
}

/// Pick an encoding from an `Accept` header. Entries are ordered by quality (stable for
/// ties) and the first supported one wins. A missing or blank header means JSON.
pub fn negotiate(accept: Option<&str>) -> Result<ResponseFormat, AppError> {
    let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(ResponseFormat::Json);
    };
    let mut ranges: Vec<(String, f32)> = accept
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let media = pieces.next()?.trim().to_ascii_lowercase();
            if media.is_empty() {
                return None;
            }
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some((media, quality))
        })
        .collect();
    ranges.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranges
        .iter()
        .filter(|(_, q)| *q > 0.0)
        .find_map(|(media, _)| ResponseFormat::from_media_type(media))
        .ok_or(AppError::NotAcceptable)
}

fn csv_cell(value: Option<&Value>) -> String {
    let raw = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw
    }
}

/// Header row from the first record's keys, one line per record.
pub fn encode_csv(data: &Value) -> String {
    let rows: Vec<&Map<String, Value>> = match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => vec![map],
        Value::Null => Vec::new(),
        scalar => return csv_cell(Some(scalar)),
    };
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_cell(Some(&Value::String((*h).clone()))))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            headers
                .iter()
                .map(|h| csv_cell(row.get(*h)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.is_empty() => "\"\"".to_string(),
        Value::String(s) if s.contains(['\n', ':', '#']) => Value::String(s.clone()).to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
    }
}

fn is_block(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }
}

fn yaml_lines(value: &Value, indent: usize, out: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, v) in map {
                if is_block(v) {
                    out.push(format!("{}{}:", pad, key));
                    yaml_lines(v, indent + 1, out);
                } else {
                    out.push(format!("{}{}: {}", pad, key, yaml_scalar(v)));
                }
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for item in items {
                if is_block(item) {
                    let mut nested = Vec::new();
                    yaml_lines(item, indent + 1, &mut nested);
                    let inner_pad = pad.len() + 2;
                    for (i, line) in nested.into_iter().enumerate() {
                        if i == 0 {
                            out.push(format!("{}- {}", pad, &line[inner_pad..]));
                        } else {
                            out.push(line);
                        }
                    }
                } else {
                    out.push(format!("{}- {}", pad, yaml_scalar(item)));
                }
            }
        }
        scalar => out.push(format!("{}{}", pad, yaml_scalar(scalar))),
    }
}

/// Block-style YAML with two-space indentation per level.
pub fn encode_yaml(value: &Value) -> String {
    let mut lines = Vec::new();
    yaml_lines(value, 0, &mut lines);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn negotiation_prefers_quality_then_order() {
        assert_eq!(negotiate(None).unwrap(), ResponseFormat::Json);
        assert_eq!(negotiate(Some("text/csv")).unwrap(), ResponseFormat::Csv);
        assert_eq!(
            negotiate(Some("application/json;q=0.5, text/yaml")).unwrap(),
            ResponseFormat::Yaml
        );
        assert_eq!(
            negotiate(Some("text/html, application/x-yaml;q=0.8, */*;q=0.1")).unwrap(),
            ResponseFormat::Yaml
        );
        assert_eq!(negotiate(Some("text/html, */*")).unwrap(), ResponseFormat::Json);
    }

    #[test]
    fn unsupported_accept_is_not_acceptable() {
        assert!(matches!(negotiate(Some("text/html")), Err(AppError::NotAcceptable)));
        assert!(matches!(
            negotiate(Some("application/json;q=0")),
            Err(AppError::NotAcceptable)
        ));
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let data = json!([
            { "id": "1", "title": "plain", "n": 3 },
            { "id": "2", "title": "a, \"b\"\nc", "n": null }
        ]);
        assert_eq!(
            encode_csv(&data),
            "id,title,n\n1,plain,3\n2,\"a, \"\"b\"\"\nc\","
        );
        assert_eq!(encode_csv(&json!([])), "");
    }

    #[test]
    fn yaml_block_layout() {
        let doc = json!({
            "data": [{ "id": "1", "note": "a: b", "tags": ["x"] }],
            "meta": { "total": 1 }
        });
        let expected =
            "data:\n  - id: 1\n    note: \"a: b\"\n    tags:\n      - x\nmeta:\n  total: 1\n";
        assert_eq!(encode_yaml(&doc), expected);
    }

    #[test]
    fn yaml_empty_collections_inline() {
        assert_eq!(encode_yaml(&json!({ "data": [] })), "data: []\n");
        assert_eq!(encode_yaml(&json!({ "data": null })), "data: null\n");
    }
}
