//! Filter evaluation with typed comparison semantics.

use crate::query::{FilterOp, ParsedFilter};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;

/// Epoch milliseconds for RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (UTC) or `YYYY-MM-DD`.
pub fn parse_date_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.timestamp_millis());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp_millis());
    }
    None
}

/// Compare a record value against a query value, coercing the query side to the record's type.
/// `None` means the two are not comparable.
pub fn compare(record: Option<&Value>, query: &Value) -> Option<Ordering> {
    let record = match record {
        None | Some(Value::Null) => return None,
        Some(v) => v,
    };
    match (record, query) {
        (Value::String(r), Value::String(q)) => {
            if let (Some(a), Some(b)) = (parse_date_millis(r), parse_date_millis(q)) {
                return Some(a.cmp(&b));
            }
            Some(r.as_str().cmp(q.as_str()))
        }
        (Value::String(r), Value::Bool(q)) => Some(r.as_str().cmp(if *q { "true" } else { "false" })),
        (Value::Number(r), Value::String(q)) => {
            let q: f64 = q.trim().parse().ok()?;
            r.as_f64()?.partial_cmp(&q)
        }
        (Value::Number(r), Value::Number(q)) => r.as_f64()?.partial_cmp(&q.as_f64()?),
        (Value::Bool(r), Value::Bool(q)) => Some(r.cmp(q)),
        (Value::Bool(r), Value::String(q)) => match q.as_str() {
            "true" => Some(r.cmp(&true)),
            "false" => Some(r.cmp(&false)),
            _ => None,
        },
        (r, q) => (r == q).then_some(Ordering::Equal),
    }
}

pub fn matches(record: &Value, filter: &ParsedFilter) -> bool {
    let value = record.get(&filter.field);
    match filter.op {
        FilterOp::In => match (value, &filter.value) {
            (Some(Value::String(s)), Value::Array(list)) => {
                list.iter().any(|v| v.as_str() == Some(s.as_str()))
            }
            _ => false,
        },
        FilterOp::Eq => compare(value, &filter.value) == Some(Ordering::Equal),
        FilterOp::Ne => compare(value, &filter.value) != Some(Ordering::Equal),
        FilterOp::Gt => compare(value, &filter.value) == Some(Ordering::Greater),
        FilterOp::Lt => compare(value, &filter.value) == Some(Ordering::Less),
        FilterOp::Gte => matches!(
            compare(value, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lte => matches!(
            compare(value, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Keep records satisfying every filter (conditions are AND-ed).
pub fn apply_filters(records: Vec<Value>, filters: &[ParsedFilter]) -> Vec<Value> {
    if filters.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| filters.iter().all(|f| matches(r, f)))
        .collect()
}
