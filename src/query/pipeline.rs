//! List pipeline over a store snapshot. Stage order is fixed:
//! filter → search → sort → total → paginate → project → expand.

use crate::config::ResolvedResource;
use crate::query::filter::{apply_filters, parse_date_millis};
use crate::query::{ListQuery, SortDirection, SortSpec};
use crate::store::{Record, Store, StoreError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Size of the filtered set before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Debug)]
pub struct ListOutcome {
    pub data: Vec<Value>,
    pub meta: PaginationMeta,
}

/// Case-insensitive substring match against `fields`. Numbers and booleans match on their
/// JSON text; arrays, objects and nulls never match.
pub fn search(records: Vec<Value>, term: &str, fields: &[&str]) -> Vec<Value> {
    let needle = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| {
            fields.iter().any(|f| {
                r.get(*f)
                    .and_then(searchable_text)
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .collect()
}

fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordering used by sort. Missing and null values are greater than everything,
/// so they land last ascending and first descending.
fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::String(x), Value::String(y)) => {
                match (parse_date_millis(x), parse_date_millis(y)) {
                    (Some(dx), Some(dy)) => dx.cmp(&dy),
                    _ => x.cmp(y),
                }
            }
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Stable sort: ties keep their filtered order in both directions.
pub fn sort(records: &mut [Value], spec: &SortSpec) {
    records.sort_by(|a, b| {
        let ordering = sort_cmp(a.get(&spec.field), b.get(&spec.field));
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn paginate(records: Vec<Value>, query: &ListQuery) -> (Vec<Value>, PaginationMeta) {
    let total = records.len();
    let page_size = query.page_size.max(1);
    let meta = PaginationMeta {
        total,
        page: query.reported_page(),
        page_size,
        total_pages: total.div_ceil(page_size),
    };
    let page = records
        .into_iter()
        .skip(query.effective_offset())
        .take(page_size)
        .collect();
    (page, meta)
}

/// Keep only listed keys, in the listed order. `id` is dropped unless listed.
pub fn project(records: Vec<Value>, fields: &[String]) -> Vec<Value> {
    records.into_iter().map(|r| project_one(r, fields)).collect()
}

pub fn project_one(record: Value, fields: &[String]) -> Value {
    let Value::Object(mut map) = record else {
        return record;
    };
    let mut out = Map::with_capacity(fields.len());
    for f in fields {
        if let Some(v) = map.remove(f) {
            out.insert(f.clone(), v);
        }
    }
    Value::Object(out)
}

/// Replace relation ids with the related records. Unknown relations, absent keys and
/// dangling ids are left untouched. Lookups are memoised per call.
pub async fn expand(
    records: Vec<Value>,
    include: &[String],
    resource: &ResolvedResource,
    store: &dyn Store,
) -> Result<Vec<Value>, StoreError> {
    let relations: Vec<_> = include.iter().filter_map(|f| resource.relation(f)).collect();
    if relations.is_empty() {
        return Ok(records);
    }
    let mut cache: HashMap<(String, String), Option<Value>> = HashMap::new();
    let mut out = Vec::with_capacity(records.len());
    for mut record in records {
        for rel in &relations {
            let Some(id) = record.get(&rel.field).and_then(id_of) else {
                continue;
            };
            let key = (rel.target_collection.clone(), id);
            if !cache.contains_key(&key) {
                let found = store.get(&key.0, &key.1).await?.map(|r| r.to_json());
                if found.is_none() {
                    tracing::warn!(collection = %key.0, id = %key.1, "dangling relation id left unexpanded");
                }
                cache.insert(key.clone(), found);
            }
            if let Some(Some(related)) = cache.get(&key) {
                if let Some(obj) = record.as_object_mut() {
                    obj.insert(rel.field.clone(), related.clone());
                }
            }
        }
        out.push(record);
    }
    Ok(out)
}

/// Relation ids are strings; numeric ids are accepted and compared as text.
pub fn id_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Run the full list pipeline over a store snapshot.
pub async fn run(
    records: Vec<Record>,
    query: &ListQuery,
    resource: &ResolvedResource,
    store: &dyn Store,
) -> Result<ListOutcome, StoreError> {
    let records: Vec<Value> = records.iter().map(Record::to_json).collect();
    let snapshot = records.len();

    let mut records = apply_filters(records, &query.filters);
    if let Some(term) = &query.search {
        records = search(records, term, &resource.search_fields());
    }
    if let Some(spec) = &query.sort {
        sort(&mut records, spec);
    }
    let (mut data, meta) = paginate(records, query);
    if let Some(fields) = &query.fields {
        data = project(data, fields);
    }
    let data = expand(data, &query.include, resource, store).await?;

    tracing::debug!(
        collection = %resource.collection,
        snapshot,
        total = meta.total,
        returned = data.len(),
        "list pipeline"
    );
    Ok(ListOutcome { data, meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EngineConfig, FieldDescriptor, FieldType, ResourceDescriptor};
    use crate::query::{parse_query_string, ListQuery};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn query(raw: &str) -> ListQuery {
        ListQuery::parse(&parse_query_string(Some(raw)), &EngineConfig::default()).unwrap()
    }

    fn ids(records: &[Value]) -> Vec<Value> {
        records.iter().map(|r| r["id"].clone()).collect()
    }

    #[test]
    fn sort_puts_missing_last_ascending_and_first_descending() {
        let mut rows = vec![
            json!({ "id": "a", "rank": 2 }),
            json!({ "id": "b" }),
            json!({ "id": "c", "rank": 1 }),
            json!({ "id": "d", "rank": null }),
        ];
        let spec = |direction| SortSpec {
            field: "rank".into(),
            direction,
        };
        sort(&mut rows, &spec(SortDirection::Asc));
        assert_eq!(ids(&rows), vec![json!("c"), json!("a"), json!("b"), json!("d")]);
        sort(&mut rows, &spec(SortDirection::Desc));
        assert_eq!(ids(&rows), vec![json!("b"), json!("d"), json!("a"), json!("c")]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut rows = vec![
            json!({ "id": 1, "group": "x" }),
            json!({ "id": 2, "group": "y" }),
            json!({ "id": 3, "group": "x" }),
        ];
        sort(
            &mut rows,
            &SortSpec {
                field: "group".into(),
                direction: SortDirection::Desc,
            },
        );
        assert_eq!(ids(&rows), vec![json!(2), json!(1), json!(3)]);
    }

    #[test]
    fn paginate_reports_pre_pagination_total() {
        let rows: Vec<Value> = (1..=25).map(|i| json!({ "id": i })).collect();
        let (page, meta) = paginate(rows.clone(), &query("page=3&pageSize=10"));
        assert_eq!(page.len(), 5);
        assert_eq!(
            meta,
            PaginationMeta {
                total: 25,
                page: 3,
                page_size: 10,
                total_pages: 3
            }
        );
        let (page, meta) = paginate(rows, &query("page=9&pageSize=10"));
        assert!(page.is_empty());
        assert_eq!(meta.total, 25);
    }

    #[test]
    fn projection_drops_unlisted_keys_including_id() {
        let out = project_one(json!({ "id": 1, "title": "A", "done": false }), &["title".to_string()]);
        assert_eq!(out, json!({ "title": "A" }));
    }

    #[test]
    fn search_covers_text_fields_and_title() {
        let rows = vec![
            json!({ "id": 1, "title": "Buy Milk", "email": "a@x.io" }),
            json!({ "id": 2, "title": "Walk", "email": "milkman@x.io" }),
            json!({ "id": 3, "title": "Read", "notes": "milk" }),
        ];
        let out = search(rows, "MILK", &["email", "title"]);
        assert_eq!(ids(&out), vec![json!(1), json!(2)]);
    }

    #[test]
    fn search_matches_non_string_title() {
        let rows = vec![
            json!({ "id": 1, "title": 2024 }),
            json!({ "id": 2, "title": true }),
            json!({ "id": 3, "title": ["2024"] }),
            json!({ "id": 4, "title": null }),
        ];
        assert_eq!(ids(&search(rows.clone(), "202", &["title"])), vec![json!(1)]);
        assert_eq!(ids(&search(rows, "TRU", &["title"])), vec![json!(2)]);
    }

    #[tokio::test]
    async fn expansion_embeds_related_records() {
        let model = resolve(&[
            ResourceDescriptor::new("User").field(FieldDescriptor::new("name", FieldType::Text)),
            ResourceDescriptor::new("Task").field(FieldDescriptor::relation("owner", "User")),
        ])
        .unwrap();
        let store = MemoryStore::new();
        let user = store
            .create("users", json!({ "name": "Ada" }).as_object().cloned().unwrap())
            .await
            .unwrap();
        let rows = vec![
            json!({ "id": "t1", "owner": user.id }),
            json!({ "id": "t2", "owner": "ghost" }),
            json!({ "id": "t3" }),
        ];
        let task = model.resource("tasks").unwrap();
        let out = expand(rows, &["owner".to_string(), "nope".to_string()], task, &store)
            .await
            .unwrap();
        assert_eq!(out[0]["owner"]["name"], json!("Ada"));
        assert_eq!(out[1]["owner"], json!("ghost"));
        assert!(out[2].get("owner").is_none());
    }
}
