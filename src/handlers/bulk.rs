//! Bulk handlers. Create is all-or-nothing; update and delete are best-effort.

use super::{Reply, RequestContext};
use crate::error::{AppError, FieldError};
use crate::query::pipeline::id_of;
use crate::response::success_one;
use crate::service::{not_found, CrudService, RequestValidator, ValidationMode};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Per-item failure reported inline by bulk update.
#[derive(Debug, Serialize)]
pub struct BulkItemError {
    pub id: Value,
    pub message: String,
}

fn prefixed(index: usize, errors: Vec<FieldError>) -> impl Iterator<Item = FieldError> {
    errors.into_iter().map(move |e| FieldError {
        field: Some(match e.field {
            Some(f) => format!("[{}].{}", index, f),
            None => format!("[{}]", index),
        }),
        message: e.message,
    })
}

fn error_message(err: &AppError) -> String {
    match err {
        AppError::Validation(d) | AppError::Conflict(d) if !d.is_empty() => d
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// Validate every item, including uniqueness inside the batch, before creating any.
pub async fn create(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let Some(Value::Array(items)) = &ctx.body else {
        return Err(AppError::BadRequest("Bulk create body must be a JSON array".into()));
    };
    let limit = ctx.state.config.bulk_limit;
    if items.len() > limit {
        return Err(AppError::BadRequest(format!(
            "Bulk create accepts at most {} items, got {}",
            limit,
            items.len()
        )));
    }

    let unique_fields: Vec<&str> = ctx
        .resource
        .fields
        .iter()
        .filter(|f| f.unique)
        .map(|f| f.name.as_str())
        .collect();
    let mut seen: HashSet<(&str, String)> = HashSet::new();
    let mut errors = Vec::new();
    let mut bodies: Vec<Map<String, Value>> = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let Value::Object(body) = item else {
            errors.push(FieldError {
                field: Some(format!("[{}]", i)),
                message: "item must be a JSON object".into(),
            });
            continue;
        };
        match RequestValidator::validate(body, ctx.resource, ctx.store(), ValidationMode::Create, None).await {
            Ok(()) => {}
            Err(AppError::Validation(d)) | Err(AppError::Conflict(d)) => errors.extend(prefixed(i, d)),
            Err(other) => return Err(other),
        }
        for name in &unique_fields {
            let Some(value) = body.get(*name).filter(|v| !v.is_null()) else {
                continue;
            };
            if !seen.insert((*name, value.to_string())) {
                errors.push(FieldError::new(
                    format!("[{}].{}", i, name),
                    format!("{} must be unique; {} is repeated in the batch", name, value),
                ));
            }
        }
        bodies.push(body.clone());
    }
    if !errors.is_empty() {
        tracing::debug!(collection = %ctx.resource.collection, failures = errors.len(), "bulk create rejected");
        return Err(AppError::Validation(errors));
    }

    let mut created = Vec::with_capacity(bodies.len());
    for body in bodies {
        let record = CrudService::create(ctx.store(), ctx.resource, body).await?;
        created.push(record.to_json());
    }
    tracing::debug!(collection = %ctx.resource.collection, created = created.len(), "bulk create");
    Ok(Reply::created(success_one(Value::Array(created))))
}

async fn update_one(ctx: &RequestContext<'_>, id: &str, body: Map<String, Value>) -> Result<Value, AppError> {
    if CrudService::find(ctx.store(), ctx.resource, id).await?.is_none() {
        return Err(not_found(ctx.resource, id));
    }
    RequestValidator::validate(&body, ctx.resource, ctx.store(), ValidationMode::Update, Some(id)).await?;
    Ok(CrudService::update(ctx.store(), ctx.resource, id, body).await?.to_json())
}

/// Each item is `{ "id": …, …fields }`. Failures are collected, never raised.
pub async fn update(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let Some(Value::Array(items)) = &ctx.body else {
        return Err(AppError::BadRequest("Bulk update body must be a JSON array".into()));
    };
    let mut updated = Vec::new();
    let mut errors = Vec::new();
    for item in items {
        let id = item.get("id").and_then(id_of);
        let outcome = match (&id, item) {
            (Some(id), Value::Object(body)) => update_one(ctx, id, body.clone()).await,
            _ => Err(AppError::BadRequest("item must be an object with an id".into())),
        };
        match outcome {
            Ok(record) => updated.push(record),
            Err(e) => {
                tracing::warn!(collection = %ctx.resource.collection, id = ?id, error = %e, "bulk update item skipped");
                errors.push(BulkItemError {
                    id: id.map(Value::String).unwrap_or(Value::Null),
                    message: error_message(&e),
                });
            }
        }
    }
    Ok(Reply::ok(success_one(json!({ "updated": updated, "errors": errors }))))
}

/// `{ "ids": [...] }`. Ids that are not strings, are empty or do not exist are skipped
/// silently; only ids actually deleted are returned.
pub async fn delete(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let Some(ids) = ctx
        .body
        .as_ref()
        .and_then(|b| b.get("ids"))
        .and_then(Value::as_array)
    else {
        return Err(AppError::BadRequest("Bulk delete body must contain an 'ids' array".into()));
    };
    let mut deleted = Vec::new();
    for id in ids.iter().filter_map(Value::as_str).filter(|s| !s.is_empty()) {
        match CrudService::find(ctx.store(), ctx.resource, id).await {
            Ok(Some(_)) => {}
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(collection = %ctx.resource.collection, id, error = %e, "bulk delete item skipped");
                continue;
            }
        }
        if let Err(e) = CrudService::delete(ctx.store(), ctx.resource, id).await {
            tracing::warn!(collection = %ctx.resource.collection, id, error = %e, "bulk delete item skipped");
            continue;
        }
        ctx.state.relations.remove_owner(&ctx.resource.collection, id);
        deleted.push(Value::String(id.to_string()));
    }
    Ok(Reply::ok(success_one(Value::Array(deleted))))
}
