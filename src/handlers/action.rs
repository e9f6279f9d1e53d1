//! Named actions: complete, change-priority, complete-all.

use super::{Reply, RequestContext};
use crate::config::ResolvedResource;
use crate::error::{AppError, FieldError};
use crate::query::filter::apply_filters;
use crate::query::pipeline::id_of;
use crate::query::ListQuery;
use crate::response::success_one;
use crate::service::{check_type, CrudService};
use serde_json::{Map, Value};

const PRIORITY_FIELD: &str = "priority";

fn completion_field(resource: &ResolvedResource) -> Result<&str, AppError> {
    resource.completion_field().ok_or_else(|| {
        AppError::BadRequest(format!("{} has no boolean field to complete", resource.label()))
    })
}

fn single(field: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    map
}

pub async fn complete(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let field = completion_field(ctx.resource)?;
    let record = CrudService::update(ctx.store(), ctx.resource, id, single(field, Value::Bool(true))).await?;
    Ok(Reply::ok(success_one(record.to_json())))
}

/// Body `{ "priority": value }`. Enum-declared priorities must use a declared value.
pub async fn change_priority(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let value = ctx
        .body
        .as_ref()
        .and_then(|b| b.get(PRIORITY_FIELD))
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(PRIORITY_FIELD, "priority is required")])
        })?;
    if let Some(field) = ctx.resource.field(PRIORITY_FIELD) {
        if let Some(message) = check_type(field, &value) {
            return Err(AppError::Validation(vec![FieldError::new(PRIORITY_FIELD, message)]));
        }
    }
    let record = CrudService::update(ctx.store(), ctx.resource, id, single(PRIORITY_FIELD, value)).await?;
    Ok(Reply::ok(success_one(record.to_json())))
}

/// Mark every record matching the query filters as complete. Records already complete
/// are left untouched; the updated records are returned.
pub async fn complete_all(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let field = completion_field(ctx.resource)?;
    let query = ListQuery::parse(&ctx.query, &ctx.state.config)?;
    let records: Vec<Value> = CrudService::list(ctx.store(), ctx.resource)
        .await?
        .iter()
        .map(|r| r.to_json())
        .collect();
    let pending: Vec<String> = apply_filters(records, &query.filters)
        .iter()
        .filter(|r| r.get(field) != Some(&Value::Bool(true)))
        .filter_map(|r| r.get("id").and_then(id_of))
        .collect();

    let mut updated = Vec::with_capacity(pending.len());
    for id in pending {
        let record = CrudService::update(ctx.store(), ctx.resource, &id, single(field, Value::Bool(true))).await?;
        updated.push(record.to_json());
    }
    tracing::debug!(collection = %ctx.resource.collection, updated = updated.len(), "complete-all");
    Ok(Reply::ok(success_one(Value::Array(updated))))
}
