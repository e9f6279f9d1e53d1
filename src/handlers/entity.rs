//! Single-resource CRUD handlers: list, read, create, replace, patch, delete.

use super::{Reply, RequestContext};
use crate::error::AppError;
use crate::query::pipeline::{expand, project_one, run};
use crate::query::{ListQuery, RecordView};
use crate::response::{etag, etag_matches, success_many, success_one};
use crate::service::{CrudService, RequestValidator, ValidationMode};
use axum::http::{header, StatusCode};
use serde_json::{Map, Value};

pub async fn list(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let query = ListQuery::parse(&ctx.query, &ctx.state.config)?;
    let records = CrudService::list(ctx.store(), ctx.resource).await?;
    let outcome = run(records, &query, ctx.resource, ctx.store()).await?;
    Ok(Reply::ok(success_many(outcome.data, outcome.meta)))
}

/// GET one, with projection, expansion and conditional caching on the final body.
pub async fn read(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    let record = CrudService::read(ctx.store(), ctx.resource, id).await?;
    let view = RecordView::parse(&ctx.query);
    let mut data = record.to_json();
    if let Some(fields) = &view.fields {
        data = project_one(data, fields);
    }
    let data = expand(vec![data], &view.include, ctx.resource, ctx.store())
        .await?
        .pop()
        .unwrap_or(Value::Null);

    let tag = etag(&data);
    if let Some(candidate) = ctx.header_str(header::IF_NONE_MATCH) {
        if etag_matches(candidate, &tag) {
            return Ok(Reply::new(StatusCode::NOT_MODIFIED, None).with_header(header::ETAG, &tag));
        }
    }
    Ok(Reply::ok(success_one(data)).with_header(header::ETAG, &tag))
}

pub async fn create(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let body = ctx.body_object()?;
    RequestValidator::validate(&body, ctx.resource, ctx.store(), ValidationMode::Create, None).await?;
    let record = CrudService::create(ctx.store(), ctx.resource, body).await?;
    let location = ctx.record_path(&record.id);
    Ok(Reply::created(success_one(record.to_json())).with_header(header::LOCATION, &location))
}

async fn merge(ctx: &RequestContext<'_>, body: Map<String, Value>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    RequestValidator::validate(&body, ctx.resource, ctx.store(), ValidationMode::Update, Some(id)).await?;
    let record = CrudService::update(ctx.store(), ctx.resource, id, body).await?;
    Ok(Reply::ok(success_one(record.to_json())))
}

/// PUT: merge a non-empty object. `id` and timestamps in the body are ignored.
pub async fn replace(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let body = ctx.body_object()?;
    if body.is_empty() {
        return Err(AppError::BadRequest("Request body must not be empty".into()));
    }
    merge(ctx, body).await
}

/// PATCH: an empty or absent body only refreshes `updatedAt`.
pub async fn patch(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let body = match &ctx.body {
        None => Map::new(),
        Some(_) => ctx.body_object()?,
    };
    merge(ctx, body).await
}

/// Memberships owned by the record go with it; other records' references are left alone.
pub async fn delete(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    CrudService::delete(ctx.store(), ctx.resource, id).await?;
    let dropped = ctx.state.relations.remove_owner(&ctx.resource.collection, id);
    if dropped > 0 {
        tracing::debug!(collection = %ctx.resource.collection, id, dropped, "dropped memberships");
    }
    Ok(Reply::no_content())
}
