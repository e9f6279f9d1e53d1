//! One-to-many relation fields and the many-to-many `tags` surface.

use super::{Reply, RequestContext};
use crate::error::{AppError, FieldError};
use crate::query::pipeline::id_of;
use crate::response::success_one;
use crate::routes::TAGS_COLLECTION;
use crate::service::{CrudService, RelationKey};
use serde_json::{Map, Value};

fn tag_key(ctx: &RequestContext<'_>, id: &str) -> RelationKey {
    RelationKey::new(&ctx.resource.collection, id, TAGS_COLLECTION)
}

/// The related record, or `null` when the field is unset or dangling.
pub async fn get_related(ctx: &RequestContext<'_>, field: &str) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    let record = CrudService::read(ctx.store(), ctx.resource, id).await?;
    let relation = ctx
        .resource
        .relation(field)
        .ok_or_else(|| AppError::NotFound(format!("Relation '{}' not found", field)))?;
    let related = match record.fields.get(field).and_then(id_of) {
        Some(target) => ctx
            .store()
            .get(&relation.target_collection, &target)
            .await?
            .map(|r| r.to_json()),
        None => None,
    };
    Ok(Reply::ok(success_one(related.unwrap_or(Value::Null))))
}

/// Body `{ "id": … }`, `{ "<field>": … }` or `null` to clear.
pub async fn set_related(ctx: &RequestContext<'_>, field: &str) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let relation = ctx
        .resource
        .relation(field)
        .ok_or_else(|| AppError::NotFound(format!("Relation '{}' not found", field)))?;

    let raw = match &ctx.body {
        None | Some(Value::Null) => Value::Null,
        Some(Value::Object(body)) => body
            .get("id")
            .or_else(|| body.get(field))
            .cloned()
            .unwrap_or(Value::Null),
        Some(_) => return Err(AppError::BadRequest("Request body must be a JSON object or null".into())),
    };
    let target = if raw.is_null() {
        Value::Null
    } else {
        let target = id_of(&raw).ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(field, format!("{} must be a record id", field))])
        })?;
        if ctx.store().get(&relation.target_collection, &target).await?.is_none() {
            return Err(AppError::Validation(vec![FieldError::new(
                field,
                format!(
                    "{} references a missing {} record '{}'",
                    field, relation.target_collection, target
                ),
            )]));
        }
        Value::String(target)
    };

    let mut partial = Map::new();
    partial.insert(field.to_string(), target);
    let record = CrudService::update(ctx.store(), ctx.resource, id, partial).await?;
    Ok(Reply::ok(success_one(record.to_json())))
}

/// Members that no longer resolve are dropped from the listing.
pub async fn list_tags(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let mut tags = Vec::new();
    for tag_id in ctx.state.relations.members(&tag_key(ctx, id)) {
        match ctx.store().get(TAGS_COLLECTION, &tag_id).await? {
            Some(tag) => tags.push(tag.to_json()),
            None => tracing::debug!(tag_id = %tag_id, "dropping unresolved tag"),
        }
    }
    Ok(Reply::ok(success_one(Value::Array(tags))))
}

/// Body `{ "id": … }` (alias `tagId`). The tag must exist.
pub async fn add_tag(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let tag_id = ctx
        .body
        .as_ref()
        .and_then(|b| b.get("id").or_else(|| b.get("tagId")))
        .and_then(id_of)
        .ok_or_else(|| AppError::Validation(vec![FieldError::new("id", "id is required")]))?;
    let tag = ctx
        .store()
        .get(TAGS_COLLECTION, &tag_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag with id '{}' not found", tag_id)))?;
    if !ctx.state.relations.add(tag_key(ctx, id), &tag_id) {
        tracing::debug!(id, tag_id = %tag_id, "tag already attached");
    }
    Ok(Reply::created(success_one(tag.to_json())))
}

/// Removing a tag that is not attached is not an error.
pub async fn remove_tag(ctx: &RequestContext<'_>) -> Result<Reply, AppError> {
    let id = ctx.id()?;
    CrudService::read(ctx.store(), ctx.resource, id).await?;
    let tag_id = ctx.param("relationId")?;
    ctx.state.relations.remove(&tag_key(ctx, id), tag_id);
    Ok(Reply::no_content())
}
