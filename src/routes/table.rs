//! Route table synthesized from the resolved model. Built once per engine instance.

use crate::config::ResourceModel;
use axum::http::Method;

pub const TAGS_SEGMENT: &str = "tags";
/// Collection holding the records that `…/:id/tags` associates.
pub const TAGS_COLLECTION: &str = "tags";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteKind {
    List,
    Create,
    BulkCreate,
    BulkUpdate,
    BulkDelete,
    CompleteAll,
    Read,
    Update,
    Patch,
    Delete,
    Complete,
    ChangePriority,
    RelationGet { field: String },
    RelationPut { field: String },
    TagsList,
    TagsAdd,
    TagsRemove,
}

#[derive(Clone, Debug)]
pub struct Route {
    pub method: Method,
    /// Absolute pattern including the prefix, e.g. `/api/tasks/:id`.
    pub pattern: String,
    pub collection: String,
    pub kind: RouteKind,
}

impl Route {
    fn new(method: Method, pattern: String, collection: &str, kind: RouteKind) -> Self {
        Route {
            method,
            pattern,
            collection: collection.to_string(),
            kind,
        }
    }
}

/// Deterministic for a given model. Fixed segments come before `:id` so `…/bulk` and
/// `…/complete-all` win over a record id.
pub fn build_routes(model: &ResourceModel, prefix: &str) -> Vec<Route> {
    let mut routes = Vec::new();
    for resource in &model.resources {
        let c = resource.collection.as_str();
        let base = format!("{}/{}", prefix, c);
        let one = format!("{}/:id", base);

        routes.push(Route::new(Method::GET, base.clone(), c, RouteKind::List));
        routes.push(Route::new(Method::POST, base.clone(), c, RouteKind::Create));

        let bulk = format!("{}/bulk", base);
        routes.push(Route::new(Method::POST, bulk.clone(), c, RouteKind::BulkCreate));
        routes.push(Route::new(Method::PUT, bulk.clone(), c, RouteKind::BulkUpdate));
        routes.push(Route::new(Method::DELETE, bulk, c, RouteKind::BulkDelete));
        routes.push(Route::new(
            Method::POST,
            format!("{}/complete-all", base),
            c,
            RouteKind::CompleteAll,
        ));

        routes.push(Route::new(Method::GET, one.clone(), c, RouteKind::Read));
        routes.push(Route::new(Method::PUT, one.clone(), c, RouteKind::Update));
        routes.push(Route::new(Method::PATCH, one.clone(), c, RouteKind::Patch));
        routes.push(Route::new(Method::DELETE, one.clone(), c, RouteKind::Delete));

        routes.push(Route::new(
            Method::POST,
            format!("{}/complete", one),
            c,
            RouteKind::Complete,
        ));
        routes.push(Route::new(
            Method::POST,
            format!("{}/change-priority", one),
            c,
            RouteKind::ChangePriority,
        ));

        for rel in &resource.relations {
            let path = format!("{}/{}", one, rel.field);
            routes.push(Route::new(
                Method::GET,
                path.clone(),
                c,
                RouteKind::RelationGet {
                    field: rel.field.clone(),
                },
            ));
            routes.push(Route::new(
                Method::PUT,
                path,
                c,
                RouteKind::RelationPut {
                    field: rel.field.clone(),
                },
            ));
        }

        let tags = format!("{}/{}", one, TAGS_SEGMENT);
        routes.push(Route::new(Method::GET, tags.clone(), c, RouteKind::TagsList));
        routes.push(Route::new(Method::POST, tags.clone(), c, RouteKind::TagsAdd));
        routes.push(Route::new(
            Method::DELETE,
            format!("{}/:relationId", tags),
            c,
            RouteKind::TagsRemove,
        ));
    }
    tracing::debug!(routes = routes.len(), prefix, "route table built");
    routes
}
