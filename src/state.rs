//! Engine instance shared by all routes. Everything mutable lives behind the store or
//! the relation tracker, so independent instances never share state.

use crate::config::{EngineConfig, ResourceModel};
use crate::routes::{build_routes, Route};
use crate::service::RelationTracker;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ResourceModel>,
    pub relations: Arc<RelationTracker>,
    pub config: Arc<EngineConfig>,
    pub routes: Arc<Vec<Route>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: ResourceModel, config: EngineConfig) -> Self {
        let routes = build_routes(&model, &config.prefix);
        tracing::info!(
            resources = model.resources.len(),
            routes = routes.len(),
            prefix = %config.prefix,
            "resource engine ready"
        );
        AppState {
            store,
            model: Arc::new(model),
            relations: Arc::new(RelationTracker::new()),
            config: Arc::new(config),
            routes: Arc::new(routes),
        }
    }
}
