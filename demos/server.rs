//! Example server: builds a Task/User/Tag model (or loads one from RESOURCES_PATH), picks
//! a store from DATABASE_URL, and mounts common and resource routes.

use resource_engine::{
    common_routes_with_ready, entity_routes, load_descriptors_from_path, resolve, AppState,
    EngineConfig, FieldDescriptor, FieldType, MemoryStore, PgStore, ResourceDescriptor, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn sample_descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("User")
            .field(FieldDescriptor::new("name", FieldType::Text).required())
            .field(FieldDescriptor::new("email", FieldType::Email).required().unique()),
        ResourceDescriptor::new("Tag").field(FieldDescriptor::new("label", FieldType::Text).required().unique()),
        ResourceDescriptor::new("Task")
            .field(FieldDescriptor::new("title", FieldType::Text).required())
            .field(FieldDescriptor::new("done", FieldType::Boolean).required())
            .field(FieldDescriptor::enumeration("priority", ["low", "medium", "high"]))
            .field(FieldDescriptor::new("due", FieldType::Date))
            .field(FieldDescriptor::relation("owner", "User")),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("resource_engine=info".parse()?))
        .init();

    let descriptors = match std::env::var("RESOURCES_PATH") {
        Ok(path) => load_descriptors_from_path(path).await?,
        Err(_) => sample_descriptors(),
    };
    let model = resolve(&descriptors)?;

    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgStore::connect(&url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        Err(_) => Arc::new(MemoryStore::new()),
    };

    let mut config = EngineConfig::from_env()?;
    if std::env::var("RESOURCE_API_PREFIX").is_err() {
        config = config.with_prefix("/api/v1");
    }
    let state = AppState::new(store, model, config);

    let app = common_routes_with_ready(state.clone()).merge(entity_routes(state));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
