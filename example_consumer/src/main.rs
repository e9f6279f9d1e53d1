//! Example consumer: a separate Rust project that uses resource-engine as a dependency.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`

use resource_engine::{
    common_routes_with_ready, entity_routes, load_descriptors_from_path, resolve, AppState,
    EngineConfig, MemoryStore, PgStore, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resource_engine=info")),
        )
        .init();

    let path = std::env::var("RESOURCES_PATH").unwrap_or_else(|_| "resources.json".into());
    let descriptors = load_descriptors_from_path(&path).await?;
    let model = resolve(&descriptors)?;

    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgStore::connect(&url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, model, EngineConfig::from_env()?);
    let app = common_routes_with_ready(state.clone()).merge(entity_routes(state));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
