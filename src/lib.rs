//! Resource engine: descriptor-driven REST resource API over a pluggable record store.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{
    load_descriptors_from_path, load_descriptors_from_str, resolve, EngineConfig, FieldDescriptor,
    FieldType, ResolvedResource, ResourceDescriptor, ResourceModel,
};
pub use error::{AppError, ConfigError, FieldError};
pub use handlers::{dispatch, ApiRequest};
pub use response::{success_many, success_one};
pub use routes::{common_routes, common_routes_with_ready, entity_routes};
pub use service::{CrudService, RelationTracker};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Record, Store, StoreError};
