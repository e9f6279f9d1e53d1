//! CrudService: store access for one resource with not-found mapping and logging.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::store::{strip_system_fields, Record, Store};
use serde_json::{Map, Value};

pub struct CrudService;

impl CrudService {
    pub async fn list(store: &dyn Store, resource: &ResolvedResource) -> Result<Vec<Record>, AppError> {
        tracing::debug!(collection = %resource.collection, "store list");
        Ok(store.list(&resource.collection).await?)
    }

    pub async fn find(
        store: &dyn Store,
        resource: &ResolvedResource,
        id: &str,
    ) -> Result<Option<Record>, AppError> {
        tracing::debug!(collection = %resource.collection, id, "store get");
        Ok(store.get(&resource.collection, id).await?)
    }

    /// Fetch one record or answer 404 naming the resource and id.
    pub async fn read(store: &dyn Store, resource: &ResolvedResource, id: &str) -> Result<Record, AppError> {
        Self::find(store, resource, id)
            .await?
            .ok_or_else(|| not_found(resource, id))
    }

    /// Create from an already-validated body. Engine-owned keys are discarded.
    pub async fn create(
        store: &dyn Store,
        resource: &ResolvedResource,
        body: Map<String, Value>,
    ) -> Result<Record, AppError> {
        let record = store
            .create(&resource.collection, strip_system_fields(body))
            .await?;
        tracing::debug!(collection = %resource.collection, id = %record.id, "created");
        Ok(record)
    }

    /// Merge an already-validated body into an existing record.
    pub async fn update(
        store: &dyn Store,
        resource: &ResolvedResource,
        id: &str,
        body: Map<String, Value>,
    ) -> Result<Record, AppError> {
        let record = store
            .update(&resource.collection, id, strip_system_fields(body))
            .await?;
        tracing::debug!(collection = %resource.collection, id, "updated");
        Ok(record)
    }

    pub async fn delete(store: &dyn Store, resource: &ResolvedResource, id: &str) -> Result<(), AppError> {
        store.delete(&resource.collection, id).await?;
        tracing::debug!(collection = %resource.collection, id, "deleted");
        Ok(())
    }
}

pub fn not_found(resource: &ResolvedResource, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource.label(), id))
}
