//! PostgreSQL store: every record is one JSONB row in a shared table keyed by (collection, id).
//! Table name from env `RESOURCE_STORE_TABLE` (default `resource_records`).

use super::{Record, Store, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Records table name. Must be a valid PostgreSQL identifier (optionally schema-qualified).
pub fn store_table() -> String {
    std::env::var("RESOURCE_STORE_TABLE").unwrap_or_else(|_| "resource_records".into())
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    table: String,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore {
            pool,
            table: store_table(),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the records table if missing. `seq` preserves insertion order for listing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                payload JSONB NOT NULL,
                seq BIGSERIAL,
                PRIMARY KEY (collection, id)
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError> {
        let record = Record::new(uuid::Uuid::new_v4().to_string(), data);
        let sql = format!(
            "INSERT INTO {} (collection, id, payload) VALUES ($1, $2, $3)",
            self.table
        );
        tracing::debug!(sql = %sql, collection, id = %record.id, "query");
        sqlx::query(&sql)
            .bind(collection)
            .bind(&record.id)
            .bind(record.to_json())
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT payload FROM {} WHERE collection = $1 AND id = $2",
            self.table
        );
        tracing::debug!(sql = %sql, collection, id, "query");
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Record::from_json).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT payload FROM {} WHERE collection = $1 ORDER BY seq",
            self.table
        );
        tracing::debug!(sql = %sql, collection, "query");
        let rows = sqlx::query_scalar::<_, Value>(&sql)
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Record::from_json).collect()
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let mut tx = self.pool.begin().await?;
        let select = format!(
            "SELECT payload FROM {} WHERE collection = $1 AND id = $2 FOR UPDATE",
            self.table
        );
        let current = sqlx::query_scalar::<_, Value>(&select)
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let mut record = Record::from_json(current)?;
        record.apply(partial);
        let update = format!(
            "UPDATE {} SET payload = $3 WHERE collection = $1 AND id = $2",
            self.table
        );
        tracing::debug!(sql = %update, collection, id, "query");
        sqlx::query(&update)
            .bind(collection)
            .bind(id)
            .bind(record.to_json())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE collection = $1 AND id = $2", self.table);
        tracing::debug!(sql = %sql, collection, id, "query");
        sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
