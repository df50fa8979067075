use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{ensure_id, Collection, Result, Storage};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq BIGSERIAL,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data JSONB NOT NULL,
    PRIMARY KEY (collection, id)
)";

/// A storage implementation backed by PostgreSQL.
///
/// Documents go into a single table as JSONB rows, keyed by collection
/// and id, so the five collections stay schemaless like the in-memory
/// store. `seq` preserves insertion order across restarts.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects to the database and ensures the documents table exists
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        let rows = sqlx::query("SELECT data FROM documents WHERE collection = $1 ORDER BY seq")
            .bind(collection.name())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get("data").map_err(Into::into))
            .collect()
    }

    async fn insert(&self, collection: Collection, mut document: Value) -> Result<Value> {
        let id = ensure_id(&mut document);

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(id)
            .bind(&document)
            .execute(&self.pool)
            .await?;

        Ok(document)
    }

    async fn merge(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>> {
        // `||` is a shallow jsonb concatenation, matching the in-memory
        // merge semantics
        let row = sqlx::query(
            "UPDATE documents SET data = data || $3
             WHERE collection = $1 AND id = $2
             RETURNING data",
        )
        .bind(collection.name())
        .bind(id)
        .bind(&patch)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_get("data").map_err(Into::into))
            .transpose()
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>> {
        let row = sqlx::query(
            "SELECT data FROM documents
             WHERE collection = $1 AND LOWER(data->>$2) = LOWER($3)
             ORDER BY seq LIMIT 1",
        )
        .bind(collection.name())
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_get("data").map_err(Into::into))
            .transpose()
    }
}
