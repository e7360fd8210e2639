use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;
use travesia_core::{DocumentStore, StoreError, StoreResult};

use crate::app_config::DatabaseConfig;

/// Postgres-backed document store: one JSONB row per `(collection, doc_id)`.
#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await
            .map_err(document_err)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Document store pool closed");
    }
}

pub(crate) fn document_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Backend(Box::new(other)),
    }
}

#[async_trait]
impl DocumentStore for DbClient {
    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(document))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("Document {} inserted into {}", id, collection);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(document_err(e)),
        }
    }

    async fn find_document(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents WHERE collection = $1 AND doc_id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(document_err)?;

        Ok(body.map(|Json(value)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(document_err(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(document_err(sqlx::Error::RowNotFound), StoreError::Backend(_)));
    }
}
