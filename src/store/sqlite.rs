//! SQLite config store implementation.
//!
//! Keeps every configuration in a single database file behind the same
//! `ConfigStore` contract as the file and memory backends.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use super::{ConfigStore, StoreError};
use crate::core::types::ConfigId;

/// SQLite config store backend.
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    /// Open (or create) the database at `path` and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| StoreError::Other(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an in-memory database (useful for testing).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let schema = include_str!("../../migrations/001_configs.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Other(format!("migration failed: {}", e)))?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn store(&self, config_id: &ConfigId, text: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO configs (id, props)
            VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET props = excluded.props
            "#,
        )
        .bind(config_id.as_str())
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, config_id: &ConfigId) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT props FROM configs WHERE id = ?")
            .bind(config_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        row.map(|r| r.get::<String, _>("props"))
            .ok_or_else(|| StoreError::NotFound(config_id.clone()))
    }

    async fn delete(&self, config_id: &ConfigId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM configs WHERE id = ?")
            .bind(config_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(())
    }

    async fn list_config_ids(&self) -> Result<Vec<ConfigId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM configs ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| ConfigId::new(r.get::<String, _>("id")))
            .collect())
    }
}
