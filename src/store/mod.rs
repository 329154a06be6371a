//! Persistence of scheduler configuration text.
//!
//! This module provides a trait-based store abstraction with pluggable
//! backends (in-memory, file-per-config, SQLite). The store is the sole
//! source of truth for which configurations exist across restarts.

mod file;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConfigStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ConfigId;

/// Errors that can occur during config store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No configuration is stored under the given id.
    #[error("no configuration stored under id: {0}")]
    NotFound(ConfigId),

    /// The config id cannot be used with this backend.
    #[error("invalid config id: {0}")]
    InvalidId(String),

    /// I/O failure in the backing medium.
    #[error("config store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store lock was poisoned.
    #[error("config store lock poisoned")]
    LockPoisoned,

    /// Generic backend error.
    #[error("config store error: {0}")]
    Other(String),
}

/// Persists the raw configuration text for each scheduler instance.
///
/// Every call reflects the backing medium's current state; implementations
/// must not cache between calls. `delete` is idempotent.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Persist `text` under `config_id`, overwriting any previous value.
    async fn store(&self, config_id: &ConfigId, text: &str) -> Result<(), StoreError>;

    /// Load the text stored under `config_id`.
    async fn load(&self, config_id: &ConfigId) -> Result<String, StoreError>;

    /// Remove the entry for `config_id`. Removing an absent id is not an error.
    async fn delete(&self, config_id: &ConfigId) -> Result<(), StoreError>;

    /// Enumerate all persisted config ids.
    async fn list_config_ids(&self) -> Result<Vec<ConfigId>, StoreError>;
}
