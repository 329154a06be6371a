//! In-memory config store implementation.
//!
//! Thread-safe backend for tests and ephemeral runs. Nothing survives a
//! process restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{ConfigStore, StoreError};
use crate::core::types::ConfigId;

/// In-memory config store backend.
pub struct MemoryConfigStore {
    entries: RwLock<HashMap<ConfigId, String>>,
}

impl MemoryConfigStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn store(&self, config_id: &ConfigId, text: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(config_id.clone(), text.to_string());
        Ok(())
    }

    async fn load(&self, config_id: &ConfigId) -> Result<String, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        entries
            .get(config_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(config_id.clone()))
    }

    async fn delete(&self, config_id: &ConfigId) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(config_id);
        Ok(())
    }

    async fn list_config_ids(&self) -> Result<Vec<ConfigId>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut ids: Vec<_> = entries.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
