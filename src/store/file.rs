//! File-backed config store implementation.
//!
//! One file per config id under a single directory. The file name is
//! `<configId>.properties`; the directory layout is private to this backend.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{ConfigStore, StoreError};
use crate::core::types::ConfigId;

const FILE_EXTENSION: &str = "properties";

/// Config store backend keeping one file per config id.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    /// Open a file store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the file path for an id, rejecting ids that would escape
    /// the store directory.
    fn path_for(&self, config_id: &ConfigId) -> Result<PathBuf, StoreError> {
        let id = config_id.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", id, FILE_EXTENSION)))
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn store(&self, config_id: &ConfigId, text: &str) -> Result<(), StoreError> {
        let path = self.path_for(config_id)?;
        tokio::fs::write(&path, text).await?;
        Ok(())
    }

    async fn load(&self, config_id: &ConfigId) -> Result<String, StoreError> {
        let path = self.path_for(config_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(config_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, config_id: &ConfigId) -> Result<(), StoreError> {
        let path = self.path_for(config_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_config_ids(&self) -> Result<Vec<ConfigId>, StoreError> {
        let mut ids = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(ConfigId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
