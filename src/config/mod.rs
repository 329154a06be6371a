//! Application settings and service wiring.
//!
//! Settings are constructed explicitly (from CLI flags) and passed down;
//! there is no process-wide configuration singleton. Startup order is
//! ConfigStore, then Container, then the API server; teardown runs in
//! reverse.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::store::{ConfigStore, FileConfigStore, MemoryConfigStore, StoreError};

/// Default bind host for the console.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port for the console.
pub const DEFAULT_PORT: u16 = 8686;

/// Errors in the application settings themselves.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Host/port do not form a valid socket address.
    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),
}

/// Which config store backend to run against.
#[derive(Debug, Clone)]
pub enum StoreSettings {
    /// In-memory store; nothing survives a restart.
    Memory,
    /// One file per configuration under a directory.
    File {
        /// Directory holding the config files.
        dir: PathBuf,
    },
    /// All configurations in a single SQLite database file.
    #[cfg(feature = "sqlite")]
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
    },
}

/// Explicitly constructed application settings.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Host the API binds to.
    pub host: String,
    /// Port the API binds to.
    pub port: u16,
    /// Store backend selection.
    pub store: StoreSettings,
}

impl AppSettings {
    /// Create settings with the given bind address and store backend.
    pub fn new(host: impl Into<String>, port: u16, store: StoreSettings) -> Self {
        Self {
            host: host.into(),
            port,
            store,
        }
    }

    /// The socket address to bind the API server to.
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| SettingsError::InvalidBindAddr(addr))
    }

    /// Open the configured store backend.
    pub async fn open_store(&self) -> Result<Arc<dyn ConfigStore>, StoreError> {
        match &self.store {
            StoreSettings::Memory => Ok(Arc::new(MemoryConfigStore::new())),
            StoreSettings::File { dir } => Ok(Arc::new(FileConfigStore::open(dir.clone())?)),
            #[cfg(feature = "sqlite")]
            StoreSettings::Sqlite { path } => {
                Ok(Arc::new(crate::store::SqliteConfigStore::open(path).await?))
            }
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, StoreSettings::Memory)
    }
}
