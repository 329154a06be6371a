//! Per-instance lifecycle wrapper around one scheduler engine.
//!
//! A [`SchedulerService`] owns the configuration text and the engine handle
//! for exactly one scheduler instance. Lifecycle transitions are serialized
//! per service; different services never contend with each other.

mod status;

pub use status::{detail_map, SchedulerStatus};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::props::ConfigProps;
use crate::core::types::ConfigId;
use crate::engine::{EngineError, EngineFactory, EngineHandle};

/// Property marking a configuration for automatic init + start on creation.
pub const AUTO_START_KEY: &str = "schedhub.autoStart";

const NAME_KEY: &str = "engine.name";

/// Lifecycle wrapper for one configured scheduler instance.
///
/// States: uninitialized (no engine handle), initialized (handle in
/// standby), started, standby. `shutdown` discards the handle and returns
/// the service to uninitialized; the service itself survives and can be
/// re-initialized.
pub struct SchedulerService {
    config_id: ConfigId,
    factory: Arc<dyn EngineFactory>,
    inner: Mutex<ServiceInner>,
}

struct ServiceInner {
    config_text: String,
    auto_start: bool,
    engine: Option<Arc<dyn EngineHandle>>,
    init_error: Option<EngineError>,
}

impl SchedulerService {
    /// Create an uninitialized service from configuration text.
    ///
    /// Malformed text is accepted here; it surfaces as a captured error on
    /// the first `init` so broken configurations stay visible in listings.
    pub fn new(
        config_id: ConfigId,
        config_text: impl Into<String>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let config_text = config_text.into();
        let auto_start = ConfigProps::parse(&config_text)
            .map(|p| p.get_bool(AUTO_START_KEY))
            .unwrap_or(false);

        Self {
            config_id,
            factory,
            inner: Mutex::new(ServiceInner {
                config_text,
                auto_start,
                engine: None,
                init_error: None,
            }),
        }
    }

    /// The config id this service is registered under.
    pub fn config_id(&self) -> &ConfigId {
        &self.config_id
    }

    /// The last-set configuration text.
    pub async fn config_text(&self) -> String {
        self.inner.lock().await.config_text.clone()
    }

    /// Whether the configuration requests automatic init + start.
    pub async fn is_auto_start(&self) -> bool {
        self.inner.lock().await.auto_start
    }

    /// Build the engine handle from the configuration text.
    ///
    /// A failure is captured into the service (and also returned) so that a
    /// broken instance degrades gracefully instead of disappearing from the
    /// registry. A later `init` clears the captured error and retries.
    /// Calling `init` on an already-initialized service is a no-op.
    pub async fn init(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.engine.is_some() {
            return Ok(());
        }
        inner.init_error = None;

        let built = match ConfigProps::parse(&inner.config_text) {
            Ok(props) => self.factory.build(&props).await,
            Err(e) => Err(EngineError::InvalidConfig(e.to_string())),
        };

        match built {
            Ok(engine) => {
                tracing::info!(config_id = %self.config_id, "scheduler initialized");
                inner.engine = Some(engine);
                Ok(())
            }
            Err(e) => {
                tracing::error!(config_id = %self.config_id, error = %e, "scheduler initialization failed");
                inner.init_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Start the engine. Fails if the service is not initialized or the
    /// engine rejects the transition.
    pub async fn start(&self) -> Result<(), EngineError> {
        let inner = self.inner.lock().await;
        let engine = inner.engine.as_ref().ok_or(EngineError::NotInitialized)?;
        engine.start().await?;
        tracing::info!(config_id = %self.config_id, "scheduler started");
        Ok(())
    }

    /// Place the engine in standby. Fails if the service is not initialized.
    pub async fn standby(&self) -> Result<(), EngineError> {
        let inner = self.inner.lock().await;
        let engine = inner.engine.as_ref().ok_or(EngineError::NotInitialized)?;
        engine.standby().await?;
        tracing::info!(config_id = %self.config_id, "scheduler placed in standby");
        Ok(())
    }

    /// Shut the engine down and discard the handle.
    ///
    /// The service returns to uninitialized and can be re-initialized. If
    /// the engine rejects the shutdown the handle is kept.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        let engine = inner.engine.take().ok_or(EngineError::NotInitialized)?;
        match engine.shutdown().await {
            Ok(()) => {
                tracing::info!(config_id = %self.config_id, "scheduler shut down");
                Ok(())
            }
            Err(e) => {
                inner.engine = Some(engine);
                Err(e)
            }
        }
    }

    /// Whether an engine handle is present.
    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.engine.is_some()
    }

    /// Whether the engine is currently started. False when uninitialized.
    pub async fn is_started(&self) -> bool {
        match self.current_engine().await {
            Some(engine) => engine.is_started().await.unwrap_or(false),
            None => false,
        }
    }

    /// Whether the engine is in standby. False when uninitialized.
    pub async fn is_standby(&self) -> bool {
        match self.current_engine().await {
            Some(engine) => engine.is_standby().await.unwrap_or(false),
            None => false,
        }
    }

    /// Message of the captured init failure, if the last init failed.
    pub async fn init_error(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .init_error
            .as_ref()
            .map(|e| e.to_string())
    }

    /// The live engine handle, for status and trigger queries.
    pub async fn engine(&self) -> Result<Arc<dyn EngineHandle>, EngineError> {
        self.current_engine()
            .await
            .ok_or(EngineError::NotInitialized)
    }

    /// Display name: the engine's qualified name when initialized, otherwise
    /// the configured name, otherwise the config id.
    pub async fn name_and_id(&self) -> String {
        if let Some(engine) = self.current_engine().await {
            if let Ok(meta) = engine.metadata().await {
                return meta.name_and_id();
            }
        }

        let text = self.config_text().await;
        ConfigProps::parse(&text)
            .ok()
            .and_then(|p| p.get(NAME_KEY).map(str::to_string))
            .unwrap_or_else(|| self.config_id.to_string())
    }

    async fn current_engine(&self) -> Option<Arc<dyn EngineHandle>> {
        self.inner.lock().await.engine.clone()
    }
}
