//! Registry and lifecycle coordinator for all scheduler instances.
//!
//! The container exclusively owns the registry and every service in it;
//! callers only ever receive shared references for read and operation
//! calls. Structural mutations (create, modify, delete) are serialized
//! against each other; engine calls never run under the registry lock, so
//! a slow engine cannot stall enumeration.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::core::types::ConfigId;
use crate::engine::{EngineError, EngineFactory};
use crate::service::SchedulerService;
use crate::store::{ConfigStore, StoreError};

/// Errors raised by container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No scheduler is registered under the given config id.
    #[error("no scheduler registered under config id: {0}")]
    NotFound(ConfigId),

    /// The operation is not permitted in the instance's current state.
    #[error("scheduler {config_id}: {reason}")]
    InvalidState {
        /// The affected instance.
        config_id: ConfigId,
        /// Why the operation was refused.
        reason: String,
    },

    /// The engine rejected or failed an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The config store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry of scheduler instances keyed by config id.
pub struct SchedulerContainer {
    store: Arc<dyn ConfigStore>,
    factory: Arc<dyn EngineFactory>,
    registry: RwLock<BTreeMap<ConfigId, Arc<SchedulerService>>>,
    /// Serializes create/modify/delete against each other.
    mutate: Mutex<()>,
}

impl SchedulerContainer {
    /// Create an empty container over the given store and engine factory.
    pub fn new(store: Arc<dyn ConfigStore>, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            store,
            factory,
            registry: RwLock::new(BTreeMap::new()),
            mutate: Mutex::new(()),
        }
    }

    /// Rebuild the registry from the config store.
    ///
    /// One uninitialized service is registered per persisted config id;
    /// instances whose configuration requests auto-start are then
    /// initialized and started. Per-instance init failures are captured by
    /// the service, not propagated.
    pub async fn init(&self) -> Result<(), ContainerError> {
        let ids = self.store.list_config_ids().await?;

        let mut services = Vec::with_capacity(ids.len());
        {
            let _guard = self.mutate.lock().await;
            for config_id in ids {
                let text = self.store.load(&config_id).await?;
                let service = Arc::new(SchedulerService::new(
                    config_id.clone(),
                    text,
                    Arc::clone(&self.factory),
                ));
                self.registry
                    .write()
                    .await
                    .insert(config_id, Arc::clone(&service));
                services.push(service);
            }
        }
        tracing::info!(count = services.len(), "scheduler registry restored");

        for service in &services {
            self.auto_start(service).await;
        }
        Ok(())
    }

    /// Create a new scheduler from configuration text.
    ///
    /// The generated config id is visible to `all_config_ids` only after
    /// the service is fully constructed and persisted. If the configuration
    /// requests auto-start, the instance is initialized and started before
    /// this call returns; an init failure is captured on the service rather
    /// than failing the creation.
    pub async fn create_scheduler(&self, config_text: &str) -> Result<ConfigId, ContainerError> {
        let service = {
            let _guard = self.mutate.lock().await;
            let config_id = ConfigId::generate();
            self.store.store(&config_id, config_text).await?;

            let service = Arc::new(SchedulerService::new(
                config_id.clone(),
                config_text,
                Arc::clone(&self.factory),
            ));
            self.registry
                .write()
                .await
                .insert(config_id.clone(), Arc::clone(&service));
            tracing::info!(config_id = %config_id, "scheduler created");
            service
        };

        self.auto_start(&service).await;
        Ok(service.config_id().clone())
    }

    /// Replace the configuration of an existing scheduler.
    ///
    /// The old engine handle is fully released before the replacement
    /// service is built; two live handles for the same config id never
    /// coexist. If persisting the new text fails, the old (now shut down)
    /// entry stays registered and the error propagates.
    pub async fn modify_scheduler(
        &self,
        config_id: &ConfigId,
        config_text: &str,
    ) -> Result<(), ContainerError> {
        let replacement = {
            let _guard = self.mutate.lock().await;
            let old = self.lookup(config_id).await?;

            if old.is_initialized().await {
                old.shutdown().await?;
            }

            self.store.store(config_id, config_text).await?;

            let service = Arc::new(SchedulerService::new(
                config_id.clone(),
                config_text,
                Arc::clone(&self.factory),
            ));
            self.registry
                .write()
                .await
                .insert(config_id.clone(), Arc::clone(&service));
            tracing::info!(config_id = %config_id, "scheduler configuration replaced");
            service
        };

        self.auto_start(&replacement).await;
        Ok(())
    }

    /// Remove a scheduler from the registry and the store.
    ///
    /// The instance must already be shut down; the container never shuts a
    /// scheduler down on behalf of a delete, so deletion cannot silently
    /// destroy running work.
    pub async fn delete_scheduler(&self, config_id: &ConfigId) -> Result<(), ContainerError> {
        let _guard = self.mutate.lock().await;
        let service = self.lookup(config_id).await?;

        if service.is_initialized().await {
            return Err(ContainerError::InvalidState {
                config_id: config_id.clone(),
                reason: "scheduler must be shut down before deletion".to_string(),
            });
        }

        self.store.delete(config_id).await?;
        self.registry.write().await.remove(config_id);
        tracing::info!(config_id = %config_id, "scheduler deleted");
        Ok(())
    }

    /// Look up the service registered under a config id.
    pub async fn get_scheduler_service(
        &self,
        config_id: &ConfigId,
    ) -> Result<Arc<SchedulerService>, ContainerError> {
        self.lookup(config_id).await
    }

    /// Read the persisted configuration text for a registered scheduler.
    pub async fn get_scheduler_config(
        &self,
        config_id: &ConfigId,
    ) -> Result<String, ContainerError> {
        self.lookup(config_id).await?;
        Ok(self.store.load(config_id).await?)
    }

    /// All registered config ids, ordered by id.
    pub async fn all_config_ids(&self) -> Vec<ConfigId> {
        self.registry.read().await.keys().cloned().collect()
    }

    /// Shut down every instance that is not already shut down.
    ///
    /// Per-instance failures are logged and skipped so one broken instance
    /// cannot block teardown of the rest.
    pub async fn destroy(&self) {
        let services: Vec<_> = self.registry.read().await.values().cloned().collect();
        for service in services {
            if !service.is_initialized().await {
                continue;
            }
            if let Err(e) = service.shutdown().await {
                tracing::error!(
                    config_id = %service.config_id(),
                    error = %e,
                    "failed to shut down scheduler during container teardown"
                );
            }
        }
        tracing::info!("scheduler container destroyed");
    }

    async fn lookup(&self, config_id: &ConfigId) -> Result<Arc<SchedulerService>, ContainerError> {
        self.registry
            .read()
            .await
            .get(config_id)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(config_id.clone()))
    }

    /// Init + start a service whose configuration requests it. Failures are
    /// captured or logged; creation never fails because of them.
    async fn auto_start(&self, service: &SchedulerService) {
        if !service.is_auto_start().await {
            return;
        }
        if service.init().await.is_ok() {
            if let Err(e) = service.start().await {
                tracing::error!(
                    config_id = %service.config_id(),
                    error = %e,
                    "auto-start failed"
                );
            }
        }
    }
}
