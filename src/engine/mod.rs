//! Boundary with the scheduling engine.
//!
//! The console manages engine instances only through the [`EngineHandle`]
//! and [`EngineFactory`] traits defined here. [`LocalEngine`] is the
//! in-process default implementation; an adapter for any other engine can
//! be dropped in behind the same traits.

mod local;
mod schedule;

pub use local::{LocalEngine, LocalEngineFactory};
pub use schedule::{Schedule, ScheduleError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::props::ConfigProps;
use crate::core::types::{JobKey, TriggerKey};

/// Errors raised by engine construction and engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The configuration text cannot produce an engine.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// An operation needs an engine handle but none is present.
    #[error("scheduler engine is not initialized")]
    NotInitialized,

    /// The engine has been shut down and cannot serve the operation.
    #[error("scheduler engine has been shut down")]
    Shutdown,

    /// No such job in this engine instance.
    #[error("job not found: {0}")]
    JobNotFound(JobKey),

    /// No such trigger in this engine instance.
    #[error("trigger not found: {0}")]
    TriggerNotFound(TriggerKey),

    /// The engine's control channel is gone.
    #[error("engine command channel closed: {0}")]
    ChannelClosed(String),
}

/// Pause state of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerState {
    /// Trigger fires on schedule.
    Normal,
    /// Trigger is paused and will not fire.
    Paused,
}

/// Static and runtime information about one engine instance.
#[derive(Debug, Clone)]
pub struct EngineMeta {
    /// Configured engine name.
    pub name: String,
    /// Random per-build instance id.
    pub instance_id: String,
    /// Engine implementation version.
    pub version: String,
    /// Current lifecycle state label.
    pub state: String,
    /// When the engine was first started, if ever.
    pub running_since: Option<DateTime<Utc>>,
    /// Number of registered jobs.
    pub job_count: usize,
    /// Total trigger fires since the engine was built.
    pub fired_count: u64,
    /// Tick interval of the scheduling loop.
    pub tick_interval: Duration,
}

impl EngineMeta {
    /// Engine name qualified with its instance id.
    pub fn name_and_id(&self) -> String {
        format!("{}_{}", self.name, self.instance_id)
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let since = self
            .running_since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never started".to_string());
        format!(
            "{} v{} ({}): {} jobs, {} fires, running since {}",
            self.name_and_id(),
            self.version,
            self.state,
            self.job_count,
            self.fired_count,
            since
        )
    }
}

/// A job registered in an engine instance.
#[derive(Debug, Clone)]
pub struct JobDetail {
    /// Job identifier.
    pub key: JobKey,
    /// Optional human-readable description.
    pub description: Option<String>,
}

/// A trigger attached to a job, with its live state.
#[derive(Debug, Clone)]
pub struct TriggerDetail {
    /// Trigger identifier.
    pub key: TriggerKey,
    /// Job this trigger fires.
    pub job_key: JobKey,
    /// Schedule expression.
    pub schedule: String,
    /// Pause state.
    pub state: TriggerState,
    /// Last fire time, if the trigger has fired.
    pub previous_fire_time: Option<DateTime<Utc>>,
    /// Next scheduled fire time, if any.
    pub next_fire_time: Option<DateTime<Utc>>,
    /// Total number of fires.
    pub times_fired: u64,
}

/// A listener registered on an engine instance.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerInfo {
    /// Listener name.
    pub name: String,
    /// Listener kind label (e.g. "logging", "noop").
    pub kind: String,
}

/// Callback surface for engine lifecycle and trigger activity.
///
/// Custom behavior hooks into the engine through this trait rather than
/// through subclassing; [`NoopListener`] and [`LoggingListener`] cover the
/// common cases.
#[async_trait]
pub trait EngineListener: Send + Sync {
    /// Listener name as reported by `EngineHandle::listeners`.
    fn name(&self) -> &str;

    /// Kind label as reported by `EngineHandle::listeners`.
    fn kind(&self) -> &str;

    /// The engine transitioned to started.
    async fn on_start(&self) {}

    /// The engine transitioned to standby.
    async fn on_standby(&self) {}

    /// The engine shut down.
    async fn on_shutdown(&self) {}

    /// A trigger fired.
    async fn on_trigger_fired(&self, _trigger: &TriggerKey, _job: &JobKey) {}
}

/// Listener that ignores every event.
pub struct NoopListener {
    name: String,
}

impl NoopListener {
    /// Create a no-op listener with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EngineListener for NoopListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "noop"
    }
}

/// Listener that logs every event through `tracing`.
pub struct LoggingListener {
    name: String,
}

impl LoggingListener {
    /// Create a logging listener with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EngineListener for LoggingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "logging"
    }

    async fn on_start(&self) {
        tracing::info!(listener = %self.name, "engine started");
    }

    async fn on_standby(&self) {
        tracing::info!(listener = %self.name, "engine placed in standby");
    }

    async fn on_shutdown(&self) {
        tracing::info!(listener = %self.name, "engine shut down");
    }

    async fn on_trigger_fired(&self, trigger: &TriggerKey, job: &JobKey) {
        tracing::info!(listener = %self.name, trigger = %trigger, job = %job, "trigger fired");
    }
}

/// Handle to one live engine instance.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Start firing triggers.
    async fn start(&self) -> Result<(), EngineError>;

    /// Stop firing triggers but keep the engine alive.
    async fn standby(&self) -> Result<(), EngineError>;

    /// Shut the engine down. The handle cannot be restarted afterwards.
    async fn shutdown(&self) -> Result<(), EngineError>;

    /// Whether the engine is currently started.
    async fn is_started(&self) -> Result<bool, EngineError>;

    /// Whether the engine is in standby mode.
    async fn is_standby(&self) -> Result<bool, EngineError>;

    /// Whether the engine has been shut down.
    async fn is_shutdown(&self) -> Result<bool, EngineError>;

    /// Snapshot of engine metadata.
    async fn metadata(&self) -> Result<EngineMeta, EngineError>;

    /// All jobs registered in this engine.
    async fn all_jobs(&self) -> Result<Vec<JobDetail>, EngineError>;

    /// Triggers attached to one job.
    async fn triggers_of_job(&self, job: &JobKey) -> Result<Vec<TriggerDetail>, EngineError>;

    /// Pause state of one trigger.
    async fn trigger_state(&self, trigger: &TriggerKey) -> Result<TriggerState, EngineError>;

    /// Pause all triggers. Returns the triggers that were not already paused.
    async fn pause_all_triggers(&self) -> Result<Vec<TriggerDetail>, EngineError>;

    /// Resume all triggers. Returns the triggers that were paused.
    async fn resume_all_triggers(&self) -> Result<Vec<TriggerDetail>, EngineError>;

    /// Listeners registered on this engine.
    async fn listeners(&self) -> Result<Vec<ListenerInfo>, EngineError>;
}

/// Builds engine handles from configuration properties.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Build a fresh engine instance from parsed configuration.
    async fn build(&self, props: &ConfigProps) -> Result<Arc<dyn EngineHandle>, EngineError>;
}
