//! On-demand status projection for one scheduler instance.
//!
//! A status snapshot is computed from the live engine handle at read time,
//! never cached. Engine failures during the projection degrade the affected
//! fields and set a problem flag; they never escape to the caller, so one
//! broken instance cannot abort enumeration of the others.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::SchedulerService;
use crate::core::types::ConfigId;
use crate::engine::EngineMeta;

/// Human-facing status of one scheduler instance.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    /// The instance's config id.
    pub config_id: ConfigId,
    /// Display name (engine name + instance id when initialized).
    pub name: String,
    /// Whether an engine handle is present.
    pub initialized: bool,
    /// Whether the engine is started. None when unknown or unavailable.
    pub started: Option<bool>,
    /// Whether the engine is in standby. None when unknown or unavailable.
    pub standby: Option<bool>,
    /// Number of registered jobs. None when unknown or unavailable.
    pub job_count: Option<usize>,
    /// When the engine was first started. None when never started or unknown.
    pub running_since: Option<DateTime<Utc>>,
    /// Message of the captured init failure, if any.
    pub init_error: Option<String>,
    /// Set when the engine errored while answering status queries.
    pub problem: bool,
}

impl SchedulerStatus {
    /// Capture the current status of `service`.
    pub async fn capture(service: &SchedulerService) -> Self {
        let config_id = service.config_id().clone();
        let name = service.name_and_id().await;

        let mut status = Self {
            config_id,
            name,
            initialized: false,
            started: None,
            standby: None,
            job_count: None,
            running_since: None,
            init_error: None,
            problem: false,
        };

        if let Some(message) = service.init_error().await {
            status.init_error = Some(message);
            return status;
        }

        let engine = match service.engine().await {
            Ok(engine) => engine,
            Err(_) => return status,
        };
        status.initialized = true;

        match engine.is_started().await {
            Ok(started) => status.started = Some(started),
            Err(e) => {
                tracing::error!(config_id = %status.config_id, error = %e, "failed to query started state");
                status.problem = true;
            }
        }

        match engine.is_standby().await {
            Ok(standby) => status.standby = Some(standby),
            Err(e) => {
                tracing::error!(config_id = %status.config_id, error = %e, "failed to query standby state");
                status.problem = true;
            }
        }

        match engine.all_jobs().await {
            Ok(jobs) => status.job_count = Some(jobs.len()),
            Err(e) => {
                tracing::error!(config_id = %status.config_id, error = %e, "failed to query jobs");
                status.problem = true;
            }
        }

        match engine.metadata().await {
            Ok(meta) => status.running_since = meta.running_since,
            Err(e) => {
                tracing::error!(config_id = %status.config_id, error = %e, "failed to query engine metadata");
                status.problem = true;
            }
        }

        status
    }
}

/// Project engine metadata into an ordered key/value map for display.
///
/// Fields are enumerated explicitly; nothing is discovered dynamically.
pub fn detail_map(meta: &EngineMeta) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("Name".to_string(), meta.name.clone());
    map.insert("InstanceId".to_string(), meta.instance_id.clone());
    map.insert("Version".to_string(), meta.version.clone());
    map.insert("State".to_string(), meta.state.clone());
    map.insert(
        "RunningSince".to_string(),
        meta.running_since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    );
    map.insert("JobCount".to_string(), meta.job_count.to_string());
    map.insert("FiredCount".to_string(), meta.fired_count.to_string());
    map.insert(
        "TickInterval".to_string(),
        format!("{}ms", meta.tick_interval.as_millis()),
    );
    map
}
