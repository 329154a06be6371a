//! API response types.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::{JobDetail, ListenerInfo, TriggerDetail};
use crate::service::SchedulerStatus;

/// Placeholder for values that are not applicable in the current state.
const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for values the engine failed to report.
const SCHEDULER_ERROR: &str = "Scheduler Error";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// One dashboard row for a scheduler instance.
///
/// Unknown values render as `N/A`; values the engine failed to report
/// render as `Scheduler Error` with the problem flag set.
#[derive(Debug, Serialize)]
pub struct SchedulerStatusResponse {
    pub config_id: String,
    pub name: String,
    pub initialized: String,
    pub started: String,
    pub standby: String,
    pub job_count: String,
    pub running_since: String,
    pub init_error: Option<String>,
    pub problem: bool,
}

fn render_flag(value: Option<bool>, problem: bool) -> String {
    render(value.map(|b| b.to_string()), problem)
}

fn render(value: Option<String>, problem: bool) -> String {
    match value {
        Some(v) => v,
        None if problem => SCHEDULER_ERROR.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

impl From<SchedulerStatus> for SchedulerStatusResponse {
    fn from(status: SchedulerStatus) -> Self {
        if status.init_error.is_some() {
            return Self {
                config_id: status.config_id.to_string(),
                name: status.name,
                initialized: NOT_AVAILABLE.to_string(),
                started: NOT_AVAILABLE.to_string(),
                standby: NOT_AVAILABLE.to_string(),
                job_count: NOT_AVAILABLE.to_string(),
                running_since: NOT_AVAILABLE.to_string(),
                init_error: status.init_error,
                problem: false,
            };
        }

        if !status.initialized {
            return Self {
                config_id: status.config_id.to_string(),
                name: status.name,
                initialized: "false".to_string(),
                started: NOT_AVAILABLE.to_string(),
                standby: NOT_AVAILABLE.to_string(),
                job_count: NOT_AVAILABLE.to_string(),
                running_since: NOT_AVAILABLE.to_string(),
                init_error: None,
                problem: false,
            };
        }

        Self {
            config_id: status.config_id.to_string(),
            name: status.name,
            initialized: "true".to_string(),
            started: render_flag(status.started, status.problem),
            standby: render_flag(status.standby, status.problem),
            job_count: render(status.job_count.map(|c| c.to_string()), status.problem),
            running_since: render(
                status.running_since.map(|t| t.to_rfc3339()),
                status.problem,
            ),
            init_error: None,
            problem: status.problem,
        }
    }
}

/// Dashboard list of all scheduler instances.
#[derive(Debug, Serialize)]
pub struct SchedulerListResponse {
    pub schedulers: Vec<SchedulerStatusResponse>,
    pub count: usize,
}

/// Response to scheduler creation.
#[derive(Debug, Serialize)]
pub struct CreateSchedulerResponse {
    pub config_id: String,
    pub message: String,
}

/// Raw configuration text of one instance.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_id: String,
    pub config: String,
}

/// Generic operation acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Scheduler detail page: status row plus the metadata projection.
#[derive(Debug, Serialize)]
pub struct SchedulerDetailResponse {
    pub status: SchedulerStatusResponse,
    pub detail: BTreeMap<String, String>,
}

/// One-line metadata summary.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub config_id: String,
    pub summary: String,
}

/// A trigger with its live state.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub key: String,
    pub job_key: String,
    pub schedule: String,
    pub state: String,
    pub previous_fire_time: Option<String>,
    pub next_fire_time: Option<String>,
    pub times_fired: u64,
}

impl From<TriggerDetail> for TriggerResponse {
    fn from(detail: TriggerDetail) -> Self {
        Self {
            key: detail.key.to_string(),
            job_key: detail.job_key.to_string(),
            schedule: detail.schedule,
            state: format!("{:?}", detail.state).to_lowercase(),
            previous_fire_time: detail.previous_fire_time.map(|t| t.to_rfc3339()),
            next_fire_time: detail.next_fire_time.map(|t| t.to_rfc3339()),
            times_fired: detail.times_fired,
        }
    }
}

/// One job with its triggers.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub key: String,
    pub description: Option<String>,
    pub triggers: Vec<TriggerResponse>,
}

impl JobResponse {
    pub fn new(job: JobDetail, triggers: Vec<TriggerDetail>) -> Self {
        Self {
            key: job.key.to_string(),
            description: job.description,
            triggers: triggers.into_iter().map(TriggerResponse::from).collect(),
        }
    }
}

/// Jobs registered in one instance.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub config_id: String,
    pub jobs: Vec<JobResponse>,
    pub count: usize,
}

/// Listeners registered on one instance.
#[derive(Debug, Serialize)]
pub struct ListenerListResponse {
    pub config_id: String,
    pub listeners: Vec<ListenerInfo>,
    pub count: usize,
}

/// Result of a pause-all / resume-all operation: the triggers whose state
/// changed.
#[derive(Debug, Serialize)]
pub struct TriggerBatchResponse {
    pub message: String,
    pub triggers: Vec<TriggerResponse>,
    pub count: usize,
}
