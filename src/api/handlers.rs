//! API request handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::container::SchedulerContainer;
use crate::core::types::ConfigId;
use crate::service::{detail_map, SchedulerStatus};

use super::errors::ApiError;
use super::responses::{
    ConfigResponse, CreateSchedulerResponse, HealthResponse, JobListResponse, JobResponse,
    ListenerListResponse, MessageResponse, SchedulerDetailResponse, SchedulerListResponse,
    SchedulerStatusResponse, SummaryResponse, TriggerBatchResponse, TriggerResponse,
};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub container: Arc<SchedulerContainer>,
}

/// Request body carrying configuration text.
#[derive(Debug, Deserialize)]
pub struct ConfigPayload {
    pub config: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Dashboard list: status of every registered scheduler.
pub async fn list_schedulers(State(state): State<ApiState>) -> Json<SchedulerListResponse> {
    let mut schedulers = Vec::new();
    for config_id in state.container.all_config_ids().await {
        // An instance deleted mid-enumeration is simply skipped.
        if let Ok(service) = state.container.get_scheduler_service(&config_id).await {
            let status = SchedulerStatus::capture(&service).await;
            schedulers.push(SchedulerStatusResponse::from(status));
        }
    }
    let count = schedulers.len();
    Json(SchedulerListResponse { schedulers, count })
}

/// Create a new scheduler from configuration text.
pub async fn create_scheduler(
    State(state): State<ApiState>,
    Json(payload): Json<ConfigPayload>,
) -> Result<(StatusCode, Json<CreateSchedulerResponse>), ApiError> {
    let config_id = state.container.create_scheduler(&payload.config).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSchedulerResponse {
            config_id: config_id.to_string(),
            message: "scheduler created".to_string(),
        }),
    ))
}

/// Scheduler detail: status row plus the metadata projection.
pub async fn get_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<SchedulerDetailResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;

    let status = SchedulerStatus::capture(&service).await;
    let detail = match service.engine().await {
        Ok(engine) => engine
            .metadata()
            .await
            .map(|meta| detail_map(&meta))
            .unwrap_or_default(),
        Err(_) => BTreeMap::new(),
    };

    Ok(Json(SchedulerDetailResponse {
        status: status.into(),
        detail,
    }))
}

/// Read the persisted configuration text.
pub async fn get_scheduler_config(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let config = state.container.get_scheduler_config(&config_id).await?;
    Ok(Json(ConfigResponse {
        config_id: config_id.to_string(),
        config,
    }))
}

/// Replace the configuration of an existing scheduler.
pub async fn modify_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
    Json(payload): Json<ConfigPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    state
        .container
        .modify_scheduler(&config_id, &payload.config)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("scheduler {} modified", config_id),
    }))
}

/// Delete a scheduler. The instance must be shut down first.
pub async fn delete_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    state.container.delete_scheduler(&config_id).await?;
    Ok(Json(MessageResponse {
        message: format!("scheduler {} deleted", config_id),
    }))
}

/// Initialize a scheduler; auto-starts it when so configured.
///
/// An init failure is captured on the service and reported in the message
/// rather than failing the request, so the dashboard keeps listing the
/// degraded instance.
pub async fn init_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;

    match service.init().await {
        Ok(()) => {
            if service.is_auto_start().await {
                service.start().await.map_err(ApiError::from)?;
            }
            Ok(Json(MessageResponse {
                message: format!("scheduler {} initialized", config_id),
            }))
        }
        Err(e) => Ok(Json(MessageResponse {
            message: format!("scheduler {} initialization failed: {}", config_id, e),
        })),
    }
}

/// Start a scheduler.
pub async fn start_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    service.start().await.map_err(ApiError::from)?;
    Ok(Json(MessageResponse {
        message: format!("scheduler {} started", config_id),
    }))
}

/// Place a scheduler in standby.
pub async fn standby_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    service.standby().await.map_err(ApiError::from)?;
    Ok(Json(MessageResponse {
        message: format!("scheduler {} placed in standby", config_id),
    }))
}

/// Shut a scheduler down.
pub async fn shutdown_scheduler(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    service.shutdown().await.map_err(ApiError::from)?;
    Ok(Json(MessageResponse {
        message: format!("scheduler {} shut down", config_id),
    }))
}

/// One-line metadata summary of an initialized scheduler.
pub async fn get_summary(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    let engine = service.engine().await.map_err(ApiError::from)?;
    let meta = engine.metadata().await.map_err(ApiError::from)?;
    Ok(Json(SummaryResponse {
        config_id: config_id.to_string(),
        summary: meta.summary(),
    }))
}

/// Jobs registered in an initialized scheduler, with their triggers.
pub async fn list_jobs(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<JobListResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    let engine = service.engine().await.map_err(ApiError::from)?;

    let mut jobs = Vec::new();
    for job in engine.all_jobs().await.map_err(ApiError::from)? {
        let triggers = engine
            .triggers_of_job(&job.key)
            .await
            .map_err(ApiError::from)?;
        jobs.push(JobResponse::new(job, triggers));
    }

    let count = jobs.len();
    Ok(Json(JobListResponse {
        config_id: config_id.to_string(),
        jobs,
        count,
    }))
}

/// Listeners registered on an initialized scheduler.
pub async fn list_listeners(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<ListenerListResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    let engine = service.engine().await.map_err(ApiError::from)?;
    let listeners = engine.listeners().await.map_err(ApiError::from)?;
    let count = listeners.len();
    Ok(Json(ListenerListResponse {
        config_id: config_id.to_string(),
        listeners,
        count,
    }))
}

/// Pause all triggers; returns the triggers that were not already paused.
pub async fn pause_all_triggers(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<TriggerBatchResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    let engine = service.engine().await.map_err(ApiError::from)?;
    let paused = engine.pause_all_triggers().await.map_err(ApiError::from)?;

    let triggers: Vec<TriggerResponse> = paused.into_iter().map(TriggerResponse::from).collect();
    let count = triggers.len();
    Ok(Json(TriggerBatchResponse {
        message: format!("paused {} triggers", count),
        triggers,
        count,
    }))
}

/// Resume all triggers; returns the triggers that were paused.
pub async fn resume_all_triggers(
    State(state): State<ApiState>,
    Path(config_id): Path<String>,
) -> Result<Json<TriggerBatchResponse>, ApiError> {
    let config_id = ConfigId::new(config_id);
    let service = state.container.get_scheduler_service(&config_id).await?;
    let engine = service.engine().await.map_err(ApiError::from)?;
    let resumed = engine.resume_all_triggers().await.map_err(ApiError::from)?;

    let triggers: Vec<TriggerResponse> = resumed.into_iter().map(TriggerResponse::from).collect();
    let count = triggers.len();
    Ok(Json(TriggerBatchResponse {
        message: format!("resumed {} triggers", count),
        triggers,
        count,
    }))
}
