//! Per-instance lifecycle transitions and failure capture.

use schedhub::{
    EngineError, EngineHandle, JobKey, LocalEngineFactory, MemoryConfigStore, SchedulerContainer,
    SchedulerStatus,
};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{minimal_config, sample_config, wait_for};

fn container() -> SchedulerContainer {
    SchedulerContainer::new(
        Arc::new(MemoryConfigStore::new()),
        Arc::new(LocalEngineFactory),
    )
}

#[tokio::test]
async fn manual_instance_walks_the_full_state_machine() {
    let container = container();
    let id = container
        .create_scheduler(&minimal_config("walker"))
        .await
        .unwrap();
    let service = container.get_scheduler_service(&id).await.unwrap();

    // Created uninitialized.
    assert!(!service.is_initialized().await);

    // init -> initialized (standby, not started).
    service.init().await.unwrap();
    assert!(service.is_initialized().await);
    assert!(service.is_standby().await);
    assert!(!service.is_started().await);

    // start -> started.
    service.start().await.unwrap();
    assert!(service.is_started().await);

    // standby -> standby again.
    service.standby().await.unwrap();
    assert!(service.is_standby().await);

    // start again from standby.
    service.start().await.unwrap();
    assert!(service.is_started().await);

    // shutdown -> back to uninitialized.
    service.shutdown().await.unwrap();
    assert!(!service.is_initialized().await);

    // A fresh init succeeds on the same service object.
    service.init().await.unwrap();
    assert!(service.is_initialized().await);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_config_degrades_instead_of_failing_creation() {
    let container = container();

    // Creation itself succeeds even though the text cannot build an engine.
    let id = container
        .create_scheduler("schedhub.autoStart=true\njob.broken.schedule=not-a-schedule\n")
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    assert!(!service.is_initialized().await);
    assert!(service.init_error().await.is_some());

    // The instance is still listed, flagged with its init error.
    let status = SchedulerStatus::capture(&service).await;
    assert!(!status.initialized);
    assert!(status.init_error.is_some());
    assert!(!status.problem);
}

#[tokio::test]
async fn reinit_after_fix_clears_the_captured_error() {
    let container = container();
    let id = container
        .create_scheduler("job.broken.schedule=not-a-schedule\n")
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    assert!(service.init().await.is_err());
    assert!(service.init_error().await.is_some());

    // Fix the configuration; the swapped-in replacement initializes cleanly.
    container
        .modify_scheduler(&id, &minimal_config("fixed"))
        .await
        .unwrap();

    let fixed = container.get_scheduler_service(&id).await.unwrap();
    fixed.init().await.unwrap();
    assert!(fixed.init_error().await.is_none());
    assert!(fixed.is_initialized().await);

    fixed.shutdown().await.unwrap();
}

#[tokio::test]
async fn started_instance_fires_its_triggers() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("firing", true))
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    let engine = service.engine().await.unwrap();

    let job = JobKey::new("heartbeat");
    wait_for(
        || {
            let engine = Arc::clone(&engine);
            let job = job.clone();
            async move {
                engine
                    .triggers_of_job(&job)
                    .await
                    .map(|t| t[0].times_fired >= 1)
                    .unwrap_or(false)
            }
        },
        Duration::from_secs(5),
        "heartbeat trigger to fire",
    )
    .await;

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn standby_instance_stops_firing() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("pausing", true))
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    service.standby().await.unwrap();

    let engine = service.engine().await.unwrap();
    let fired_before = engine
        .triggers_of_job(&JobKey::new("heartbeat"))
        .await
        .unwrap()[0]
        .times_fired;

    tokio::time::sleep(Duration::from_millis(1300)).await;

    let fired_after = engine
        .triggers_of_job(&JobKey::new("heartbeat"))
        .await
        .unwrap()[0]
        .times_fired;
    assert_eq!(fired_before, fired_after);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn lifecycle_ops_without_engine_report_not_initialized() {
    let container = container();
    let id = container
        .create_scheduler(&minimal_config("cold"))
        .await
        .unwrap();
    let service = container.get_scheduler_service(&id).await.unwrap();

    assert!(matches!(
        service.start().await,
        Err(EngineError::NotInitialized)
    ));
    assert!(matches!(
        service.standby().await,
        Err(EngineError::NotInitialized)
    ));
    assert!(matches!(
        service.shutdown().await,
        Err(EngineError::NotInitialized)
    ));
}

#[tokio::test]
async fn status_snapshot_reflects_live_state() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("snapshot", false))
        .await
        .unwrap();
    let service = container.get_scheduler_service(&id).await.unwrap();

    let before = SchedulerStatus::capture(&service).await;
    assert!(!before.initialized);
    assert_eq!(before.started, None);

    service.init().await.unwrap();
    service.start().await.unwrap();

    let after = SchedulerStatus::capture(&service).await;
    assert!(after.initialized);
    assert_eq!(after.started, Some(true));
    assert_eq!(after.job_count, Some(1));
    assert!(after.running_since.is_some());

    service.shutdown().await.unwrap();
}
