//! Container registry invariants under create, modify and delete.

use schedhub::{
    ConfigId, ContainerError, EngineHandle, LocalEngineFactory, MemoryConfigStore,
    SchedulerContainer,
};
use std::sync::Arc;

use crate::common::{minimal_config, sample_config};

fn container() -> Arc<SchedulerContainer> {
    Arc::new(SchedulerContainer::new(
        Arc::new(MemoryConfigStore::new()),
        Arc::new(LocalEngineFactory),
    ))
}

#[tokio::test]
async fn created_id_is_visible_immediately_and_uninitialized() {
    let container = container();

    let id = container
        .create_scheduler(&minimal_config("visible"))
        .await
        .unwrap();

    assert!(container.all_config_ids().await.contains(&id));
    let service = container.get_scheduler_service(&id).await.unwrap();
    assert!(!service.is_initialized().await);
    assert!(!service.is_started().await);
}

#[tokio::test]
async fn auto_start_config_comes_up_started() {
    let container = container();

    let id = container
        .create_scheduler(&sample_config("autostarted", true))
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    assert!(service.is_initialized().await);
    assert!(service.is_started().await);
}

#[tokio::test]
async fn modify_round_trips_text_and_preserves_id() {
    let container = container();
    let id = container
        .create_scheduler(&minimal_config("before"))
        .await
        .unwrap();

    let new_text = sample_config("after", false);
    container.modify_scheduler(&id, &new_text).await.unwrap();

    assert_eq!(
        container.get_scheduler_config(&id).await.unwrap(),
        new_text
    );
    assert_eq!(container.all_config_ids().await, vec![id]);
}

#[tokio::test]
async fn no_two_live_engine_handles_for_one_config_id() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("swapped", true))
        .await
        .unwrap();

    let old_engine = container
        .get_scheduler_service(&id)
        .await
        .unwrap()
        .engine()
        .await
        .unwrap();
    assert!(old_engine.is_started().await.unwrap());

    container
        .modify_scheduler(&id, &sample_config("swapped-v2", true))
        .await
        .unwrap();

    // The old handle must have observed shutdown before the replacement
    // could come up.
    assert!(old_engine.is_shutdown().await.unwrap());

    let new_engine = container
        .get_scheduler_service(&id)
        .await
        .unwrap()
        .engine()
        .await
        .unwrap();
    assert!(new_engine.is_started().await.unwrap());

    container.destroy().await;
}

#[tokio::test]
async fn delete_refuses_running_instance_and_leaves_registry_unchanged() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("busy", true))
        .await
        .unwrap();

    let result = container.delete_scheduler(&id).await;
    assert!(matches!(result, Err(ContainerError::InvalidState { .. })));

    let service = container.get_scheduler_service(&id).await.unwrap();
    assert!(service.is_started().await);
    assert_eq!(container.all_config_ids().await.len(), 1);

    container.destroy().await;
}

#[tokio::test]
async fn delete_after_shutdown_removes_instance_everywhere() {
    let container = container();
    let id = container
        .create_scheduler(&sample_config("done", true))
        .await
        .unwrap();

    let service = container.get_scheduler_service(&id).await.unwrap();
    service.shutdown().await.unwrap();

    container.delete_scheduler(&id).await.unwrap();

    assert!(matches!(
        container.get_scheduler_service(&id).await,
        Err(ContainerError::NotFound(_))
    ));
    assert!(matches!(
        container.get_scheduler_config(&id).await,
        Err(ContainerError::NotFound(_))
    ));
    assert!(container.all_config_ids().await.is_empty());
}

#[tokio::test]
async fn unknown_config_id_is_not_found() {
    let container = container();
    let ghost = ConfigId::new("ghost");

    assert!(matches!(
        container.get_scheduler_service(&ghost).await,
        Err(ContainerError::NotFound(_))
    ));
    assert!(matches!(
        container.modify_scheduler(&ghost, "engine.name=x\n").await,
        Err(ContainerError::NotFound(_))
    ));
    assert!(matches!(
        container.delete_scheduler(&ghost).await,
        Err(ContainerError::NotFound(_))
    ));
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids_and_both_register() {
    let container = container();

    let mut handles = vec![];
    for i in 0..8 {
        let container = Arc::clone(&container);
        handles.push(tokio::spawn(async move {
            container
                .create_scheduler(&minimal_config(&format!("concurrent-{}", i)))
                .await
        }));
    }

    let mut ids = vec![];
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    let registered = container.all_config_ids().await;
    assert_eq!(registered.len(), 8);
    for id in &ids {
        assert!(registered.contains(id));
    }

    // Ids are unique.
    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}

#[tokio::test]
async fn destroy_tears_down_every_running_instance() {
    let container = container();
    let mut ids = vec![];
    for i in 0..3 {
        ids.push(
            container
                .create_scheduler(&sample_config(&format!("teardown-{}", i), true))
                .await
                .unwrap(),
        );
    }

    container.destroy().await;

    for id in ids {
        let service = container.get_scheduler_service(&id).await.unwrap();
        assert!(!service.is_initialized().await);
    }
}
