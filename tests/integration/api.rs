//! HTTP API integration tests.
//!
//! Drives the router directly through tower's oneshot without binding a
//! socket.

use schedhub::api::{build_router, create_api_state};
use schedhub::{LocalEngineFactory, MemoryConfigStore, SchedulerContainer};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::{minimal_config, sample_config};

fn test_router() -> (Router, Arc<SchedulerContainer>) {
    let container = Arc::new(SchedulerContainer::new(
        Arc::new(MemoryConfigStore::new()),
        Arc::new(LocalEngineFactory),
    ));
    let router = build_router(create_api_state(Arc::clone(&container)));
    (router, container)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json_body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(router: &Router, config: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/schedulers",
        Some(json!({ "config": config })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["config_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (router, _container) = test_router();

    let (status, body) = send(&router, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn created_scheduler_appears_in_dashboard_list() {
    let (router, _container) = test_router();

    let id = create(&router, &minimal_config("dashboard")).await;

    let (status, body) = send(&router, Method::GET, "/api/schedulers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["schedulers"][0]["config_id"], id.as_str());
    assert_eq!(body["schedulers"][0]["initialized"], "false");
    assert_eq!(body["schedulers"][0]["started"], "N/A");
}

#[tokio::test]
async fn auto_start_row_shows_started_with_job_count() {
    let (router, container) = test_router();

    let id = create(&router, &sample_config("live", true)).await;

    let (_, body) = send(&router, Method::GET, "/api/schedulers", None).await;
    let row = &body["schedulers"][0];
    assert_eq!(row["config_id"], id.as_str());
    assert_eq!(row["initialized"], "true");
    assert_eq!(row["started"], "true");
    assert_eq!(row["job_count"], "1");
    assert_ne!(row["running_since"], "N/A");

    container.destroy().await;
}

#[tokio::test]
async fn detail_endpoint_projects_engine_metadata() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("detailed", true)).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["started"], "true");
    assert_eq!(body["detail"]["Name"], "detailed");
    assert_eq!(body["detail"]["JobCount"], "1");
    assert_eq!(body["detail"]["State"], "started");

    container.destroy().await;
}

#[tokio::test]
async fn config_round_trips_through_get_and_put() {
    let (router, _container) = test_router();
    let id = create(&router, &minimal_config("editable")).await;

    let new_text = sample_config("edited", false);
    let (status, _) = send(
        &router,
        Method::PUT,
        &format!("/api/schedulers/{}/config", id),
        Some(json!({ "config": new_text.as_str() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}/config", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"], new_text.as_str());
    assert_eq!(body["config_id"], id.as_str());
}

#[tokio::test]
async fn lifecycle_endpoints_drive_the_state_machine() {
    let (router, _container) = test_router();
    let id = create(&router, &minimal_config("driven")).await;

    for op in ["init", "start", "standby", "start", "shutdown"] {
        let (status, _) = send(
            &router,
            Method::POST,
            &format!("/api/schedulers/{}/{}", id, op),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "operation {} failed", op);
    }

    // After shutdown the instance is uninitialized again.
    let (_, body) = send(&router, Method::GET, "/api/schedulers", None).await;
    assert_eq!(body["schedulers"][0]["initialized"], "false");
}

#[tokio::test]
async fn start_without_init_is_a_conflict() {
    let (router, _container) = test_router();
    let id = create(&router, &minimal_config("cold")).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/start", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn init_failure_is_reported_not_raised() {
    let (router, _container) = test_router();
    let id = create(&router, "job.bad.schedule=never\n").await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/init", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("initialization failed"));

    // The dashboard row carries the captured error.
    let (_, list) = send(&router, Method::GET, "/api/schedulers", None).await;
    assert!(list["schedulers"][0]["init_error"].is_string());
}

#[tokio::test]
async fn delete_running_scheduler_is_a_conflict() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("undeletable", true)).await;

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/schedulers/{}", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    container.destroy().await;
}

#[tokio::test]
async fn delete_after_shutdown_removes_the_scheduler() {
    let (router, _container) = test_router();
    let id = create(&router, &sample_config("deletable", true)).await;

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/shutdown", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/schedulers/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_scheduler_is_not_found() {
    let (router, _container) = test_router();

    let (status, body) = send(&router, Method::GET, "/api/schedulers/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn jobs_endpoint_lists_jobs_with_triggers() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("jobful", true)).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}/jobs", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["key"], "heartbeat");
    assert_eq!(body["jobs"][0]["description"], "Heartbeat job");
    assert_eq!(body["jobs"][0]["triggers"][0]["state"], "normal");

    container.destroy().await;
}

#[tokio::test]
async fn listeners_endpoint_lists_configured_listeners() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("listening", true)).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}/listeners", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["listeners"][0]["name"], "audit");
    assert_eq!(body["listeners"][0]["kind"], "logging");

    container.destroy().await;
}

#[tokio::test]
async fn pause_all_and_resume_all_report_changed_triggers() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("pausable", true)).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/triggers/pause-all", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["triggers"][0]["state"], "paused");

    // A second pause-all touches nothing.
    let (_, body) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/triggers/pause-all", id),
        None,
    )
    .await;
    assert_eq!(body["count"], 0);

    let (_, body) = send(
        &router,
        Method::POST,
        &format!("/api/schedulers/{}/triggers/resume-all", id),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["triggers"][0]["state"], "normal");

    container.destroy().await;
}

#[tokio::test]
async fn summary_endpoint_describes_the_engine() {
    let (router, container) = test_router();
    let id = create(&router, &sample_config("summarized", true)).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}/summary", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.contains("summarized"));
    assert!(summary.contains("1 jobs"));

    container.destroy().await;
}

#[tokio::test]
async fn summary_of_uninitialized_scheduler_is_a_conflict() {
    let (router, _container) = test_router();
    let id = create(&router, &minimal_config("uninit")).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/schedulers/{}/summary", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}
