//! In-memory application state and request helpers for route tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use skillpass_catalog::ModuleCatalog;
use skillpass_core::ports::RetakeStatus;
use skillpass_core::repository::EventRepository;
use skillpass_test_support::{
    EmptyEventRepository, FixedClock, RecordingAuditLog, RecordingCompletionStore,
    RecordingEventRepository, RecordingNarrator, StubRetakeLookup,
};
use skillpass_training::application::outbox::{OutboxSinks, ProgressOutbox, RetryPolicy};
use skillpass_training::application::session::TrainingServices;
use skillpass_training::application::variations::AuthoredVariationGenerator;
use tower::ServiceExt;

use crate::state::AppState;

/// Recording collaborators behind a test state.
pub(crate) struct TestDoubles {
    pub(crate) events: Arc<RecordingEventRepository>,
    pub(crate) completions: Arc<RecordingCompletionStore>,
    pub(crate) audit: Arc<RecordingAuditLog>,
    pub(crate) narrator: Arc<RecordingNarrator>,
}

/// State over the built-in catalog and recording doubles. Must be called
/// from within a tokio runtime.
pub(crate) fn test_app_with(
    retake: RetakeStatus,
    event_repository: Arc<dyn EventRepository>,
) -> (AppState, TestDoubles) {
    let doubles = TestDoubles {
        events: Arc::new(RecordingEventRepository::new(Ok(vec![]))),
        completions: Arc::new(RecordingCompletionStore::default()),
        audit: Arc::new(RecordingAuditLog::default()),
        narrator: Arc::new(RecordingNarrator::default()),
    };
    let outbox = ProgressOutbox::spawn(
        OutboxSinks {
            events: doubles.events.clone(),
            completions: doubles.completions.clone(),
            audit: doubles.audit.clone(),
        },
        RetryPolicy::default(),
    );
    let services = TrainingServices {
        catalog: Arc::new(ModuleCatalog::builtin().unwrap()),
        retake_lookup: Arc::new(StubRetakeLookup(retake)),
        variations: Arc::new(AuthoredVariationGenerator),
        narrator: doubles.narrator.clone(),
        outbox,
        clock: Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )),
    };
    (AppState::new(services, event_repository), doubles)
}

/// First-attempt state with an empty run history.
pub(crate) fn test_app_state() -> AppState {
    test_app_with(RetakeStatus::FIRST_ATTEMPT, Arc::new(EmptyEventRepository)).0
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };
    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub(crate) async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub(crate) async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub(crate) async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub(crate) async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
