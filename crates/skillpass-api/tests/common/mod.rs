//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use skillpass_catalog::ModuleCatalog;
use skillpass_core::clock::Clock;
use skillpass_event_store::pg_audit_log::PgAuditLog;
use skillpass_event_store::pg_completion_store::PgCompletionStore;
use skillpass_event_store::pg_event_repository::PgEventRepository;
use skillpass_test_support::{FixedClock, RecordingNarrator};
use skillpass_training::application::outbox::{OutboxSinks, ProgressOutbox, RetryPolicy};
use skillpass_training::application::session::TrainingServices;
use skillpass_training::application::variations::AuthoredVariationGenerator;
use sqlx::PgPool;
use tower::ServiceExt;

use skillpass_api::routes;
use skillpass_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app over PostgreSQL-backed collaborators with a fixed
/// clock. Uses the same route structure as `main.rs`. The returned outbox
/// lets tests wait for queued writes.
pub fn build_test_app(pool: PgPool) -> (Router, ProgressOutbox) {
    let event_repository = Arc::new(PgEventRepository::new(pool.clone()));
    let completions = Arc::new(PgCompletionStore::new(pool.clone()));
    let outbox = ProgressOutbox::spawn(
        OutboxSinks {
            events: event_repository.clone(),
            completions: completions.clone(),
            audit: Arc::new(PgAuditLog::new(pool)),
        },
        RetryPolicy::default(),
    );
    let services = TrainingServices {
        catalog: Arc::new(ModuleCatalog::builtin().unwrap()),
        retake_lookup: completions,
        variations: Arc::new(AuthoredVariationGenerator),
        narrator: Arc::new(RecordingNarrator::default()),
        outbox: outbox.clone(),
        clock: fixed_clock(),
    };
    let app_state = AppState::new(services, event_repository);

    (routes::api_router().with_state(app_state), outbox)
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
pub async fn post_json(
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
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
