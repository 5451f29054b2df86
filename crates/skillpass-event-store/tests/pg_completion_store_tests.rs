//! Integration tests for `PgCompletionStore` and `PgAuditLog`.

use chrono::{TimeZone, Utc};
use skillpass_core::ports::{
    AuditEntry, AuditLog, CompletionStore, RetakeStatus, RetakeStatusLookup,
};
use skillpass_event_store::pg_audit_log::PgAuditLog;
use skillpass_event_store::pg_completion_store::PgCompletionStore;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_candidate_without_completions_is_on_first_attempt(pool: PgPool) {
    let store = PgCompletionStore::new(pool);

    let status = store
        .check_retake_status(Uuid::new_v4(), "mod-constructive-feedback")
        .await
        .unwrap();

    assert_eq!(status, RetakeStatus::FIRST_ATTEMPT);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_each_completion_advances_the_attempt_number(pool: PgPool) {
    // Arrange
    let store = PgCompletionStore::new(pool.clone());
    let candidate_id = Uuid::new_v4();

    // Act
    store
        .finalize_module(candidate_id, "mod-constructive-feedback", 40)
        .await
        .unwrap();
    store
        .finalize_module(candidate_id, "mod-constructive-feedback", 60)
        .await
        .unwrap();
    let status = store
        .check_retake_status(candidate_id, "mod-constructive-feedback")
        .await
        .unwrap();
    let other_module = store
        .check_retake_status(candidate_id, "mod-workplace-conflict")
        .await
        .unwrap();

    // Assert
    assert_eq!(
        status,
        RetakeStatus {
            is_retake: true,
            attempt_number: 3
        }
    );
    assert_eq!(other_module, RetakeStatus::FIRST_ATTEMPT);

    let attempts: Vec<(i32, i32)> = sqlx::query_as(
        "SELECT attempt_number, total_score FROM module_completions WHERE candidate_id = $1 ORDER BY attempt_number",
    )
    .bind(candidate_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(attempts, [(1, 40), (2, 60)]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_audit_entry_is_written(pool: PgPool) {
    let log = PgAuditLog::new(pool.clone());
    let candidate_id = Uuid::new_v4();

    log.record(AuditEntry {
        candidate_id,
        action: "module_completed".to_owned(),
        details: serde_json::json!({"module_id": "mod-ownership-pressure", "total_score": 30}),
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    })
    .await
    .unwrap();

    let (action, details): (String, serde_json::Value) =
        sqlx::query_as("SELECT action, details FROM audit_log WHERE candidate_id = $1")
            .bind(candidate_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(action, "module_completed");
    assert_eq!(details["total_score"], 30);
}
