//! Integration tests for `PgEventRepository`.
//!
//! Run with `cargo test -- --ignored` against a database named by
//! `DATABASE_URL`.

use chrono::{DateTime, TimeZone, Utc};
use skillpass_core::error::DomainError;
use skillpass_core::repository::{EventRepository, StoredEvent};
use skillpass_event_store::pg_event_repository::PgEventRepository;
use sqlx::PgPool;
use uuid::Uuid;

fn occurred_at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, second).unwrap()
}

fn scene_entered(run_id: Uuid, sequence_number: i64, to_index: i64) -> StoredEvent {
    let correlation_id = Uuid::new_v4();
    StoredEvent {
        event_id: Uuid::now_v7(),
        aggregate_id: run_id,
        event_type: "training.scene_entered".to_owned(),
        payload: serde_json::json!({
            "SceneEntered": {"run_id": run_id, "from_index": to_index - 1, "to_index": to_index}
        }),
        sequence_number,
        correlation_id,
        causation_id: correlation_id,
        occurred_at: occurred_at(u32::try_from(sequence_number).unwrap()),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_unknown_run_has_no_events(pool: PgPool) {
    let repo = PgEventRepository::new(pool);

    let events = repo.load_events(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_appended_events_load_in_sequence_order_with_metadata(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let run_id = Uuid::new_v4();
    let batch = vec![
        scene_entered(run_id, 1, 1),
        scene_entered(run_id, 2, 2),
        scene_entered(run_id, 3, 3),
    ];

    // Act
    repo.append_events(run_id, 0, &batch).await.unwrap();
    let loaded = repo.load_events(run_id).await.unwrap();

    // Assert
    assert_eq!(loaded.len(), 3);
    for (stored, original) in loaded.iter().zip(&batch) {
        assert_eq!(stored.event_id, original.event_id);
        assert_eq!(stored.event_type, original.event_type);
        assert_eq!(stored.payload, original.payload);
        assert_eq!(stored.sequence_number, original.sequence_number);
        assert_eq!(stored.correlation_id, original.correlation_id);
        assert_eq!(stored.occurred_at, original.occurred_at);
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_runs_are_isolated(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    repo.append_events(first, 0, &[scene_entered(first, 1, 1)])
        .await
        .unwrap();
    repo.append_events(second, 0, &[scene_entered(second, 1, 1), scene_entered(second, 2, 2)])
        .await
        .unwrap();

    assert_eq!(repo.load_events(first).await.unwrap().len(), 1);
    assert_eq!(repo.load_events(second).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_batches_chain_on_expected_version(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let run_id = Uuid::new_v4();

    repo.append_events(run_id, 0, &[scene_entered(run_id, 1, 1), scene_entered(run_id, 2, 2)])
        .await
        .unwrap();
    repo.append_events(run_id, 2, &[scene_entered(run_id, 3, 3)])
        .await
        .unwrap();

    let sequence: Vec<i64> = repo
        .load_events(run_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.sequence_number)
        .collect();
    assert_eq!(sequence, [1, 2, 3]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_stale_expected_version_is_a_conflict(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let run_id = Uuid::new_v4();
    repo.append_events(run_id, 0, &[scene_entered(run_id, 1, 1), scene_entered(run_id, 2, 2)])
        .await
        .unwrap();

    // Act
    let result = repo
        .append_events(run_id, 0, &[scene_entered(run_id, 3, 3)])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        }) => {
            assert_eq!(aggregate_id, run_id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(repo.load_events(run_id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_empty_batch_writes_nothing(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let run_id = Uuid::new_v4();

    repo.append_events(run_id, 0, &[]).await.unwrap();

    assert!(repo.load_events(run_id).await.unwrap().is_empty());
}
