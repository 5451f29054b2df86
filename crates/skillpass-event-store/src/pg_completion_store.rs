//! Module completion records.
//!
//! Every finalized run adds one row. The same table answers retake lookups:
//! a candidate with `n` recorded completions of a module is on attempt
//! `n + 1`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use skillpass_core::error::DomainError;
use skillpass_core::ports::{CompletionStore, RetakeStatus, RetakeStatusLookup};

use crate::infrastructure;

/// PostgreSQL-backed completion store and retake lookup.
#[derive(Debug, Clone)]
pub struct PgCompletionStore {
    pool: PgPool,
}

impl PgCompletionStore {
    /// Creates a new `PgCompletionStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompletionStore for PgCompletionStore {
    async fn finalize_module(
        &self,
        candidate_id: Uuid,
        module_id: &str,
        total_score: u32,
    ) -> Result<(), DomainError> {
        let total_score = i32::try_from(total_score)
            .map_err(|_| DomainError::Validation(format!("score {total_score} is out of range")))?;

        sqlx::query(
            r"
            INSERT INTO module_completions (candidate_id, module_id, attempt_number, total_score)
            SELECT $1, $2, COUNT(*) + 1, $3
            FROM module_completions
            WHERE candidate_id = $1 AND module_id = $2
            ",
        )
        .bind(candidate_id)
        .bind(module_id)
        .bind(total_score)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}

#[async_trait]
impl RetakeStatusLookup for PgCompletionStore {
    async fn check_retake_status(
        &self,
        candidate_id: Uuid,
        module_id: &str,
    ) -> Result<RetakeStatus, DomainError> {
        let completions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM module_completions WHERE candidate_id = $1 AND module_id = $2",
        )
        .bind(candidate_id)
        .bind(module_id)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;

        let completions = u32::try_from(completions).map_err(|_| {
            DomainError::Infrastructure(format!("invalid completion count {completions}"))
        })?;
        Ok(RetakeStatus {
            is_retake: completions > 0,
            attempt_number: completions.saturating_add(1),
        })
    }
}
