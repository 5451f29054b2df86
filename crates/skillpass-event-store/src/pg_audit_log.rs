//! Append-only audit trail.

use async_trait::async_trait;
use sqlx::PgPool;

use skillpass_core::error::DomainError;
use skillpass_core::ports::{AuditEntry, AuditLog};

use crate::infrastructure;

/// PostgreSQL-backed audit log.
#[derive(Debug, Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Creates a new `PgAuditLog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO audit_log (candidate_id, action, details, occurred_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.candidate_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}
