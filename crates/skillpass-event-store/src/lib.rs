//! Skillpass — PostgreSQL persistence adapters.
//!
//! Implements the core persistence ports on top of `sqlx`: the event store
//! for training runs, module completion records (which also answer retake
//! lookups) and the audit trail. The schema lives in the workspace
//! `migrations/` directory.

pub mod pg_audit_log;
pub mod pg_completion_store;
pub mod pg_event_repository;

pub(crate) fn infrastructure(error: sqlx::Error) -> skillpass_core::error::DomainError {
    skillpass_core::error::DomainError::Infrastructure(error.to_string())
}
