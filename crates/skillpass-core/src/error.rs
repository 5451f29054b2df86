//! Errors shared by every Skillpass context.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a domain operation or of one of its collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No module in the catalog matches the requested id or slug.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// No events are stored for the run.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// The stored stream moved past the version the writer started from.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Stream being appended to.
        aggregate_id: Uuid,
        /// Version the writer expected.
        expected: i64,
        /// Version actually stored.
        actual: i64,
    },

    /// A transition or submission was attempted without meeting its
    /// precondition. No state was changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external collaborator (retake lookup, content generation) could
    /// not be reached.
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),

    /// Storage or serialization failed.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether repeating the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Infrastructure(_) | Self::ExternalUnavailable(_))
    }
}
