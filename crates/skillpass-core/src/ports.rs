//! Collaborator ports of the training player.
//!
//! These are the external services a training session talks to. Their
//! failures are always converted to graceful defaults by the caller; none of
//! them may interrupt a candidate mid-module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Whether a candidate is retaking a module, and which attempt this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetakeStatus {
    /// True when the candidate has attempted the module before.
    pub is_retake: bool,
    /// One-based attempt number.
    pub attempt_number: u32,
}

impl RetakeStatus {
    /// A candidate's first attempt at a module.
    pub const FIRST_ATTEMPT: Self = Self {
        is_retake: false,
        attempt_number: 1,
    };

    /// Whether retake content variation applies to this attempt.
    #[must_use]
    pub fn wants_variation(&self) -> bool {
        self.is_retake && self.attempt_number > 1
    }
}

impl Default for RetakeStatus {
    fn default() -> Self {
        Self::FIRST_ATTEMPT
    }
}

/// Looks up prior attempts of a module by a candidate.
#[async_trait]
pub trait RetakeStatusLookup: Send + Sync {
    /// Returns the retake status for the next attempt of `module_id`.
    async fn check_retake_status(
        &self,
        candidate_id: Uuid,
        module_id: &str,
    ) -> Result<RetakeStatus, DomainError>;
}

/// Durable record of finished modules.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Records that `candidate_id` finished `module_id` with `total_score`.
    async fn finalize_module(
        &self,
        candidate_id: Uuid,
        module_id: &str,
        total_score: u32,
    ) -> Result<(), DomainError>;
}

/// One audit trail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Who the entry is about.
    pub candidate_id: Uuid,
    /// Short machine-readable action, e.g. `module_completed`.
    pub action: String,
    /// Free-form structured details.
    pub details: serde_json::Value,
    /// When the audited action happened.
    pub occurred_at: DateTime<Utc>,
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Writes one entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError>;
}

/// Text-to-speech side effect. Fire-and-forget, never required for scoring.
pub trait Narrator: Send + Sync {
    /// Starts speaking `text`, replacing anything currently spoken.
    fn speak(&self, text: &str);

    /// Stops any in-flight narration.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_does_not_want_variation() {
        assert!(!RetakeStatus::default().wants_variation());
    }

    #[test]
    fn test_retake_flag_alone_does_not_want_variation() {
        let status = RetakeStatus {
            is_retake: true,
            attempt_number: 1,
        };
        assert!(!status.wants_variation());
    }

    #[test]
    fn test_second_attempt_retake_wants_variation() {
        let status = RetakeStatus {
            is_retake: true,
            attempt_number: 2,
        };
        assert!(status.wants_variation());
    }
}
