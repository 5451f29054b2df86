//! Recorded facts about a training run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope fields stored next to every event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Time-ordered (v7) identifier of the event itself.
    pub event_id: Uuid,
    /// Payload discriminator, e.g. `training.scene_completed`.
    pub event_type: String,
    /// Run the event belongs to.
    pub aggregate_id: Uuid,
    /// Position in the run's stream, starting at 1.
    pub sequence_number: i64,
    /// Request that produced the event.
    pub correlation_id: Uuid,
    /// Direct cause; the request itself for events recorded by a command.
    pub causation_id: Uuid,
    /// Clock reading when the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Builds metadata for a freshly recorded event whose cause is the
    /// command identified by `correlation_id`.
    #[must_use]
    pub fn new(
        event_type: &str,
        aggregate_id: Uuid,
        sequence_number: i64,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.to_owned(),
            aggregate_id,
            sequence_number,
            correlation_id,
            causation_id: correlation_id,
            occurred_at,
        }
    }
}

/// An event that can be written to the event store.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Stored `event_type` column.
    fn event_type(&self) -> &'static str;

    /// Stored `payload` column.
    fn to_payload(&self) -> serde_json::Value;

    /// Envelope fields.
    fn metadata(&self) -> &EventMetadata;
}
