//! Event-sourced aggregates.

use uuid::Uuid;

use crate::event::DomainEvent;
use crate::repository::StoredEvent;

/// An aggregate whose state is a fold over its event stream.
///
/// Recording an event applies it immediately, so in-memory state never lags
/// behind what the candidate has done. `version` only advances once recorded
/// events are handed off for persistence, which keeps it usable as the
/// expected version of the next append.
pub trait AggregateRoot: Send + Sync {
    /// Events recorded and replayed by this aggregate.
    type Event: DomainEvent;

    /// Stream identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Number of events already handed off for persistence.
    fn version(&self) -> i64;

    /// Replays one stored event.
    fn apply(&mut self, event: &Self::Event);

    /// Events recorded since the last hand-off.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Counts the pending events into `version` and forgets them.
    fn clear_uncommitted_events(&mut self);

    /// Sequence number the next recorded event gets.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version() + self.uncommitted_events().len() as i64 + 1
    }

    /// Flattens pending events for the event store and marks them committed.
    ///
    /// Returns the stream version before these events, i.e. the expected
    /// version of the append.
    fn take_uncommitted(&mut self) -> (i64, Vec<StoredEvent>) {
        let expected_version = self.version();
        let stored = self
            .uncommitted_events()
            .iter()
            .map(StoredEvent::from_event)
            .collect();
        self.clear_uncommitted_events();
        (expected_version, stored)
    }
}
