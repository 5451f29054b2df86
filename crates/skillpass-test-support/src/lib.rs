//! Shared test doubles for the Skillpass training player.

mod clock;
mod ports;
mod repository;

pub use clock::FixedClock;
pub use ports::{
    FailingRetakeLookup, NarrationCall, RecordingAuditLog, RecordingCompletionStore,
    RecordingNarrator, StubRetakeLookup,
};
pub use repository::{
    AppendCall, EmptyEventRepository, FailingEventRepository, FlakyEventRepository,
    RecordingEventRepository, VersionedEventRepository,
};
