//! In-memory `EventRepository` doubles.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use skillpass_core::error::DomainError;
use skillpass_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

/// One recorded `append_events` call.
pub type AppendCall = (Uuid, i64, Vec<StoredEvent>);

/// Returns a fixed history from `load_events` and records every append.
#[derive(Debug)]
pub struct RecordingEventRepository {
    history: Vec<StoredEvent>,
    appended: Mutex<Vec<AppendCall>>,
}

impl RecordingEventRepository {
    /// Creates a repository whose `load_events` always returns `history`.
    ///
    /// # Panics
    ///
    /// Panics if `history` is an `Err`; use `FailingEventRepository` for
    /// error scenarios.
    #[must_use]
    pub fn new(history: Result<Vec<StoredEvent>, DomainError>) -> Self {
        Self {
            history: history.expect(
                "RecordingEventRepository::new does not accept Err; use FailingEventRepository",
            ),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every append so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<AppendCall> {
        self.appended.lock().unwrap().clone()
    }

    /// Every appended event, flattened in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn all_appended(&self) -> Vec<StoredEvent> {
        self.appended
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, _, events)| events.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }
}

/// Has no history and accepts every append.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Fails every call with an infrastructure error.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Fails the first `failures` appends, then records like
/// `RecordingEventRepository`.
#[derive(Debug)]
pub struct FlakyEventRepository {
    failures: usize,
    attempts: AtomicUsize,
    inner: RecordingEventRepository,
}

impl FlakyEventRepository {
    /// Creates a repository that fails `failures` appends before succeeding.
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
            inner: RecordingEventRepository::new(Ok(Vec::new())),
        }
    }

    /// Number of append calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Appends that succeeded.
    pub fn appended_events(&self) -> Vec<AppendCall> {
        self.inner.appended_events()
    }
}

#[async_trait]
impl EventRepository for FlakyEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.load_events(aggregate_id).await
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(DomainError::Infrastructure("connection reset".into()));
        }
        self.inner
            .append_events(aggregate_id, expected_version, events)
            .await
    }
}

/// Keeps one stream per aggregate and enforces `expected_version` the way
/// the PostgreSQL store does. The first `outage` appends fail with an
/// infrastructure error without touching any stream.
#[derive(Debug, Default)]
pub struct VersionedEventRepository {
    outage: usize,
    attempts: AtomicUsize,
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl VersionedEventRepository {
    /// A store that is unreachable for its first `outage` appends.
    #[must_use]
    pub fn with_outage(outage: usize) -> Self {
        Self {
            outage,
            ..Self::default()
        }
    }

    /// Events stored for `aggregate_id`, in sequence order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream(&self, aggregate_id: Uuid) -> Vec<StoredEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of append calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventRepository for VersionedEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.stream(aggregate_id))
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.outage {
            return Err(DomainError::Infrastructure("connection reset".into()));
        }
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(aggregate_id).or_default();
        let actual = stream.len() as i64;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }
}
