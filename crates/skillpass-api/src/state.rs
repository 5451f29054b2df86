//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use skillpass_core::error::DomainError;
use skillpass_core::repository::EventRepository;
use skillpass_training::application::session::{TrainingServices, TrainingSession};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
struct LiveSession {
    session: TrainingSession,
    last_seen: Instant,
}

/// Live training sessions keyed by run id.
///
/// Sessions hold the countdown task and the transient interaction state, so
/// they live in memory while the candidate stays in the module. A candidate
/// who leaves without closing the session is evicted once it has been idle
/// for the configured timeout.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, LiveSession>>>,
}

impl SessionRegistry {
    /// Registers a freshly started session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry lock is poisoned.
    pub fn insert(&self, session: TrainingSession) -> Result<(), DomainError> {
        let mut sessions = self.lock()?;
        sessions.insert(
            session.run_id(),
            LiveSession {
                session,
                last_seen: Instant::now(),
            },
        );
        Ok(())
    }

    /// Runs `f` against the session for `run_id` and marks it as active.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no live session has that
    /// id, or whatever `f` returns.
    pub fn with_session<T>(
        &self,
        run_id: Uuid,
        f: impl FnOnce(&mut TrainingSession) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut sessions = self.lock()?;
        let live = sessions
            .get_mut(&run_id)
            .ok_or(DomainError::AggregateNotFound(run_id))?;
        live.last_seen = Instant::now();
        f(&mut live.session)
    }

    /// Removes and returns the session for `run_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no live session has that id.
    pub fn remove(&self, run_id: Uuid) -> Result<TrainingSession, DomainError> {
        self.lock()?
            .remove(&run_id)
            .map(|live| live.session)
            .ok_or(DomainError::AggregateNotFound(run_id))
    }

    /// Number of live sessions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry lock is poisoned.
    pub fn open_count(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.len())
    }

    /// Closes and drops every session untouched for longer than `max_idle`.
    /// Returns how many were evicted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry lock is poisoned.
    pub fn evict_idle(&self, max_idle: Duration) -> Result<usize, DomainError> {
        let evicted: Vec<LiveSession> = {
            let mut sessions = self.lock()?;
            let idle: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, live)| live.last_seen.elapsed() > max_idle)
                .map(|(run_id, _)| *run_id)
                .collect();
            idle.iter().filter_map(|run_id| sessions.remove(run_id)).collect()
        };

        let count = evicted.len();
        for live in evicted {
            tracing::info!(run_id = %live.session.run_id(), "evicting idle training session");
            live.session.close();
        }
        Ok(count)
    }

    /// Spawns a task that evicts idle sessions periodically. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn spawn_idle_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (max_idle / 2).max(Duration::from_secs(1));
        let first_sweep = Instant::now() + period;
        tokio::spawn(async move {
            let mut sweeps = tokio::time::interval_at(first_sweep, period);
            loop {
                sweeps.tick().await;
                if let Err(e) = registry.evict_idle(max_idle) {
                    tracing::error!(error = %e, "idle session sweep failed");
                }
            }
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, LiveSession>>, DomainError> {
        self.sessions
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("session registry lock poisoned: {e}")))
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Collaborators used to open and drive sessions.
    pub services: TrainingServices,
    /// Sessions currently open.
    pub sessions: SessionRegistry,
    /// Event store read by run history queries.
    pub event_repository: Arc<dyn EventRepository>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("services", &self.services)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(services: TrainingServices, event_repository: Arc<dyn EventRepository>) -> Self {
        Self {
            services,
            sessions: SessionRegistry::default(),
            event_repository,
        }
    }
}
