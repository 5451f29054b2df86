//! Doubles for the collaborator ports.

use std::sync::Mutex;

use async_trait::async_trait;
use skillpass_core::error::DomainError;
use skillpass_core::ports::{
    AuditEntry, AuditLog, CompletionStore, Narrator, RetakeStatus, RetakeStatusLookup,
};
use uuid::Uuid;

/// Answers every lookup with the same status.
#[derive(Debug, Clone, Copy)]
pub struct StubRetakeLookup(pub RetakeStatus);

#[async_trait]
impl RetakeStatusLookup for StubRetakeLookup {
    async fn check_retake_status(
        &self,
        _candidate_id: Uuid,
        _module_id: &str,
    ) -> Result<RetakeStatus, DomainError> {
        Ok(self.0)
    }
}

/// Fails every lookup.
#[derive(Debug)]
pub struct FailingRetakeLookup;

#[async_trait]
impl RetakeStatusLookup for FailingRetakeLookup {
    async fn check_retake_status(
        &self,
        _candidate_id: Uuid,
        _module_id: &str,
    ) -> Result<RetakeStatus, DomainError> {
        Err(DomainError::ExternalUnavailable(
            "attempt history unavailable".into(),
        ))
    }
}

/// Records finalize calls; optionally fails all of them.
#[derive(Debug, Default)]
pub struct RecordingCompletionStore {
    fail: bool,
    finalized: Mutex<Vec<(Uuid, String, u32)>>,
}

impl RecordingCompletionStore {
    /// A store that fails every call with an infrastructure error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            finalized: Mutex::default(),
        }
    }

    /// Successful finalize calls as `(candidate_id, module_id, total_score)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn finalized(&self) -> Vec<(Uuid, String, u32)> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionStore for RecordingCompletionStore {
    async fn finalize_module(
        &self,
        candidate_id: Uuid,
        module_id: &str,
        total_score: u32,
    ) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::Infrastructure("completion write failed".into()));
        }
        self.finalized
            .lock()
            .unwrap()
            .push((candidate_id, module_id.to_owned(), total_score));
        Ok(())
    }
}

/// Records audit entries.
#[derive(Debug, Default)]
pub struct RecordingAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLog {
    /// Entries written so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// What a `RecordingNarrator` was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationCall {
    /// `speak` with the given text.
    Speak(String),
    /// `cancel`.
    Cancel,
}

/// Records narration requests in order.
#[derive(Debug, Default)]
pub struct RecordingNarrator {
    calls: Mutex<Vec<NarrationCall>>,
}

impl RecordingNarrator {
    /// Every call so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<NarrationCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts passed to `speak`, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NarrationCall::Speak(text) => Some(text),
                NarrationCall::Cancel => None,
            })
            .collect()
    }
}

impl Narrator for RecordingNarrator {
    fn speak(&self, text: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(NarrationCall::Speak(text.to_owned()));
    }

    fn cancel(&self) {
        self.calls.lock().unwrap().push(NarrationCall::Cancel);
    }
}
