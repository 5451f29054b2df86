//! Outbound persistence queue.
//!
//! Sessions hand progress events and finalize requests to the outbox and
//! move on. A single worker delivers them strictly in submission order,
//! retrying transient failures with exponential backoff. Local session state
//! is never rolled back.
//!
//! A run's event stream must be appended without gaps, so an append batch
//! that exhausts its retries is held and sent again in front of the run's
//! next batch, under the held batch's expected version. Only a terminal
//! error (a version conflict) drops held events.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use skillpass_core::error::DomainError;
use skillpass_core::ports::{AuditEntry, AuditLog, CompletionStore};
use skillpass_core::repository::{EventRepository, StoredEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Retry schedule for a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first, at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further one.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Finalize request queued when a candidate completes a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRequest {
    /// The run being finalized.
    pub run_id: Uuid,
    /// The candidate.
    pub candidate_id: Uuid,
    /// The module.
    pub module_id: String,
    /// Final score.
    pub total_score: u32,
    /// Whether the passing threshold was met.
    pub passed: bool,
    /// When the candidate finalized.
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug)]
enum OutboxMessage {
    AppendEvents {
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<StoredEvent>,
    },
    FinalizeModule(FinalizeRequest),
    Flush(oneshot::Sender<()>),
}

/// Delivery counters kept for diagnostics.
#[derive(Debug, Default)]
struct OutboxCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    held: AtomicU64,
}

impl OutboxCounters {
    fn record<T>(&self, result: &Result<T, DomainError>) {
        let counter = if result.is_ok() {
            &self.delivered
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of the outbox counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    /// Messages delivered, possibly after retries or after being held.
    pub delivered: u64,
    /// Messages given up on.
    pub failed: u64,
    /// Append messages waiting to be sent again with their run's next batch.
    pub held: u64,
}

/// Destinations of queued messages.
#[derive(Clone)]
pub struct OutboxSinks {
    /// Event store for progress events.
    pub events: Arc<dyn EventRepository>,
    /// Completion records.
    pub completions: Arc<dyn CompletionStore>,
    /// Audit trail written after a successful finalize.
    pub audit: Arc<dyn AuditLog>,
}

/// Sending side of the persistence queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProgressOutbox {
    tx: mpsc::UnboundedSender<OutboxMessage>,
    counters: Arc<OutboxCounters>,
}

impl ProgressOutbox {
    /// Spawns the delivery worker. Must be called from within a tokio
    /// runtime. The worker exits once every clone of the outbox is dropped.
    #[must_use]
    pub fn spawn(sinks: OutboxSinks, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(OutboxCounters::default());
        tokio::spawn(run_worker(rx, sinks, policy, Arc::clone(&counters)));
        Self { tx, counters }
    }

    /// Queues events for appending. Empty batches are skipped.
    pub fn append_events(&self, aggregate_id: Uuid, expected_version: i64, events: Vec<StoredEvent>) {
        if events.is_empty() {
            return;
        }
        self.send(OutboxMessage::AppendEvents {
            aggregate_id,
            expected_version,
            events,
        });
    }

    /// Queues a finalize call.
    pub fn finalize_module(&self, request: FinalizeRequest) {
        self.send(OutboxMessage::FinalizeModule(request));
    }

    /// Waits until every message queued before this call has been handled
    /// and held batches have had one more delivery round.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(OutboxMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Current delivery counters.
    #[must_use]
    pub fn stats(&self) -> OutboxStats {
        OutboxStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            held: self.counters.held.load(Ordering::Relaxed),
        }
    }

    fn send(&self, message: OutboxMessage) {
        if self.tx.send(message).is_err() {
            error!("persistence worker is gone, dropping message");
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for OutboxSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxSinks").finish_non_exhaustive()
    }
}

/// Append batch that could not be stored yet.
#[derive(Debug)]
struct HeldBatch {
    expected_version: i64,
    events: Vec<StoredEvent>,
    messages: u64,
}

struct Worker {
    sinks: OutboxSinks,
    policy: RetryPolicy,
    counters: Arc<OutboxCounters>,
    held: HashMap<Uuid, HeldBatch>,
}

impl Worker {
    async fn append(&mut self, aggregate_id: Uuid, expected_version: i64, events: Vec<StoredEvent>) {
        let batch = match self.held.remove(&aggregate_id) {
            Some(mut held) => {
                held.events.extend(events);
                held.messages += 1;
                held
            }
            None => HeldBatch {
                expected_version,
                events,
                messages: 1,
            },
        };
        self.deliver(aggregate_id, batch).await;
    }

    async fn deliver(&mut self, aggregate_id: Uuid, batch: HeldBatch) {
        let result = with_retry(&self.policy, "append_events", || {
            self.sinks
                .events
                .append_events(aggregate_id, batch.expected_version, &batch.events)
        })
        .await;
        match result {
            Ok(()) => {
                self.counters
                    .delivered
                    .fetch_add(batch.messages, Ordering::Relaxed);
            }
            Err(e) if e.is_transient() => {
                warn!(%aggregate_id, expected_version = batch.expected_version, count = batch.events.len(), error = %e, "progress events held for the next delivery");
                self.held.insert(aggregate_id, batch);
            }
            Err(e) => {
                error!(%aggregate_id, expected_version = batch.expected_version, count = batch.events.len(), error = %e, "progress events were not saved");
                self.counters
                    .failed
                    .fetch_add(batch.messages, Ordering::Relaxed);
            }
        }
        let held = self.held.values().map(|batch| batch.messages).sum();
        self.counters.held.store(held, Ordering::Relaxed);
    }

    async fn redeliver_held(&mut self) {
        for (aggregate_id, batch) in std::mem::take(&mut self.held) {
            self.deliver(aggregate_id, batch).await;
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<OutboxMessage>,
    sinks: OutboxSinks,
    policy: RetryPolicy,
    counters: Arc<OutboxCounters>,
) {
    let mut worker = Worker {
        sinks,
        policy,
        counters,
        held: HashMap::new(),
    };
    while let Some(message) = rx.recv().await {
        match message {
            OutboxMessage::AppendEvents {
                aggregate_id,
                expected_version,
                events,
            } => worker.append(aggregate_id, expected_version, events).await,
            OutboxMessage::FinalizeModule(request) => {
                let result = deliver_finalize(&worker.sinks, &worker.policy, &request).await;
                worker.counters.record(&result);
            }
            OutboxMessage::Flush(done) => {
                worker.redeliver_held().await;
                let _ = done.send(());
            }
        }
    }
    if !worker.held.is_empty() {
        error!(runs = worker.held.len(), "persistence worker stopped with unsaved progress");
    }
    debug!("persistence worker stopped");
}

async fn deliver_finalize(
    sinks: &OutboxSinks,
    policy: &RetryPolicy,
    request: &FinalizeRequest,
) -> Result<(), DomainError> {
    let result = with_retry(policy, "finalize_module", || {
        sinks.completions.finalize_module(
            request.candidate_id,
            &request.module_id,
            request.total_score,
        )
    })
    .await;
    if let Err(e) = &result {
        error!(run_id = %request.run_id, module_id = %request.module_id, error = %e, "module completion was not saved");
        return result;
    }

    let entry = AuditEntry {
        candidate_id: request.candidate_id,
        action: "module_completed".to_owned(),
        details: serde_json::json!({
            "run_id": request.run_id,
            "module_id": request.module_id,
            "total_score": request.total_score,
            "passed": request.passed,
        }),
        occurred_at: request.occurred_at,
    };
    if let Err(e) = sinks.audit.record(entry).await {
        warn!(run_id = %request.run_id, error = %e, "audit entry was not written");
    }
    Ok(())
}

async fn with_retry<F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<(), DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DomainError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(()) => return Ok(()),
            Err(e) if !e.is_transient() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt);
                warn!(operation, attempt, ?delay, error = %e, "delivery failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
