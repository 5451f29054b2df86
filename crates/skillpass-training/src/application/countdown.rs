//! Drives a `CountdownTimer` with a one-second tokio interval.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::timer::{CountdownTimer, TickOutcome, TimerState};

const TICK: Duration = Duration::from_secs(1);

/// Handle to a running countdown. Dropping it cancels the ticking task.
#[derive(Debug)]
pub struct CountdownHandle {
    timer: Arc<Mutex<CountdownTimer>>,
    task: JoinHandle<()>,
}

/// Starts `timer` and ticks it once per second until it expires or is
/// stopped.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn spawn_countdown(run_id: Uuid, mut timer: CountdownTimer) -> CountdownHandle {
    timer.start();
    // Anchored here, not on the task's first poll.
    let first_tick = Instant::now() + TICK;
    let timer = Arc::new(Mutex::new(timer));
    let task = tokio::spawn(tick_loop(run_id, Arc::clone(&timer), first_tick));
    CountdownHandle { timer, task }
}

async fn tick_loop(run_id: Uuid, timer: Arc<Mutex<CountdownTimer>>, first_tick: Instant) {
    let mut ticks = interval_at(first_tick, TICK);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticks.tick().await;
        let outcome = lock(&timer).tick();
        match outcome {
            TickOutcome::Ticked => {}
            TickOutcome::OvertimeGranted => {
                info!(%run_id, "time budget spent, overtime granted");
            }
            TickOutcome::Expired => {
                info!(%run_id, "overtime spent, countdown expired");
                break;
            }
            TickOutcome::Idle => {
                debug!(%run_id, "countdown halted");
                break;
            }
        }
    }
}

fn lock(timer: &Mutex<CountdownTimer>) -> MutexGuard<'_, CountdownTimer> {
    // A tick cannot leave the timer half-updated.
    timer.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CountdownHandle {
    /// Current timer state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        lock(&self.timer).state()
    }

    /// Halts the timer permanently. No decrement happens after this returns.
    pub fn stop(&self) {
        lock(&self.timer).stop();
        self.task.abort();
    }

    /// Stops the timer when the candidate leaves the module.
    pub fn cancel(self) {
        self.stop();
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timer::{OVERTIME_SECS, TimerPhase};

    async fn advance_secs(secs: u64) {
        for _ in 0..secs {
            tokio::time::advance(TICK).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_decrements_once_per_second() {
        // Arrange
        let handle = spawn_countdown(Uuid::new_v4(), CountdownTimer::new(10));

        // Act
        advance_secs(3).await;

        // Assert
        let state = handle.state();
        assert_eq!(state.seconds_remaining, 7);
        assert!(state.is_running);
        assert_eq!(state.phase, TimerPhase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_lands_one_second_after_spawn() {
        // Arrange
        let handle = spawn_countdown(Uuid::new_v4(), CountdownTimer::new(10));

        // Act
        advance_secs(1).await;

        // Assert
        assert_eq!(handle.state().seconds_remaining, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_grants_overtime_then_expires() {
        let handle = spawn_countdown(Uuid::new_v4(), CountdownTimer::new(2));

        advance_secs(2).await;
        let overtime = handle.state();
        advance_secs(u64::from(OVERTIME_SECS) + 5).await;
        let expired = handle.state();

        assert!(overtime.is_overtime);
        assert_eq!(overtime.seconds_remaining, OVERTIME_SECS);
        assert_eq!(expired.phase, TimerPhase::Expired);
        assert!(!expired.is_running);
        assert_eq!(expired.seconds_remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_remaining_seconds() {
        let handle = spawn_countdown(Uuid::new_v4(), CountdownTimer::new(60));
        advance_secs(5).await;

        handle.stop();
        advance_secs(10).await;

        let state = handle.state();
        assert_eq!(state.seconds_remaining, 55);
        assert_eq!(state.phase, TimerPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_ticking_task() {
        let handle = spawn_countdown(Uuid::new_v4(), CountdownTimer::new(60));
        let timer = Arc::clone(&handle.timer);

        handle.cancel();
        advance_secs(3).await;

        assert_eq!(lock(&timer).state().seconds_remaining, 60);
        assert!(!lock(&timer).is_running());
    }
}
