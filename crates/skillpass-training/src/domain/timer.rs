//! Countdown timer state machine.
//!
//! `NotStarted -> Running -> Overtime -> Expired`, with `Stopped` reachable
//! from any running phase when the module is finalized. The timer only
//! reports; it never blocks input.

use serde::Serialize;

/// Budget used when a module's duration string cannot be parsed.
pub const DEFAULT_BUDGET_SECS: u32 = 600;

/// Length of the one-time overtime extension.
pub const OVERTIME_SECS: u32 = 180;

/// Parses a duration of the form `"<integer> min"` (case-insensitive) into
/// seconds, falling back to [`DEFAULT_BUDGET_SECS`].
#[must_use]
pub fn parse_duration(duration: &str) -> u32 {
    let normalized = duration.trim().to_ascii_lowercase();
    normalized
        .strip_suffix("min")
        .map(str::trim_end)
        .and_then(|minutes| minutes.parse::<u32>().ok())
        .and_then(|minutes| minutes.checked_mul(60))
        .unwrap_or(DEFAULT_BUDGET_SECS)
}

/// Lifecycle phase of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Created but not ticking yet.
    NotStarted,
    /// Ticking within the nominal budget.
    Running,
    /// Ticking within the overtime extension.
    Overtime,
    /// Overtime spent; terminal.
    Expired,
    /// Halted because the module was finalized or abandoned; terminal.
    Stopped,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second was taken off the clock.
    Ticked,
    /// The budget reached zero and the overtime extension was granted.
    OvertimeGranted,
    /// Overtime reached zero; the timer stopped for good.
    Expired,
    /// The timer was not running.
    Idle,
}

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerState {
    /// Seconds left in the current phase.
    pub seconds_remaining: u32,
    /// Whether the overtime extension has been granted.
    pub is_overtime: bool,
    /// Whether the timer is still ticking.
    pub is_running: bool,
    /// Current phase.
    pub phase: TimerPhase,
}

/// Countdown bound to a module's nominal duration.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    budget_secs: u32,
    seconds_remaining: u32,
    is_overtime: bool,
    phase: TimerPhase,
}

impl CountdownTimer {
    /// Creates a timer with `budget_secs` on the clock.
    #[must_use]
    pub fn new(budget_secs: u32) -> Self {
        Self {
            budget_secs,
            seconds_remaining: budget_secs,
            is_overtime: false,
            phase: TimerPhase::NotStarted,
        }
    }

    /// Creates a timer from a module duration string.
    #[must_use]
    pub fn for_duration(duration: &str) -> Self {
        Self::new(parse_duration(duration))
    }

    /// Starts ticking. Has no effect once started.
    pub fn start(&mut self) {
        if self.phase == TimerPhase::NotStarted {
            self.seconds_remaining = self.budget_secs;
            self.phase = TimerPhase::Running;
        }
    }

    /// Advances the clock by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Idle;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return TickOutcome::Ticked;
        }

        if self.is_overtime {
            self.phase = TimerPhase::Expired;
            TickOutcome::Expired
        } else {
            self.is_overtime = true;
            self.seconds_remaining = OVERTIME_SECS;
            self.phase = TimerPhase::Overtime;
            TickOutcome::OvertimeGranted
        }
    }

    /// Halts the timer permanently, keeping the remaining seconds visible.
    pub fn stop(&mut self) {
        if matches!(
            self.phase,
            TimerPhase::NotStarted | TimerPhase::Running | TimerPhase::Overtime
        ) {
            self.phase = TimerPhase::Stopped;
        }
    }

    /// Whether ticks still take effect.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Overtime)
    }

    /// Snapshot of the observable state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        TimerState {
            seconds_remaining: self.seconds_remaining,
            is_overtime: self.is_overtime,
            is_running: self.is_running(),
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_n(timer: &mut CountdownTimer, n: u32) -> Vec<TickOutcome> {
        (0..n).map(|_| timer.tick()).collect()
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration("25 min"), 1500);
        assert_eq!(parse_duration("1 min"), 60);
        assert_eq!(parse_duration("15 MIN"), 900);
        assert_eq!(parse_duration(" 5min "), 300);
    }

    #[test]
    fn test_parse_duration_falls_back_to_default() {
        assert_eq!(parse_duration("malformed"), DEFAULT_BUDGET_SECS);
        assert_eq!(parse_duration("1 hour"), DEFAULT_BUDGET_SECS);
        assert_eq!(parse_duration("-5 min"), DEFAULT_BUDGET_SECS);
        assert_eq!(parse_duration(""), DEFAULT_BUDGET_SECS);
        assert_eq!(parse_duration("99999999999 min"), DEFAULT_BUDGET_SECS);
    }

    #[test]
    fn test_new_timer_is_not_running_until_started() {
        let mut timer = CountdownTimer::new(60);

        assert_eq!(timer.tick(), TickOutcome::Idle);
        assert_eq!(timer.state().phase, TimerPhase::NotStarted);

        timer.start();
        assert!(timer.is_running());
        assert_eq!(timer.state().seconds_remaining, 60);
    }

    #[test]
    fn test_tick_decrements_by_one_second() {
        let mut timer = CountdownTimer::new(60);
        timer.start();

        assert_eq!(timer.tick(), TickOutcome::Ticked);

        assert_eq!(timer.state().seconds_remaining, 59);
        assert!(!timer.state().is_overtime);
    }

    #[test]
    fn test_reaching_zero_grants_overtime_exactly_once() {
        // Arrange
        let mut timer = CountdownTimer::new(3);
        timer.start();

        // Act
        let outcomes = tick_n(&mut timer, 3);

        // Assert
        assert_eq!(
            outcomes,
            [
                TickOutcome::Ticked,
                TickOutcome::Ticked,
                TickOutcome::OvertimeGranted
            ]
        );
        let state = timer.state();
        assert!(state.is_overtime);
        assert!(state.is_running);
        assert_eq!(state.seconds_remaining, OVERTIME_SECS);
        assert_eq!(state.phase, TimerPhase::Overtime);
    }

    #[test]
    fn test_reaching_zero_in_overtime_stops_permanently() {
        // Arrange
        let mut timer = CountdownTimer::new(1);
        timer.start();
        assert_eq!(timer.tick(), TickOutcome::OvertimeGranted);

        // Act
        let outcomes = tick_n(&mut timer, OVERTIME_SECS);

        // Assert
        assert_eq!(outcomes.last(), Some(&TickOutcome::Expired));
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == TickOutcome::OvertimeGranted)
                .count(),
            0
        );
        let state = timer.state();
        assert_eq!(state.seconds_remaining, 0);
        assert!(!state.is_running);
        assert_eq!(state.phase, TimerPhase::Expired);

        assert_eq!(timer.tick(), TickOutcome::Idle);
        timer.start();
        assert_eq!(timer.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_zero_budget_grants_overtime_on_first_tick() {
        let mut timer = CountdownTimer::new(0);
        timer.start();

        assert_eq!(timer.tick(), TickOutcome::OvertimeGranted);
        assert_eq!(timer.state().seconds_remaining, OVERTIME_SECS);
    }

    #[test]
    fn test_stop_freezes_remaining_seconds() {
        let mut timer = CountdownTimer::new(60);
        timer.start();
        tick_n(&mut timer, 10);

        timer.stop();

        assert_eq!(timer.tick(), TickOutcome::Idle);
        let state = timer.state();
        assert_eq!(state.seconds_remaining, 50);
        assert!(!state.is_running);
        assert_eq!(state.phase, TimerPhase::Stopped);
    }

    #[test]
    fn test_stop_during_overtime() {
        let mut timer = CountdownTimer::new(1);
        timer.start();
        timer.tick();

        timer.stop();

        assert!(timer.state().is_overtime);
        assert_eq!(timer.state().phase, TimerPhase::Stopped);
    }

    #[test]
    fn test_stop_after_expiry_keeps_expired_phase() {
        let mut timer = CountdownTimer::new(1);
        timer.start();
        tick_n(&mut timer, 1 + OVERTIME_SECS);

        timer.stop();

        assert_eq!(timer.state().phase, TimerPhase::Expired);
    }
}
