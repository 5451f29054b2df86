//! Time source for event metadata, finalize requests and audit entries.
//!
//! Countdown ticking runs on the tokio timer and does not go through here.

use chrono::{DateTime, Utc};

/// Wall-clock time, injectable so recorded timestamps are reproducible in
/// tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
