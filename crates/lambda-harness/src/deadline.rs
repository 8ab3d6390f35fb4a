use std::time::{Duration, Instant};

use lambda_contracts::DEFAULT_TIMEOUT_MS;

/// Wall-clock budget for one invocation.
///
/// `remaining_time_ms() == timeout_ms - elapsed_ms()`, truncated to whole
/// milliseconds. The value keeps decreasing past expiry and is never clamped, so
/// handlers and assertions can tell "just expired" from "long expired".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Instant,
    timeout_ms: i64,
}

impl Deadline {
    /// Starts the clock now. Zero or negative budgets are already expired.
    pub fn start(timeout_ms: i64) -> Self {
        Self::starting_at(Instant::now(), timeout_ms)
    }

    pub fn starting_at(start: Instant, timeout_ms: i64) -> Self {
        Self { start, timeout_ms }
    }

    pub fn timeout_ms(&self) -> i64 {
        self.timeout_ms
    }

    pub fn elapsed_ms(&self) -> i64 {
        duration_ms(self.start.elapsed())
    }

    pub fn remaining_time_ms(&self) -> i64 {
        self.timeout_ms.saturating_sub(self.elapsed_ms())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_time_ms() <= 0
    }

    /// Time left as a `Duration`, or `None` once the budget is spent.
    pub fn remaining(&self) -> Option<Duration> {
        let ms = self.remaining_time_ms();
        if ms > 0 {
            Some(Duration::from_millis(ms.unsigned_abs()))
        } else {
            None
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::start(DEFAULT_TIMEOUT_MS)
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
