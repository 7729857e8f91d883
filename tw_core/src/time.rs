// ABOUTME: Timestamp formatting, cycle stopwatches and frame-rate pacing.
// ABOUTME: Wall-clock time is for logs only; loop timing is monotonic.
use ::time::{format_description::well_known::Rfc3339, OffsetDateTime};
use std::time::{Duration, Instant, SystemTime};

/// Format a wall-clock time as RFC3339 in UTC
///
/// # Examples
///
/// ```
/// use tw_core::to_rfc3339;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let new_year = UNIX_EPOCH + Duration::from_secs(1_704_067_200);
/// assert_eq!(to_rfc3339(new_year), "2024-01-01T00:00:00Z");
/// ```
pub fn to_rfc3339(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// The current time as RFC3339, for alert and log payloads
pub fn now_rfc3339() -> String {
    to_rfc3339(SystemTime::now())
}

/// Measures how long one loop cycle takes
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time so far, restarting the stopwatch
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.duration_since(self.started);
        self.started = now;
        lap
    }
}

/// Caps how often the capture loop cycles.
///
/// A rate of zero leaves the loop unpaced: every cycle starts as soon as the
/// previous one finishes.
#[derive(Debug, Clone, Copy)]
pub struct CyclePacer {
    budget: Option<Duration>,
}

impl CyclePacer {
    /// Create a pacer for at most `max_fps` cycles per second
    pub fn new(max_fps: u32) -> Self {
        let budget = (max_fps > 0).then(|| Duration::from_secs(1) / max_fps);
        Self { budget }
    }

    /// Time budget for one cycle, if paced
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// How long to wait after a cycle that took `elapsed`
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        match self.budget {
            Some(budget) => budget.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }
}
