//! Rate limiting for diagnostics emitted from hot failure paths.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default minimum interval between emissions.
pub(crate) const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(10);

/// Limits how often a diagnostic is emitted.
///
/// A saturated submission queue can evict thousands of records per
/// second; logging each eviction would flood the host application's
/// diagnostics with exactly the kind of repetition the eviction was
/// protecting the disk from. This throttle emits at most once per
/// interval and tells the emission how many occurrences were swallowed
/// since the last one.
pub(crate) struct WarnThrottle {
    min_interval: Duration,
    state: Mutex<ThrottleState>,
}

struct ThrottleState {
    last_emit: Option<Instant>,
    suppressed: u64,
}

impl WarnThrottle {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(ThrottleState {
                last_emit: None,
                suppressed: 0,
            }),
        }
    }

    /// Invoke `emit` with the count of suppressed occurrences, unless an
    /// emission already happened within the interval.
    pub(crate) fn emit(&self, emit: impl FnOnce(u64)) {
        let suppressed = {
            let mut state = self.state.lock();
            let now = Instant::now();
            match state.last_emit {
                Some(last) if now.duration_since(last) < self.min_interval => {
                    state.suppressed += 1;
                    return;
                }
                _ => {
                    state.last_emit = Some(now);
                    std::mem::take(&mut state.suppressed)
                }
            }
        };
        emit(suppressed);
    }
}

impl Default for WarnThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}
