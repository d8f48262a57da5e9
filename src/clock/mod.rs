//! Timer collaborators for the action runner.
//!
//! [`Clock`] is the only way the runner observes time. [`TokioClock`] drives
//! real timers from a single task; [`FakeClock`] is advanced by hand in tests.

mod driver;
#[cfg(test)]
mod fake;

pub(crate) use driver::TokioClock;
#[cfg(test)]
pub(crate) use fake::FakeClock;

use std::time::Duration;

/// Work run once when a timer elapses.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a scheduled timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelToken(pub(crate) u64);

pub trait Clock: Send + Sync {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Run `callback` once `delay` has elapsed. Timers with the same deadline
    /// fire in the order they were scheduled.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelToken;

    /// Drop a pending timer. Unknown or already fired tokens are ignored.
    fn cancel(&self, token: CancelToken);
}
