//! One-shot stop flag with a cancellable sleep.
//!
//! Background loops sleep through [`StopSignal::sleep`] instead of
//! [`std::thread::sleep`] so that [`StopSignal::stop`] ends the sleep at once
//! and the owning thread can be joined without waiting out its interval.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared "run until told to stop" flag.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raises the flag and wakes every sleeper. Idempotent.
    pub fn stop(&self) {
        *self.lock() = true;
        self.changed.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.lock()
    }

    /// Sleeps for `duration` unless stopped first.
    ///
    /// Returns `true` if the signal was raised before or during the sleep.
    /// Spurious wakeups do not shorten the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_sleep_runs_full_duration() {
        let signal = StopSignal::new();
        let start = Instant::now();

        assert!(!signal.sleep(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_sleep_after_stop_returns_immediately() {
        let signal = StopSignal::new();
        signal.stop();
        let start = Instant::now();

        assert!(signal.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_interrupts_sleeper() {
        let signal = Arc::new(StopSignal::new());
        let sleeper = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let stopped = sleeper.sleep(Duration::from_secs(10));
            (stopped, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.stop();

        let (stopped, elapsed) = handle.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
        assert!(signal.is_stopped());
    }
}
