//! Background toggle loop.
//!
//! The cycler repeatedly sleeps for a random interval and then performs one
//! step. It owns its RNG; nothing is shared with other cyclers or with the
//! process. The sleep goes through a [`StopSignal`], so a stop request ends
//! the loop without waiting out the current interval, and no time is spent
//! polling a clock.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::CyclerConfig;
use crate::sync::StopSignal;
use crate::trace::{debug, trace};

/// Randomized interval source and run loop for a [`PhaseController`](super::PhaseController).
pub struct Cycler {
    rng: StdRng,
    min_interval: Duration,
    max_interval: Duration,
}

impl Cycler {
    /// Creates a cycler from a validated configuration.
    ///
    /// Seeds the RNG from `config.seed()` when present and from OS entropy
    /// otherwise.
    #[must_use]
    pub fn new(config: &CyclerConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            min_interval: config.min_interval(),
            max_interval: config.max_interval(),
        }
    }

    /// Draws the next interval, uniformly within the configured bounds.
    pub fn next_interval(&mut self) -> Duration {
        self.rng.random_range(self.min_interval..=self.max_interval)
    }

    /// Runs until `stop` is raised: sleep a fresh interval, then call `step`.
    ///
    /// Returns the number of steps taken. The stop flag is checked after
    /// every sleep, so no step runs once the signal is up.
    pub fn run<F>(&mut self, stop: &StopSignal, mut step: F) -> u64
    where
        F: FnMut(),
    {
        let mut steps = 0u64;
        loop {
            let interval = self.next_interval();
            trace!(
                interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                "sleeping until next step"
            );
            if stop.sleep(interval) {
                break;
            }
            step();
            steps += 1;
        }
        debug!(steps, "cycler stopped");
        steps
    }
}

impl fmt::Debug for Cycler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cycler")
            .field("min_interval", &self.min_interval)
            .field("max_interval", &self.max_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    use super::*;

    fn bounded(min_ms: u64, max_ms: u64) -> CyclerConfig {
        CyclerConfig::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms)).unwrap()
    }

    #[test]
    fn test_intervals_within_bounds() {
        let mut cycler = Cycler::new(&bounded(4000, 6000));

        for _ in 0..1000 {
            let interval = cycler.next_interval();
            assert!(interval >= Duration::from_secs(4), "{interval:?}");
            assert!(interval <= Duration::from_secs(6), "{interval:?}");
        }
    }

    #[test]
    fn test_zero_bounds_yield_zero() {
        let mut cycler = Cycler::new(&CyclerConfig::immediate());
        assert_eq!(cycler.next_interval(), Duration::ZERO);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let config = bounded(10, 5000).with_seed(42);
        let mut first = Cycler::new(&config);
        let mut second = Cycler::new(&config);

        let a: Vec<Duration> = (0..16).map(|_| first.next_interval()).collect();
        let b: Vec<Duration> = (0..16).map(|_| second.next_interval()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_stops_without_stepping_when_already_stopped() {
        let stop = StopSignal::new();
        stop.stop();
        let mut cycler = Cycler::new(&CyclerConfig::immediate());

        let steps = cycler.run(&stop, || panic!("step after stop"));
        assert_eq!(steps, 0);
    }

    #[test]
    fn test_run_steps_until_stopped() {
        let stop = Arc::new(StopSignal::new());
        let counter = Arc::new(AtomicU64::new(0));

        let handle = {
            let stop = Arc::clone(&stop);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let mut cycler = Cycler::new(&bounded(1, 2));
                cycler.run(&stop, || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
        };

        thread::sleep(Duration::from_millis(100));
        stop.stop();
        let steps = handle.join().unwrap();

        assert!(steps > 0);
        assert_eq!(steps, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn test_run_exits_mid_interval() {
        let stop = Arc::new(StopSignal::new());
        let sleeper = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut cycler = Cycler::new(&CyclerConfig::default());
            let start = std::time::Instant::now();
            let steps = cycler.run(&sleeper, || {});
            (steps, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        stop.stop();

        let (steps, elapsed) = handle.join().unwrap();
        assert_eq!(steps, 0);
        assert!(elapsed < CyclerConfig::DEFAULT_MIN_INTERVAL);
    }
}
