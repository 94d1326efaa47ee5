//! Phase controller: owns the phase, publishes its transitions, and runs the
//! cycler thread.
//!
//! # Architecture
//!
//! ```text
//! cycler thread ── toggle ──> phase lock (flip) ──> Broadcast::send
//!                                                      │
//!                          ┌───────────────────────────┼──────────────┐
//!                          ▼                           ▼              ▼
//!                  wait_for_green()           wait_for_green()   subscribe()
//! ```
//!
//! - The phase lives behind its own mutex; [`PhaseController::current_phase`]
//!   only ever takes that lock.
//! - Transitions are delivered through a [`Broadcast`], one FIFO transport per
//!   waiter, so every waiter blocked before a transition observes it.
//! - A step lock serializes toggle-and-publish pairs. The phase lock is
//!   released before publishing, so the phase lock and a transport lock are
//!   never held together.
//!
//! # Lifecycle
//!
//! `new` (phase is red) → [`start`](PhaseController::start) at most once →
//! [`shutdown`](PhaseController::shutdown) or drop, which stops and joins the
//! cycler and releases any blocked waiter with [`SignalError::Stopped`].
//!
//! Only the cycler thread changes the phase. A controller that is never
//! started stays red: a [`wait_for_green`](PhaseController::wait_for_green) on
//! it blocks until another thread shuts it down.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;

use super::SignalError;
use super::config::CyclerConfig;
use super::cycler::Cycler;
use super::phase::Phase;
use crate::sync::{Broadcast, RecvError, StopSignal, Subscription, Timeout};
use crate::trace::{debug, info, trace, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the controller handle and its cycler thread.
struct Shared {
    phase: Mutex<Phase>,
    /// Serializes toggle-and-publish so delivery order equals toggle order.
    step: Mutex<()>,
    transitions: Broadcast<Phase>,
    stop: StopSignal,
}

impl Shared {
    /// One toggle-and-publish step. Refused once the stop signal is up, so
    /// the phase is frozen after shutdown.
    fn toggle(&self) -> Option<Phase> {
        let _step = lock(&self.step);
        if self.stop.is_stopped() {
            return None;
        }
        let next = {
            let mut phase = lock(&self.phase);
            *phase = phase.toggled();
            *phase
        };
        let _delivered = self.transitions.send(next);
        debug!(phase = %next, delivered = _delivered, "phase changed");
        Some(next)
    }
}

/// Lifecycle of the single cycler thread a controller may own.
enum Worker {
    Idle,
    Running(JoinHandle<()>),
    Finished,
}

/// A two-phase signal whose transitions can be awaited from any thread.
///
/// All methods take `&self`; share the controller between threads with an
/// [`Arc`].
pub struct PhaseController {
    shared: Arc<Shared>,
    config: CyclerConfig,
    worker: Mutex<Worker>,
}

impl PhaseController {
    /// Creates a stopped controller in the red phase.
    #[must_use]
    pub fn new(config: CyclerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Red),
                step: Mutex::new(()),
                transitions: Broadcast::new(),
                stop: StopSignal::new(),
            }),
            config,
            worker: Mutex::new(Worker::Idle),
        }
    }

    /// The configuration the cycler runs with.
    #[must_use]
    pub fn config(&self) -> &CyclerConfig {
        &self.config
    }

    /// Snapshot of the current phase.
    ///
    /// May lag behind a transition that has already been delivered to
    /// waiters, or run ahead of one that has not yet been delivered.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        *lock(&self.shared.phase)
    }

    /// Flips the phase and publishes the new value to every waiter.
    ///
    /// Toggle and publish form one step: concurrent toggles cannot interleave,
    /// so waiters receive phases in exactly the order they were set. Outside
    /// the crate the cycler thread is the only caller.
    pub(crate) fn toggle(&self) -> Result<Phase, SignalError> {
        self.shared.toggle().ok_or(SignalError::Stopped)
    }

    /// Subscribes to every transition published from now on, in order.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<Phase> {
        self.shared.transitions.subscribe()
    }

    /// Number of threads currently subscribed to transitions, waiters included.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.transitions.subscriber_count()
    }

    /// Blocks until the next transition to green.
    ///
    /// Red transitions seen on the way are skipped. Every thread blocked here
    /// when a red→green transition is published returns.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Stopped`] if the controller shuts down first.
    pub fn wait_for_green(&self) -> Result<(), SignalError> {
        self.wait_for_green_within(Timeout::Infinite)
    }

    /// Like [`wait_for_green`](Self::wait_for_green), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// - [`SignalError::Timeout`] if no green arrives in time.
    /// - [`SignalError::Stopped`] if the controller shuts down first.
    pub fn wait_for_green_timeout(&self, timeout: Duration) -> Result<(), SignalError> {
        self.wait_for_green_within(Timeout::Duration(timeout))
    }

    fn wait_for_green_within(&self, timeout: Timeout) -> Result<(), SignalError> {
        let subscription = self.subscribe();
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };

        loop {
            let remaining = match deadline {
                Some(dl) => match dl.checked_duration_since(Instant::now()) {
                    Some(remaining) => Timeout::Duration(remaining),
                    None => return Err(SignalError::Timeout),
                },
                None => Timeout::Infinite,
            };

            match subscription.receive_timeout(remaining) {
                Ok(Phase::Green) => {
                    trace!("waiter observed green");
                    return Ok(());
                }
                Ok(Phase::Red) => continue,
                Err(RecvError::Timeout) => return Err(SignalError::Timeout),
                Err(RecvError::Closed) => return Err(SignalError::Stopped),
            }
        }
    }

    /// Spawns the cycler thread.
    ///
    /// # Errors
    ///
    /// - [`SignalError::AlreadyStarted`] on any call after the first, including
    ///   after [`shutdown`](Self::shutdown).
    /// - [`SignalError::Spawn`] if the thread cannot be created.
    pub fn start(&self) -> Result<(), SignalError> {
        let mut worker = lock(&self.worker);
        if !matches!(*worker, Worker::Idle) {
            warn!("ignoring second start");
            return Err(SignalError::AlreadyStarted);
        }

        info!(
            min_interval_ms =
                u64::try_from(self.config.min_interval().as_millis()).unwrap_or(u64::MAX),
            max_interval_ms =
                u64::try_from(self.config.max_interval().as_millis()).unwrap_or(u64::MAX),
            seeded = self.config.seed().is_some(),
            "starting cycler"
        );

        let shared = Arc::clone(&self.shared);
        let mut cycler = Cycler::new(&self.config);
        let handle = thread::Builder::new()
            .name("wigwag-cycler".into())
            .spawn(move || {
                info!("cycler thread started");
                cycler.run(&shared.stop, || {
                    shared.toggle();
                });
                info!("cycler thread exiting");
            })
            .map_err(SignalError::Spawn)?;

        *worker = Worker::Running(handle);
        Ok(())
    }

    /// Returns `true` while the cycler thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*lock(&self.worker), Worker::Running(handle) if !handle.is_finished())
    }

    /// Stops the cycler, releases blocked waiters, and joins the thread.
    ///
    /// Idempotent. After shutdown the phase is frozen and
    /// [`start`](Self::start) reports [`SignalError::AlreadyStarted`].
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *lock(&self.worker), Worker::Finished);
        if matches!(previous, Worker::Finished) {
            return;
        }

        info!("controller shutdown initiated");
        self.shared.stop.stop();
        self.shared.transitions.close();

        if let Worker::Running(handle) = previous {
            debug!("waiting for cycler thread to exit");
            if handle.join().is_err() {
                warn!("cycler thread panicked");
            }
        }
        info!("controller shutdown complete");
    }
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new(CyclerConfig::default())
    }
}

impl Drop for PhaseController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
