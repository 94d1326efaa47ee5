//! Blocking FIFO queue for inter-thread delivery.
//!
//! [`Transport`] is an unbounded queue guarded by a [`Mutex`] and paired with
//! a [`Condvar`] that fires when the queue becomes non-empty.
//!
//! # Overview
//!
//! - [`Transport::send`] never blocks beyond lock contention and wakes one receiver.
//! - [`Transport::receive`] parks the caller until an element is available,
//!   then removes exactly one element, oldest first.
//! - Every element is returned by exactly one receive call.
//!
//! # Example
//!
//! ```
//! use wigwag::sync::Transport;
//!
//! let transport = Transport::new();
//! transport.send(1);
//! transport.send(2);
//!
//! assert_eq!(transport.receive(), 1);
//! assert_eq!(transport.receive(), 2);
//! ```
//!
//! # Wakeups
//!
//! A send wakes at most one blocked receiver. With several receivers parked
//! on the same transport each element still reaches exactly one of them,
//! which is what a work queue wants and what a signal does not. Use
//! [`Broadcast`](super::Broadcast) when every waiter must see every value.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use minstant::Instant;

use super::Timeout;
use crate::trace::trace;

/// Error returned by [`Transport::receive_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// No element arrived before the deadline.
    #[error("timed out waiting for a value")]
    Timeout,
    /// The transport was closed and holds no more elements.
    #[error("transport closed")]
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer, multi-consumer blocking queue.
pub struct Transport<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> Transport<T> {
    /// Creates an empty, open transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // Every critical section leaves the queue consistent, so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        self.available
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value` to the tail and wakes one blocked receiver.
    ///
    /// Values sent after [`close`](Self::close) are dropped.
    pub fn send(&self, value: T) {
        let mut state = self.lock();
        if state.closed {
            trace!("dropping value sent to closed transport");
            return;
        }
        state.items.push_back(value);
        drop(state);
        self.available.notify_one();
    }

    /// Blocks until an element is available, then removes and returns the oldest.
    ///
    /// There is no timeout: on a transport nobody sends to, this never
    /// returns. Closing does not release it either; use
    /// [`receive_timeout`](Self::receive_timeout) to observe closure.
    pub fn receive(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return item;
            }
            state = self.wait(state);
        }
    }

    /// Like [`receive`](Self::receive), but bounded by `timeout` and aware of closure.
    ///
    /// Elements already queued are still delivered after close.
    ///
    /// # Errors
    ///
    /// - [`RecvError::Timeout`] if the deadline passes with the queue empty.
    /// - [`RecvError::Closed`] if the transport is closed and drained.
    pub fn receive_timeout(&self, timeout: Timeout) -> Result<T, RecvError> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };

        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            if state.closed {
                return Err(RecvError::Closed);
            }
            state = match deadline {
                None => self.wait(state),
                Some(dl) => {
                    let Some(remaining) = dl.checked_duration_since(Instant::now()) else {
                        return Err(RecvError::Timeout);
                    };
                    self.available
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Removes the oldest element without blocking.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Blocks until non-empty, then returns the newest element and discards the rest.
    ///
    /// This is the lossy "latest value" reading of the queue. It suits a
    /// consumer that only cares where the producer is now, not how it got
    /// there.
    pub fn receive_latest(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(latest) = state.items.pop_back() {
                let skipped = state.items.len();
                state.items.clear();
                if skipped > 0 {
                    trace!(skipped, "discarded stale values");
                }
                return latest;
            }
            state = self.wait(state);
        }
    }

    /// Marks the transport closed and wakes every receiver.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of elements waiting to be received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}

impl<T> Default for Transport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Transport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Transport")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}
