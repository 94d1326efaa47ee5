//! Synchronization primitives for in-process communication.
//!
//! This module provides the blocking queue that carries phase transitions
//! between threads, a fan-out built from it, and a stop signal for
//! background loops.

pub mod broadcast;
pub mod queue;
pub mod stop;

use std::time::Duration;

pub use broadcast::{Broadcast, Subscription};
pub use queue::{RecvError, Transport};
pub use stop::StopSignal;

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}
