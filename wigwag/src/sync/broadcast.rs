//! Fan-out of one value to every current subscriber.
//!
//! Each [`Subscription`] owns its own [`Transport`], so a single
//! [`Broadcast::send`] wakes every subscriber that is blocked at that moment,
//! and each of them sees every value in send order. A subscription only sees
//! values sent after it was created.
//!
//! # Example
//!
//! ```
//! use wigwag::sync::Broadcast;
//!
//! let broadcast = Broadcast::new();
//! let a = broadcast.subscribe();
//! let b = broadcast.subscribe();
//!
//! assert_eq!(broadcast.send(5u32), 2);
//! assert_eq!(a.receive(), 5);
//! assert_eq!(b.receive(), 5);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::Timeout;
use super::queue::{RecvError, Transport};
use crate::trace::trace;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Arc<Transport<T>>)>,
    closed: bool,
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Delivers every sent value to every live [`Subscription`].
pub struct Broadcast<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Broadcast<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Registers a new subscriber.
    ///
    /// Subscribing to a closed broadcast yields a subscription that reports
    /// [`RecvError::Closed`] immediately.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let transport = Arc::new(Transport::new());
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;

        if registry.closed {
            transport.close();
        } else {
            registry.entries.push((id, Arc::clone(&transport)));
        }
        trace!(id, subscribers = registry.entries.len(), "subscribed");

        Subscription {
            id,
            transport,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Closes every subscription and refuses new deliveries.
    ///
    /// Values already queued stay receivable.
    pub fn close(&self) {
        let entries = {
            let mut registry = lock(&self.registry);
            registry.closed = true;
            std::mem::take(&mut registry.entries)
        };
        for (_, transport) in entries {
            transport.close();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }
}

impl<T: Clone> Broadcast<T> {
    /// Sends a copy of `value` to every subscriber; returns how many received it.
    ///
    /// The registry lock is released before any subscriber transport is
    /// touched, so the two are never held together.
    pub fn send(&self, value: T) -> usize {
        let targets: Vec<Arc<Transport<T>>> = lock(&self.registry)
            .entries
            .iter()
            .map(|(_, transport)| Arc::clone(transport))
            .collect();

        for transport in &targets {
            transport.send(value.clone());
        }
        targets.len()
    }
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("Broadcast")
            .field("subscribers", &registry.entries.len())
            .field("closed", &registry.closed)
            .finish()
    }
}

/// Receiving end of a [`Broadcast`]. Unsubscribes on drop.
pub struct Subscription<T> {
    id: u64,
    transport: Arc<Transport<T>>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// Blocks until the next value arrives. See [`Transport::receive`].
    pub fn receive(&self) -> T {
        self.transport.receive()
    }

    /// Bounded, closure-aware receive. See [`Transport::receive_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`RecvError::Timeout`] or [`RecvError::Closed`].
    pub fn receive_timeout(&self, timeout: Timeout) -> Result<T, RecvError> {
        self.transport.receive_timeout(timeout)
    }

    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.transport.try_receive()
    }

    /// Number of delivered values not yet received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.transport.len()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .finish()
    }
}
