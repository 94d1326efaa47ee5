//! The two-phase signal: its state, the controller that owns it, and the
//! background loop that flips it.
//!
//! - `phase`: the [`Phase`] enum.
//! - `config`: interval bounds and seed for the [`Cycler`].
//! - `cycler`: randomized, cancellable toggle loop.
//! - `controller`: [`PhaseController`], the public entry point.

pub mod config;
pub mod controller;
pub mod cycler;
pub mod phase;

pub use config::{ConfigError, CyclerConfig};
pub use controller::PhaseController;
pub use cycler::Cycler;
pub use phase::Phase;

/// Errors reported by [`PhaseController`].
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// [`PhaseController::start`] was called on a controller that was already
    /// started or has been shut down.
    #[error("cycler already started")]
    AlreadyStarted,
    /// No green phase was observed before the deadline.
    #[error("timed out waiting for green")]
    Timeout,
    /// The controller shut down while the caller was waiting.
    #[error("controller stopped")]
    Stopped,
    /// The operating system refused to spawn the cycler thread.
    #[error("failed to spawn cycler thread: {0}")]
    Spawn(#[source] std::io::Error),
}
