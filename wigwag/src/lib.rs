//! A two-phase signal that broadcasts its transitions to blocked threads.
//!
//! - [`sync`]: the blocking FIFO [`Transport`](sync::Transport), its per-subscriber
//!   [`Broadcast`](sync::Broadcast) fan-out, and the cancellable [`StopSignal`](sync::StopSignal).
//! - [`signal`]: the [`Phase`](signal::Phase), the [`PhaseController`](signal::PhaseController)
//!   that owns it, and the background [`Cycler`](signal::Cycler) that flips it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use wigwag::signal::{CyclerConfig, Phase, PhaseController};
//!
//! let controller = PhaseController::new(CyclerConfig::immediate());
//! assert_eq!(controller.current_phase(), Phase::Red);
//!
//! controller.start().expect("first start");
//! controller
//!     .wait_for_green_timeout(Duration::from_secs(1))
//!     .expect("green within a second");
//! controller.shutdown();
//! ```

pub mod signal;
pub mod sync;

mod trace;

pub use trace::init_tracing;
