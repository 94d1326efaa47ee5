//! Timing configuration for the cycler.
//!
//! The cycler waits a random interval between every two transitions. The
//! interval is drawn uniformly from `[min_interval, max_interval]`, both ends
//! included.
//!
//! - **Default**: 4s to 6s, entropy-seeded.
//! - **Tests**: [`CyclerConfig::immediate`] flips as fast as the thread runs;
//!   [`CyclerConfig::with_seed`] makes the interval sequence reproducible.

use std::time::Duration;

use crate::trace::warn;

/// Error building a [`CyclerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The lower bound is greater than the upper bound.
    #[error("min interval {min:?} exceeds max interval {max:?}")]
    InvertedBounds { min: Duration, max: Duration },
}

/// Interval bounds and RNG seed for the [`Cycler`](super::Cycler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclerConfig {
    min_interval: Duration,
    max_interval: Duration,
    seed: Option<u64>,
}

impl CyclerConfig {
    /// Lower bound of the default interval.
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(4);

    /// Upper bound of the default interval.
    pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(6);

    /// Creates a configuration with the given inclusive bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvertedBounds`] if `min_interval > max_interval`.
    pub fn new(min_interval: Duration, max_interval: Duration) -> Result<Self, ConfigError> {
        if min_interval > max_interval {
            warn!(?min_interval, ?max_interval, "rejecting inverted cycler bounds");
            return Err(ConfigError::InvertedBounds {
                min: min_interval,
                max: max_interval,
            });
        }
        Ok(Self {
            min_interval,
            max_interval,
            seed: None,
        })
    }

    /// Zero-length interval: the cycler toggles back to back.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            min_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            seed: None,
        }
    }

    /// Seeds the cycler's RNG so the interval sequence repeats across runs.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for CyclerConfig {
    fn default() -> Self {
        Self {
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            max_interval: Self::DEFAULT_MAX_INTERVAL,
            seed: None,
        }
    }
}
