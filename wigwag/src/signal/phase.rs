use std::fmt;

/// One of the two states of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Stop. Every signal starts here.
    #[default]
    Red,
    /// Go.
    Green,
}

impl Phase {
    /// Returns the other phase.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    #[must_use]
    pub const fn is_green(self) -> bool {
        matches!(self, Self::Green)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Green => f.write_str("green"),
        }
    }
}
