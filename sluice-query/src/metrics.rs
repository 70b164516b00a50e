//! Optimizer score type.

use std::fmt;

/// How much of a pipeline an optimizer can push down into SQL.
///
/// A score of `0` means "cannot optimize"; higher is better. Scores are
/// compared by natural integer order, with ties between optimizers broken
/// by registration order in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Metrics(u32);

impl Metrics {
    /// The "cannot optimize" score.
    pub const ZERO: Self = Self(0);

    /// Create a score.
    pub const fn new(score: u32) -> Self {
        Self(score)
    }

    /// The raw score.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this score means "cannot optimize".
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Metrics {
    fn from(score: u32) -> Self {
        Self(score)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
