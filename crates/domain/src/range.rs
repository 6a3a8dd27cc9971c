//! Tick ranges and global tick bounds.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest tick any range may reference
pub const MIN_TICK: i32 = -887_272;

/// Highest tick any range may reference
pub const MAX_TICK: i32 = 887_272;

/// Half-open price band expressed as a pair of tick indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    /// Inclusive lower tick
    pub lower: i32,
    /// Exclusive upper tick
    pub upper: i32,
}

impl TickRange {
    /// Creates a range without validating it
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    /// Checks ordering and the global tick bounds
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.lower >= self.upper || self.lower < MIN_TICK || self.upper > MAX_TICK {
            return Err(CoreError::InvalidTickRange {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }

    /// True when the tick falls inside the range
    #[must_use]
    pub fn contains(&self, tick: i32) -> bool {
        self.lower <= tick && tick < self.upper
    }

    /// Number of ticks the range spans
    #[must_use]
    pub fn width(&self) -> u32 {
        (self.upper as i64 - self.lower as i64).max(0) as u32
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}
