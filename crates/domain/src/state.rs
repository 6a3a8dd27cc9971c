//! Position lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a position
///
/// Valid transitions: `NonExistent -> Active`, `Active <-> Inactive`,
/// `Active | Inactive -> Burned`. `Burned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionState {
    /// Never created, or queried before its first activation
    NonExistent,
    /// Holding live liquidity
    Active,
    /// Fully withdrawn but not burned
    Inactive,
    /// Burned; no further transitions are possible
    Burned,
}

impl PositionState {
    /// True when no further transitions are possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionState::Burned)
    }
}
