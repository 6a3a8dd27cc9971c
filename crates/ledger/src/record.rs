//! Per-position records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidepool_domain::{Address, PoolKey, PositionState, TickRange};

/// Everything the ledger tracks about one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Current owner.
    pub owner: Address,
    /// Pool the position provides liquidity to.
    pub pool: PoolKey,
    /// Tick range the liquidity sits in.
    pub range: TickRange,
    /// Live liquidity; zero while inactive or burned.
    pub liquidity: u128,
    /// When the position was first activated.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: PositionState,
}

impl PositionRecord {
    /// True while the position holds live liquidity.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == PositionState::Active
    }
}
