//! Per-owner running statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cumulative statistics for one owner.
///
/// Counters only ever grow, except `active_positions`, which stays within
/// `0..=total_positions`, and `total_liquidity_provided`, which follows
/// liquidity decreases and clamps at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    /// First notification that touched this owner.
    pub first_action_at: Option<DateTime<Utc>>,
    /// Most recent notification that touched this owner.
    pub last_action_at: Option<DateTime<Utc>>,
    /// Positions ever attributed to this owner.
    pub total_positions: u64,
    /// Positions currently active.
    pub active_positions: u64,
    /// Distinct pools this owner has interacted with.
    pub unique_pools: u64,
    /// Swaps reported for this owner.
    pub total_swaps: u64,
    /// Net liquidity units provided, clamped at zero on decrease.
    pub total_liquidity_provided: u128,
    /// Fee units ever earned, summed across currencies.
    pub total_fees_earned: u128,
    /// Reported volume in USD units.
    pub total_volume_usd: Decimal,
}

impl UserStats {
    /// Marks an action at `now`, pinning the first-seen time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.first_action_at.is_none() {
            self.first_action_at = Some(now);
        }
        self.last_action_at = Some(now);
    }
}
