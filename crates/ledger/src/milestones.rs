//! One-shot achievement milestones.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A milestone an owner can reach exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MilestoneKind {
    /// First position ever activated.
    FirstPosition,
    /// 10 positions created.
    Positions10,
    /// 50 positions created.
    Positions50,
    /// 100 positions created.
    Positions100,
    /// 5 distinct pools interacted with.
    Pools5,
    /// 20 distinct pools interacted with.
    Pools20,
    /// 50 distinct pools interacted with.
    Pools50,
    /// 100 fee units earned.
    Fees100,
    /// 1,000 fee units earned.
    Fees1k,
    /// 10,000 fee units earned.
    Fees10k,
    /// 1,000 volume units reported.
    Volume1k,
    /// 10,000 volume units reported.
    Volume10k,
    /// 100,000 volume units reported.
    Volume100k,
    /// 1,000,000 volume units reported.
    Volume1m,
}

const POSITION_LADDER: [(u64, MilestoneKind); 4] = [
    (1, MilestoneKind::FirstPosition),
    (10, MilestoneKind::Positions10),
    (50, MilestoneKind::Positions50),
    (100, MilestoneKind::Positions100),
];

const POOL_LADDER: [(u64, MilestoneKind); 3] = [
    (5, MilestoneKind::Pools5),
    (20, MilestoneKind::Pools20),
    (50, MilestoneKind::Pools50),
];

const FEE_LADDER: [(u128, MilestoneKind); 3] = [
    (100, MilestoneKind::Fees100),
    (1_000, MilestoneKind::Fees1k),
    (10_000, MilestoneKind::Fees10k),
];

const VOLUME_LADDER: [(u64, MilestoneKind); 4] = [
    (1_000, MilestoneKind::Volume1k),
    (10_000, MilestoneKind::Volume10k),
    (100_000, MilestoneKind::Volume100k),
    (1_000_000, MilestoneKind::Volume1m),
];

/// Write-once milestone flags for one owner.
///
/// A flag, once set, never clears; crossing a threshold a second time flips
/// nothing and emits nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneStatus {
    /// First position ever activated.
    pub first_position: bool,
    /// 10 positions created.
    pub positions_10: bool,
    /// 50 positions created.
    pub positions_50: bool,
    /// 100 positions created.
    pub positions_100: bool,
    /// 5 distinct pools interacted with.
    pub pools_5: bool,
    /// 20 distinct pools interacted with.
    pub pools_20: bool,
    /// 50 distinct pools interacted with.
    pub pools_50: bool,
    /// 100 fee units earned.
    pub fees_100: bool,
    /// 1,000 fee units earned.
    pub fees_1k: bool,
    /// 10,000 fee units earned.
    pub fees_10k: bool,
    /// 1,000 volume units reported.
    pub volume_1k: bool,
    /// 10,000 volume units reported.
    pub volume_10k: bool,
    /// 100,000 volume units reported.
    pub volume_100k: bool,
    /// 1,000,000 volume units reported.
    pub volume_1m: bool,
}

impl MilestoneStatus {
    /// True when the flag for `kind` has been set.
    #[must_use]
    pub fn is_set(&self, kind: MilestoneKind) -> bool {
        match kind {
            MilestoneKind::FirstPosition => self.first_position,
            MilestoneKind::Positions10 => self.positions_10,
            MilestoneKind::Positions50 => self.positions_50,
            MilestoneKind::Positions100 => self.positions_100,
            MilestoneKind::Pools5 => self.pools_5,
            MilestoneKind::Pools20 => self.pools_20,
            MilestoneKind::Pools50 => self.pools_50,
            MilestoneKind::Fees100 => self.fees_100,
            MilestoneKind::Fees1k => self.fees_1k,
            MilestoneKind::Fees10k => self.fees_10k,
            MilestoneKind::Volume1k => self.volume_1k,
            MilestoneKind::Volume10k => self.volume_10k,
            MilestoneKind::Volume100k => self.volume_100k,
            MilestoneKind::Volume1m => self.volume_1m,
        }
    }

    /// Number of flags set so far.
    #[must_use]
    pub fn count_set(&self) -> usize {
        [
            self.first_position,
            self.positions_10,
            self.positions_50,
            self.positions_100,
            self.pools_5,
            self.pools_20,
            self.pools_50,
            self.fees_100,
            self.fees_1k,
            self.fees_10k,
            self.volume_1k,
            self.volume_10k,
            self.volume_100k,
            self.volume_1m,
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Flips every position-count rung `total` reaches; returns the newly
    /// flipped kinds in ladder order.
    pub fn cross_positions(&mut self, total: u64) -> Vec<MilestoneKind> {
        let mut crossed = Vec::new();
        for (threshold, kind) in POSITION_LADDER {
            if total >= threshold && self.set(kind) {
                crossed.push(kind);
            }
        }
        crossed
    }

    /// Flips every pool-diversity rung `unique` reaches.
    pub fn cross_pools(&mut self, unique: u64) -> Vec<MilestoneKind> {
        let mut crossed = Vec::new();
        for (threshold, kind) in POOL_LADDER {
            if unique >= threshold && self.set(kind) {
                crossed.push(kind);
            }
        }
        crossed
    }

    /// Flips every fee rung `total` reaches.
    pub fn cross_fees(&mut self, total: u128) -> Vec<MilestoneKind> {
        let mut crossed = Vec::new();
        for (threshold, kind) in FEE_LADDER {
            if total >= threshold && self.set(kind) {
                crossed.push(kind);
            }
        }
        crossed
    }

    /// Flips every volume rung `total` reaches.
    pub fn cross_volume(&mut self, total: Decimal) -> Vec<MilestoneKind> {
        let mut crossed = Vec::new();
        for (threshold, kind) in VOLUME_LADDER {
            if total >= Decimal::from(threshold) && self.set(kind) {
                crossed.push(kind);
            }
        }
        crossed
    }

    /// Sets the flag; true when it was not set before.
    fn set(&mut self, kind: MilestoneKind) -> bool {
        let flag = match kind {
            MilestoneKind::FirstPosition => &mut self.first_position,
            MilestoneKind::Positions10 => &mut self.positions_10,
            MilestoneKind::Positions50 => &mut self.positions_50,
            MilestoneKind::Positions100 => &mut self.positions_100,
            MilestoneKind::Pools5 => &mut self.pools_5,
            MilestoneKind::Pools20 => &mut self.pools_20,
            MilestoneKind::Pools50 => &mut self.pools_50,
            MilestoneKind::Fees100 => &mut self.fees_100,
            MilestoneKind::Fees1k => &mut self.fees_1k,
            MilestoneKind::Fees10k => &mut self.fees_10k,
            MilestoneKind::Volume1k => &mut self.volume_1k,
            MilestoneKind::Volume10k => &mut self.volume_10k,
            MilestoneKind::Volume100k => &mut self.volume_100k,
            MilestoneKind::Volume1m => &mut self.volume_1m,
        };
        let newly = !*flag;
        *flag = true;
        newly
    }
}
