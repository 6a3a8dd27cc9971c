//! Deterministic provider scoring.
//!
//! The score is a pure function of [`UserStats`]: five capped integer
//! sub-scores summing to at most 100, with a tier label derived from the
//! total. All arithmetic is fixed-point; two ledgers with the same stats
//! produce the same score on any platform.

use crate::stats::UserStats;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Tier label derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreTier {
    /// Total below 20.
    Newcomer,
    /// Total 20 to 39.
    Bronze,
    /// Total 40 to 59.
    Silver,
    /// Total 60 to 79.
    Gold,
    /// Total 80 and above.
    Platinum,
}

impl ScoreTier {
    /// Tier for a total score.
    #[must_use]
    pub fn for_total(total: u32) -> Self {
        match total {
            80.. => ScoreTier::Platinum,
            60..=79 => ScoreTier::Gold,
            40..=59 => ScoreTier::Silver,
            20..=39 => ScoreTier::Bronze,
            _ => ScoreTier::Newcomer,
        }
    }
}

/// Provider score broken into its sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderScore {
    /// Months of tenure, 1 point per 30 days, capped at 20.
    pub tenure: u32,
    /// Volume tier points, capped at 25.
    pub volume: u32,
    /// Fee-per-liquidity efficiency points, capped at 20.
    pub fee_efficiency: u32,
    /// Pool diversity points, capped at 15.
    pub pool_diversity: u32,
    /// Lifetime activity points, capped at 20.
    pub activity: u32,
    /// Sum of the sub-scores, at most 100.
    pub total: u32,
    /// Tier label for the total.
    pub tier: ScoreTier,
}

/// Scores an owner's statistics.
#[must_use]
pub fn score_user(stats: &UserStats) -> ProviderScore {
    let tenure = tenure_points(stats);
    let volume = volume_points(stats.total_volume_usd);
    let fee_efficiency = fee_efficiency_points(stats);
    let pool_diversity = diversity_points(stats.unique_pools);
    let activity = activity_points(stats.total_positions.saturating_add(stats.total_swaps));
    let total = tenure + volume + fee_efficiency + pool_diversity + activity;
    ProviderScore {
        tenure,
        volume,
        fee_efficiency,
        pool_diversity,
        activity,
        total,
        tier: ScoreTier::for_total(total),
    }
}

fn tenure_points(stats: &UserStats) -> u32 {
    match (stats.first_action_at, stats.last_action_at) {
        (Some(first), Some(last)) => {
            let days = (last - first).num_days().max(0) as u64;
            (days / 30).min(20) as u32
        }
        _ => 0,
    }
}

fn volume_points(volume: Decimal) -> u32 {
    if volume >= Decimal::from(1_000_000u64) {
        25
    } else if volume >= Decimal::from(100_000u64) {
        20
    } else if volume >= Decimal::from(10_000u64) {
        15
    } else if volume >= Decimal::from(1_000u64) {
        10
    } else if volume > Decimal::ZERO {
        5
    } else {
        0
    }
}

fn fee_efficiency_points(stats: &UserStats) -> u32 {
    if stats.total_liquidity_provided == 0 || stats.total_fees_earned == 0 {
        return 0;
    }
    let fees = Decimal::from_u128(stats.total_fees_earned).unwrap_or(Decimal::MAX);
    let liquidity = Decimal::from_u128(stats.total_liquidity_provided).unwrap_or(Decimal::MAX);
    let ratio = fees / liquidity;
    if ratio >= Decimal::new(1, 1) {
        20
    } else if ratio >= Decimal::new(1, 2) {
        15
    } else if ratio >= Decimal::new(1, 3) {
        10
    } else {
        5
    }
}

fn diversity_points(unique_pools: u64) -> u32 {
    match unique_pools {
        50.. => 15,
        20..=49 => 12,
        5..=19 => 8,
        2..=4 => 4,
        1 => 2,
        0 => 0,
    }
}

fn activity_points(actions: u64) -> u32 {
    match actions {
        1_000.. => 20,
        100..=999 => 15,
        10..=99 => 10,
        1..=9 => 5,
        0 => 0,
    }
}
