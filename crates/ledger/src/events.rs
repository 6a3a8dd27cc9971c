//! Lifecycle and milestone notifications.

use crate::milestones::MilestoneKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tidepool_domain::{Address, FeeBreakdown, PoolId, PositionId};
use uuid::Uuid;

/// Kind of position lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventKind {
    /// Position became active.
    Activated,
    /// Position was fully withdrawn without burning.
    Deactivated,
    /// Live liquidity changed or fees were compounded.
    LiquidityModified,
    /// Position was burned.
    Destroyed,
}

/// Notification emitted after a position transition commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unique event ID.
    pub id: String,
    /// What happened.
    pub kind: LifecycleEventKind,
    /// Position the transition touched.
    pub position: PositionId,
    /// Owner at the time of the transition.
    pub owner: Address,
    /// Pool the position belongs to.
    pub pool: PoolId,
    /// Signed liquidity change observed by the transition.
    pub liquidity_delta: i128,
    /// Fee components reported with the transition.
    pub fees: FeeBreakdown,
    /// When the transition committed.
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Creates an event stamped now with a fresh ID.
    pub fn new(
        kind: LifecycleEventKind,
        position: PositionId,
        owner: Address,
        pool: PoolId,
        liquidity_delta: i128,
        fees: FeeBreakdown,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            position,
            owner,
            pool,
            liquidity_delta,
            fees,
            timestamp: Utc::now(),
        }
    }
}

/// Notification emitted when a milestone flag flips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneEvent {
    /// Unique event ID.
    pub id: String,
    /// Owner who reached the milestone.
    pub owner: Address,
    /// Which milestone was reached.
    pub kind: MilestoneKind,
    /// Counter value that crossed the threshold.
    pub value: Decimal,
    /// When the flag flipped.
    pub timestamp: DateTime<Utc>,
}

impl MilestoneEvent {
    /// Creates an event stamped now with a fresh ID.
    pub fn new(owner: Address, kind: MilestoneKind, value: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner,
            kind,
            value,
            timestamp: Utc::now(),
        }
    }
}
