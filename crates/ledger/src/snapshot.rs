//! Fail-fast batched reads over a shared ledger.

use crate::ledger::PositionLedger;
use crate::milestones::MilestoneStatus;
use crate::record::PositionRecord;
use crate::score::ProviderScore;
use crate::stats::UserStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tidepool_domain::{Address, CoreError, PoolId, PositionId};

/// One read against the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotQuery {
    /// Statistics for an owner.
    Stats { owner: Address },
    /// Record for a position, if it ever existed.
    Position { position: PositionId },
    /// Milestone flags for an owner.
    Milestones { owner: Address },
    /// Position ids attributed to an owner.
    Positions { owner: Address, active_only: bool },
    /// Number of owners ever registered.
    OwnerCount,
    /// Owner at an index in first-seen order.
    OwnerAt { index: usize },
    /// Whether an owner has ever touched a pool.
    PoolInteraction { owner: Address, pool: PoolId },
    /// Provider score for an owner.
    Score { owner: Address },
}

/// Answer to one [`SnapshotQuery`], at the matching batch position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotValue {
    /// Answer to [`SnapshotQuery::Stats`].
    Stats(UserStats),
    /// Answer to [`SnapshotQuery::Position`].
    Position(Option<PositionRecord>),
    /// Answer to [`SnapshotQuery::Milestones`].
    Milestones(MilestoneStatus),
    /// Answer to [`SnapshotQuery::Positions`].
    Positions(Vec<PositionId>),
    /// Answer to [`SnapshotQuery::OwnerCount`].
    OwnerCount(usize),
    /// Answer to [`SnapshotQuery::OwnerAt`].
    OwnerAt(Address),
    /// Answer to [`SnapshotQuery::PoolInteraction`].
    PoolInteraction(bool),
    /// Answer to [`SnapshotQuery::Score`].
    Score(ProviderScore),
}

/// Read-only view over a shared ledger.
///
/// A batch is answered under one read lock, so every value reflects the
/// same instant. The first failing query fails the whole batch; partial
/// results are never returned.
#[derive(Clone)]
pub struct SnapshotReader {
    ledger: Arc<PositionLedger>,
}

impl SnapshotReader {
    /// Creates a reader over the given ledger.
    pub fn new(ledger: Arc<PositionLedger>) -> Self {
        Self { ledger }
    }

    /// Answers a single query.
    pub async fn query(&self, query: SnapshotQuery) -> Result<SnapshotValue, CoreError> {
        let mut values = self.ledger.read_batch(std::slice::from_ref(&query)).await?;
        values.pop().ok_or(CoreError::IndexOutOfBounds { index: 0, len: 0 })
    }

    /// Answers a batch of queries in request order.
    pub async fn query_batch(
        &self,
        queries: &[SnapshotQuery],
    ) -> Result<Vec<SnapshotValue>, CoreError> {
        self.ledger.read_batch(queries).await
    }
}
