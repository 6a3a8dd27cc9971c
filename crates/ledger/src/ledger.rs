//! The position ledger.

use crate::events::{LifecycleEvent, LifecycleEventKind, MilestoneEvent};
use crate::milestones::{MilestoneKind, MilestoneStatus};
use crate::record::PositionRecord;
use crate::score::{ProviderScore, score_user};
use crate::snapshot::{SnapshotQuery, SnapshotValue};
use crate::stats::UserStats;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::{HashMap, HashSet};
use tidepool_domain::{
    Address, CoreError, FeeBreakdown, PoolId, PoolKey, PositionId, PositionState, TickRange,
};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

/// Configuration for the position ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Capacity of each broadcast event channel.
    pub event_buffer: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { event_buffer: 1000 }
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    positions: HashMap<PositionId, PositionRecord>,
    stats: HashMap<Address, UserStats>,
    milestones: HashMap<Address, MilestoneStatus>,
    pool_interactions: HashMap<Address, HashSet<PoolId>>,
    /// Per-owner position ids. Removal uses swap-remove, so enumeration
    /// order is not stable across removals.
    positions_by_owner: HashMap<Address, Vec<PositionId>>,
    /// Owners in first-seen order, for index enumeration.
    owners: Vec<Address>,
    reporters: HashSet<Address>,
}

impl LedgerInner {
    fn state_of(&self, id: &PositionId) -> PositionState {
        self.positions
            .get(id)
            .map(|record| record.state)
            .unwrap_or(PositionState::NonExistent)
    }

    /// Registers an owner on first contact; a no-op afterwards.
    fn ensure_owner(&mut self, owner: &Address) {
        if !self.stats.contains_key(owner) {
            self.stats.insert(owner.clone(), UserStats::default());
            self.milestones
                .insert(owner.clone(), MilestoneStatus::default());
            self.owners.push(owner.clone());
        }
    }

    /// Re-points a position at `new_owner`, moving index membership and
    /// active attribution. A position already in sync is left untouched.
    ///
    /// The receiving owner's `total_positions` is credited so their active
    /// count can never exceed their total; nothing is taken back from the
    /// previous owner, and fee, volume, and pool history stay where they
    /// were earned.
    fn resync_owner(&mut self, id: PositionId, new_owner: &Address, now: DateTime<Utc>) {
        let (old_owner, was_active) = match self.positions.get(&id) {
            Some(record) => (record.owner.clone(), record.is_active()),
            None => return,
        };
        if old_owner == *new_owner {
            return;
        }
        self.ensure_owner(new_owner);

        if let Some(ids) = self.positions_by_owner.get_mut(&old_owner) {
            if let Some(index) = ids.iter().position(|other| *other == id) {
                ids.swap_remove(index);
            }
        }
        self.positions_by_owner
            .entry(new_owner.clone())
            .or_default()
            .push(id);

        let old_stats = self.stats.entry(old_owner.clone()).or_default();
        if was_active {
            old_stats.active_positions = old_stats.active_positions.saturating_sub(1);
        }
        old_stats.touch(now);

        let new_stats = self.stats.entry(new_owner.clone()).or_default();
        new_stats.total_positions += 1;
        if was_active {
            new_stats.active_positions += 1;
        }
        new_stats.touch(now);

        if let Some(record) = self.positions.get_mut(&id) {
            record.owner = new_owner.clone();
        }
    }

    fn answer(&self, query: &SnapshotQuery) -> Result<SnapshotValue, CoreError> {
        match query {
            SnapshotQuery::Stats { owner } => Ok(SnapshotValue::Stats(
                self.stats.get(owner).cloned().unwrap_or_default(),
            )),
            SnapshotQuery::Position { position } => {
                Ok(SnapshotValue::Position(self.positions.get(position).cloned()))
            }
            SnapshotQuery::Milestones { owner } => Ok(SnapshotValue::Milestones(
                self.milestones.get(owner).copied().unwrap_or_default(),
            )),
            SnapshotQuery::Positions { owner, active_only } => {
                let ids = self
                    .positions_by_owner
                    .get(owner)
                    .map(|ids| {
                        ids.iter()
                            .filter(|id| {
                                !active_only || self.state_of(id) == PositionState::Active
                            })
                            .copied()
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(SnapshotValue::Positions(ids))
            }
            SnapshotQuery::OwnerCount => Ok(SnapshotValue::OwnerCount(self.owners.len())),
            SnapshotQuery::OwnerAt { index } => {
                let owner = self
                    .owners
                    .get(*index)
                    .cloned()
                    .ok_or(CoreError::IndexOutOfBounds {
                        index: *index,
                        len: self.owners.len(),
                    })?;
                Ok(SnapshotValue::OwnerAt(owner))
            }
            SnapshotQuery::PoolInteraction { owner, pool } => Ok(SnapshotValue::PoolInteraction(
                self.pool_interactions
                    .get(owner)
                    .is_some_and(|pools| pools.contains(pool)),
            )),
            SnapshotQuery::Score { owner } => {
                let stats = self.stats.get(owner).cloned().unwrap_or_default();
                Ok(SnapshotValue::Score(score_user(&stats)))
            }
        }
    }
}

/// Authoritative mirror of position lifecycles, per-owner statistics,
/// milestones, and pool interactions.
///
/// Transitions are driven by notifications from the settlement side; each
/// one commits atomically under a single write lock. Reads share the lock
/// and may run concurrently with each other. Event streams are
/// observational: a transition is valid whether or not anyone is
/// subscribed.
pub struct PositionLedger {
    inner: RwLock<LedgerInner>,
    admin: Address,
    events: broadcast::Sender<LifecycleEvent>,
    milestone_events: broadcast::Sender<MilestoneEvent>,
}

impl PositionLedger {
    /// Creates a ledger administered by `admin` with default configuration.
    pub fn new(admin: Address) -> Self {
        Self::with_config(admin, LedgerConfig::default())
    }

    /// Creates a ledger with explicit configuration.
    pub fn with_config(admin: Address, config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer);
        let (milestone_events, _) = broadcast::channel(config.event_buffer);
        Self {
            inner: RwLock::new(LedgerInner::default()),
            admin,
            events,
            milestone_events,
        }
    }

    /// Subscribes to lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Subscribes to milestone notifications.
    pub fn subscribe_milestones(&self) -> broadcast::Receiver<MilestoneEvent> {
        self.milestone_events.subscribe()
    }

    /// Handles a position activation.
    ///
    /// Valid from `NonExistent` (creation) and `Inactive` (reactivation).
    /// Creation counts toward `total_positions` and may flip position and
    /// pool-diversity milestones; reactivation under a drifted owner
    /// re-syncs ownership first.
    pub async fn activate(
        &self,
        id: PositionId,
        owner: Address,
        pool: PoolKey,
        range: TickRange,
        liquidity: u128,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        let (event, crossed) = {
            let mut inner = self.inner.write().await;
            let prior = inner.state_of(&id);
            let is_new = match prior {
                PositionState::NonExistent => true,
                PositionState::Inactive => false,
                actual => {
                    return Err(CoreError::InvalidPositionState {
                        position: id,
                        expected: PositionState::NonExistent,
                        actual,
                    });
                }
            };

            inner.ensure_owner(&owner);
            if is_new {
                inner.positions.insert(
                    id,
                    PositionRecord {
                        owner: owner.clone(),
                        pool: pool.clone(),
                        range,
                        liquidity,
                        created_at: now,
                        state: PositionState::Active,
                    },
                );
                inner
                    .positions_by_owner
                    .entry(owner.clone())
                    .or_default()
                    .push(id);
            } else {
                inner.resync_owner(id, &owner, now);
                if let Some(record) = inner.positions.get_mut(&id) {
                    record.state = PositionState::Active;
                    record.liquidity = liquidity;
                    record.range = range;
                    record.pool = pool.clone();
                }
            }

            let first_pool = inner
                .pool_interactions
                .entry(owner.clone())
                .or_default()
                .insert(pool.id());

            let stats = inner.stats.entry(owner.clone()).or_default();
            if is_new {
                stats.total_positions += 1;
            }
            stats.active_positions += 1;
            stats.total_liquidity_provided =
                stats.total_liquidity_provided.saturating_add(liquidity);
            if first_pool {
                stats.unique_pools += 1;
            }
            stats.touch(now);
            let total_positions = stats.total_positions;
            let unique_pools = stats.unique_pools;

            let status = inner.milestones.entry(owner.clone()).or_default();
            let mut crossed: Vec<(MilestoneKind, Decimal)> = Vec::new();
            if is_new {
                crossed.extend(
                    status
                        .cross_positions(total_positions)
                        .into_iter()
                        .map(|kind| (kind, Decimal::from(total_positions))),
                );
            }
            if first_pool {
                crossed.extend(
                    status
                        .cross_pools(unique_pools)
                        .into_iter()
                        .map(|kind| (kind, Decimal::from(unique_pools))),
                );
            }

            let event = LifecycleEvent::new(
                LifecycleEventKind::Activated,
                id,
                owner.clone(),
                pool.id(),
                liquidity as i128,
                FeeBreakdown::default(),
            );
            (event, crossed)
        };

        info!(
            position = %id,
            owner = %event.owner,
            pool = %event.pool,
            liquidity,
            "Position activated"
        );
        self.emit(event, crossed);
        Ok(())
    }

    /// Handles a full withdrawal that keeps the position alive.
    pub async fn deactivate(&self, id: PositionId) -> Result<(), CoreError> {
        let now = Utc::now();
        let event = {
            let mut inner = self.inner.write().await;
            let actual = inner.state_of(&id);
            if actual != PositionState::Active {
                return Err(CoreError::InvalidPositionState {
                    position: id,
                    expected: PositionState::Active,
                    actual,
                });
            }
            let (owner, pool_id, withdrawn) = match inner.positions.get_mut(&id) {
                Some(record) => {
                    let withdrawn = record.liquidity;
                    record.liquidity = 0;
                    record.state = PositionState::Inactive;
                    (record.owner.clone(), record.pool.id(), withdrawn)
                }
                None => {
                    return Err(CoreError::InvalidPositionState {
                        position: id,
                        expected: PositionState::Active,
                        actual: PositionState::NonExistent,
                    });
                }
            };

            let stats = inner.stats.entry(owner.clone()).or_default();
            stats.active_positions = stats.active_positions.saturating_sub(1);
            stats.touch(now);

            LifecycleEvent::new(
                LifecycleEventKind::Deactivated,
                id,
                owner,
                pool_id,
                -(withdrawn as i128),
                FeeBreakdown::default(),
            )
        };

        info!(position = %id, owner = %event.owner, "Position deactivated");
        self.emit(event, Vec::new());
        Ok(())
    }

    /// Handles a liquidity change on an active position.
    ///
    /// The change applies to both the position's liquidity and the owner's
    /// liquidity total, each clamping at zero on over-withdrawal; positive
    /// fee components credit the owner and may flip fee milestones.
    pub async fn modify(
        &self,
        id: PositionId,
        liquidity_change: i128,
        fees: FeeBreakdown,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        let (event, crossed) = {
            let mut inner = self.inner.write().await;
            let actual = inner.state_of(&id);
            if actual != PositionState::Active {
                return Err(CoreError::InvalidPositionState {
                    position: id,
                    expected: PositionState::Active,
                    actual,
                });
            }
            let (owner, pool_id) = match inner.positions.get_mut(&id) {
                Some(record) => {
                    record.liquidity = if liquidity_change >= 0 {
                        record.liquidity.saturating_add(liquidity_change as u128)
                    } else {
                        record.liquidity.saturating_sub(liquidity_change.unsigned_abs())
                    };
                    (record.owner.clone(), record.pool.id())
                }
                None => {
                    return Err(CoreError::InvalidPositionState {
                        position: id,
                        expected: PositionState::Active,
                        actual: PositionState::NonExistent,
                    });
                }
            };

            let credited = fees.credited_total();
            let stats = inner.stats.entry(owner.clone()).or_default();
            stats.total_liquidity_provided = if liquidity_change >= 0 {
                stats
                    .total_liquidity_provided
                    .saturating_add(liquidity_change as u128)
            } else {
                stats
                    .total_liquidity_provided
                    .saturating_sub(liquidity_change.unsigned_abs())
            };
            if credited > 0 {
                stats.total_fees_earned = stats.total_fees_earned.saturating_add(credited);
            }
            stats.touch(now);
            let total_fees = stats.total_fees_earned;

            let crossed = if credited > 0 {
                let status = inner.milestones.entry(owner.clone()).or_default();
                status
                    .cross_fees(total_fees)
                    .into_iter()
                    .map(|kind| {
                        (
                            kind,
                            Decimal::from_u128(total_fees).unwrap_or(Decimal::MAX),
                        )
                    })
                    .collect()
            } else {
                Vec::new()
            };

            let event = LifecycleEvent::new(
                LifecycleEventKind::LiquidityModified,
                id,
                owner,
                pool_id,
                liquidity_change,
                fees,
            );
            (event, crossed)
        };

        debug!(
            position = %id,
            owner = %event.owner,
            delta = liquidity_change,
            "Position liquidity modified"
        );
        self.emit(event, crossed);
        Ok(())
    }

    /// Handles a burn. Terminal: no transition leaves `Burned`.
    ///
    /// `liquidity_at_burn` re-syncs the record before zeroing, so the
    /// emitted delta reflects what the venue actually released. A drifted
    /// owner is re-synced first, and positive fee components credit the
    /// final owner.
    pub async fn destroy(
        &self,
        id: PositionId,
        owner: Address,
        liquidity_at_burn: u128,
        fees: FeeBreakdown,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        let (event, crossed) = {
            let mut inner = self.inner.write().await;
            let actual = inner.state_of(&id);
            if actual == PositionState::NonExistent || actual == PositionState::Burned {
                return Err(CoreError::InvalidPositionState {
                    position: id,
                    expected: PositionState::Active,
                    actual,
                });
            }

            inner.resync_owner(id, &owner, now);
            let (pool_id, was_active) = match inner.positions.get_mut(&id) {
                Some(record) => {
                    let was_active = record.is_active();
                    record.liquidity = 0;
                    record.state = PositionState::Burned;
                    (record.pool.id(), was_active)
                }
                None => {
                    return Err(CoreError::InvalidPositionState {
                        position: id,
                        expected: PositionState::Active,
                        actual: PositionState::NonExistent,
                    });
                }
            };

            let credited = fees.credited_total();
            let stats = inner.stats.entry(owner.clone()).or_default();
            if was_active {
                stats.active_positions = stats.active_positions.saturating_sub(1);
            }
            if credited > 0 {
                stats.total_fees_earned = stats.total_fees_earned.saturating_add(credited);
            }
            stats.touch(now);
            let total_fees = stats.total_fees_earned;

            let crossed = if credited > 0 {
                let status = inner.milestones.entry(owner.clone()).or_default();
                status
                    .cross_fees(total_fees)
                    .into_iter()
                    .map(|kind| {
                        (
                            kind,
                            Decimal::from_u128(total_fees).unwrap_or(Decimal::MAX),
                        )
                    })
                    .collect()
            } else {
                Vec::new()
            };

            let event = LifecycleEvent::new(
                LifecycleEventKind::Destroyed,
                id,
                owner.clone(),
                pool_id,
                -(liquidity_at_burn as i128),
                fees,
            );
            (event, crossed)
        };

        info!(position = %id, owner = %event.owner, "Position destroyed");
        self.emit(event, crossed);
        Ok(())
    }

    /// Re-points a position at its current external owner.
    ///
    /// Emits no lifecycle event; a position already in sync is a no-op.
    pub async fn sync_owner(&self, id: PositionId, new_owner: Address) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        match inner.state_of(&id) {
            PositionState::NonExistent => {
                return Err(CoreError::InvalidPositionState {
                    position: id,
                    expected: PositionState::Active,
                    actual: PositionState::NonExistent,
                });
            }
            PositionState::Burned => {
                return Err(CoreError::InvalidPositionState {
                    position: id,
                    expected: PositionState::Active,
                    actual: PositionState::Burned,
                });
            }
            _ => {}
        }
        inner.resync_owner(id, &new_owner, Utc::now());
        info!(position = %id, new_owner = %new_owner, "Position owner synced");
        Ok(())
    }

    /// Records reported swap volume for an owner.
    ///
    /// Only allow-listed reporters may call this. Counts one swap, adds the
    /// USD amount, tracks the pool interaction, and may flip volume and
    /// pool-diversity milestones.
    pub async fn record_volume(
        &self,
        reporter: &Address,
        owner: Address,
        pool: PoolId,
        amount: Decimal,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        let crossed = {
            let mut inner = self.inner.write().await;
            if !inner.reporters.contains(reporter) {
                return Err(CoreError::InvalidCaller {
                    caller: reporter.clone(),
                });
            }
            inner.ensure_owner(&owner);

            let first_pool = inner
                .pool_interactions
                .entry(owner.clone())
                .or_default()
                .insert(pool.clone());

            let stats = inner.stats.entry(owner.clone()).or_default();
            stats.total_swaps += 1;
            stats.total_volume_usd += amount;
            if first_pool {
                stats.unique_pools += 1;
            }
            stats.touch(now);
            let total_volume = stats.total_volume_usd;
            let unique_pools = stats.unique_pools;

            let status = inner.milestones.entry(owner.clone()).or_default();
            let mut crossed: Vec<(MilestoneKind, Decimal)> = status
                .cross_volume(total_volume)
                .into_iter()
                .map(|kind| (kind, total_volume))
                .collect();
            if first_pool {
                crossed.extend(
                    status
                        .cross_pools(unique_pools)
                        .into_iter()
                        .map(|kind| (kind, Decimal::from(unique_pools))),
                );
            }

            debug!(
                owner = %owner,
                pool = %pool,
                amount = %amount,
                "Volume recorded"
            );
            crossed
                .into_iter()
                .map(|(kind, value)| MilestoneEvent::new(owner.clone(), kind, value))
                .collect::<Vec<_>>()
        };

        for event in crossed {
            info!(owner = %event.owner, kind = ?event.kind, value = %event.value, "Milestone reached");
            let _ = self.milestone_events.send(event);
        }
        Ok(())
    }

    /// Adds a volume reporter. Admin only.
    pub async fn add_reporter(&self, caller: &Address, reporter: Address) -> Result<(), CoreError> {
        if *caller != self.admin {
            return Err(CoreError::InvalidCaller {
                caller: caller.clone(),
            });
        }
        info!(reporter = %reporter, "Volume reporter added");
        self.inner.write().await.reporters.insert(reporter);
        Ok(())
    }

    /// Removes a volume reporter. Admin only.
    pub async fn remove_reporter(
        &self,
        caller: &Address,
        reporter: &Address,
    ) -> Result<(), CoreError> {
        if *caller != self.admin {
            return Err(CoreError::InvalidCaller {
                caller: caller.clone(),
            });
        }
        info!(reporter = %reporter, "Volume reporter removed");
        self.inner.write().await.reporters.remove(reporter);
        Ok(())
    }

    /// True when the address is an allow-listed reporter.
    pub async fn is_reporter(&self, address: &Address) -> bool {
        self.inner.read().await.reporters.contains(address)
    }

    /// Statistics for an owner; zeroed defaults for one never seen.
    pub async fn stats(&self, owner: &Address) -> UserStats {
        self.inner
            .read()
            .await
            .stats
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Milestone flags for an owner; all clear for one never seen.
    pub async fn milestone_status(&self, owner: &Address) -> MilestoneStatus {
        self.inner
            .read()
            .await
            .milestones
            .get(owner)
            .copied()
            .unwrap_or_default()
    }

    /// Record for a position, if it ever existed.
    pub async fn position(&self, id: &PositionId) -> Option<PositionRecord> {
        self.inner.read().await.positions.get(id).cloned()
    }

    /// Lifecycle state of a position; `NonExistent` if never created.
    pub async fn state_of(&self, id: &PositionId) -> PositionState {
        self.inner.read().await.state_of(id)
    }

    /// Position ids attributed to an owner, optionally active ones only.
    ///
    /// Order is not stable across removals.
    pub async fn positions_of(&self, owner: &Address, active_only: bool) -> Vec<PositionId> {
        let inner = self.inner.read().await;
        inner
            .positions_by_owner
            .get(owner)
            .map(|ids| {
                ids.iter()
                    .filter(|id| !active_only || inner.state_of(id) == PositionState::Active)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when the owner has ever touched the pool.
    pub async fn has_interacted(&self, owner: &Address, pool: &PoolId) -> bool {
        self.inner
            .read()
            .await
            .pool_interactions
            .get(owner)
            .is_some_and(|pools| pools.contains(pool))
    }

    /// Number of owners ever registered.
    pub async fn owner_count(&self) -> usize {
        self.inner.read().await.owners.len()
    }

    /// Owner at `index` in first-seen order.
    pub async fn owner_at(&self, index: usize) -> Result<Address, CoreError> {
        let inner = self.inner.read().await;
        inner
            .owners
            .get(index)
            .cloned()
            .ok_or(CoreError::IndexOutOfBounds {
                index,
                len: inner.owners.len(),
            })
    }

    /// Deterministic provider score for an owner.
    pub async fn score(&self, owner: &Address) -> ProviderScore {
        let stats = self.stats(owner).await;
        score_user(&stats)
    }

    /// Answers a batch of snapshot queries under one read lock.
    ///
    /// Results arrive in request order; the first failing query fails the
    /// whole batch.
    pub(crate) async fn read_batch(
        &self,
        queries: &[SnapshotQuery],
    ) -> Result<Vec<SnapshotValue>, CoreError> {
        let inner = self.inner.read().await;
        let mut values = Vec::with_capacity(queries.len());
        for query in queries {
            values.push(inner.answer(query)?);
        }
        Ok(values)
    }

    fn emit(&self, event: LifecycleEvent, crossed: Vec<(MilestoneKind, Decimal)>) {
        let owner = event.owner.clone();
        let _ = self.events.send(event);
        for (kind, value) in crossed {
            info!(owner = %owner, kind = ?kind, value = %value, "Milestone reached");
            let _ = self
                .milestone_events
                .send(MilestoneEvent::new(owner.clone(), kind, value));
        }
    }
}
