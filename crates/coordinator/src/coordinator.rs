//! Orchestration of rebalance and arbitrage operations.

use crate::ownership::OwnershipSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tidepool_domain::{
    Address, CoreError, CurrencyDelta, FeeBreakdown, PoolKey, PositionId, PositionState,
    TickRange,
};
use tidepool_ledger::ledger::PositionLedger;
use tidepool_settlement::actions::{LiquidityParams, SwapParams};
use tidepool_settlement::engine::{SettleMode, SettlementEngine, validate_deltas};
use tidepool_settlement::vault::Vault;
use tidepool_settlement::venue::VenueAdapter;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Widest acceptable band above a positive minimum delta, in basis
    /// points. Deltas further above the caller's minimum than this are
    /// rejected as quote manipulation.
    pub max_slippage_bps: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_slippage_bps: 500,
        }
    }
}

/// Parameters of one orchestrated rebalance.
///
/// Transient: built at entry, dropped when the call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    /// Position being restructured.
    pub position: PositionId,
    /// Pool the liquidity moves to; `None` keeps the current pool.
    pub target_pool: Option<PoolKey>,
    /// Range the liquidity moves to.
    pub new_range: TickRange,
    /// Minimum acceptable deltas, in currency order.
    pub min_deltas: Vec<i128>,
    /// Latest instant the operation may begin.
    pub deadline: DateTime<Utc>,
}

/// Per-user operation analytics kept by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Completed rebalances, same-pool and cross-pool.
    pub rebalances: u64,
    /// The cross-pool subset of `rebalances`.
    pub cross_pool_rebalances: u64,
    /// Completed arbitrages.
    pub arbitrages: u64,
    /// Cumulative value the user paid in across operations.
    pub total_cost: u128,
    /// Cumulative value paid out to the user across operations.
    pub total_profit: u128,
    /// When the user last completed an operation.
    pub last_operation_at: Option<DateTime<Utc>>,
}

enum OperationKind {
    SamePool,
    CrossPool,
    Arbitrage,
}

/// Validates and orchestrates user-initiated restructuring operations.
///
/// Each entry point runs one settlement unit end to end: validate, quote,
/// check the outcome against the caller's minimums, settle, then notify
/// the ledger. A guard flag keeps entry points mutually exclusive; the
/// settlement engine's own unit guard backs it up underneath.
pub struct RebalanceCoordinator<V, T, O> {
    engine: Arc<SettlementEngine<V, T>>,
    venue: Arc<V>,
    ledger: Arc<PositionLedger>,
    ownership: Arc<O>,
    config: CoordinatorConfig,
    analytics: RwLock<HashMap<Address, OperationStats>>,
    in_flight: AtomicBool,
}

struct OpGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl<V: VenueAdapter, T: Vault, O: OwnershipSource> RebalanceCoordinator<V, T, O> {
    /// Creates a coordinator with default configuration.
    pub fn new(
        engine: Arc<SettlementEngine<V, T>>,
        venue: Arc<V>,
        ledger: Arc<PositionLedger>,
        ownership: Arc<O>,
    ) -> Self {
        Self::with_config(engine, venue, ledger, ownership, CoordinatorConfig::default())
    }

    /// Creates a coordinator with explicit configuration.
    pub fn with_config(
        engine: Arc<SettlementEngine<V, T>>,
        venue: Arc<V>,
        ledger: Arc<PositionLedger>,
        ownership: Arc<O>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            engine,
            venue,
            ledger,
            ownership,
            config,
            analytics: RwLock::new(HashMap::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Moves a position's liquidity to a new range in its current pool.
    ///
    /// Returns the id of the replacement position.
    pub async fn rebalance_same_pool(
        &self,
        caller: &Address,
        position: PositionId,
        new_range: TickRange,
        min_deltas: Vec<i128>,
        deadline: DateTime<Utc>,
    ) -> Result<PositionId, CoreError> {
        self.rebalance(
            caller,
            RebalanceRequest {
                position,
                target_pool: None,
                new_range,
                min_deltas,
                deadline,
            },
        )
        .await
    }

    /// Moves a position's liquidity to a new range in another pool over
    /// the same currency pair.
    ///
    /// Returns the id of the replacement position.
    pub async fn rebalance_cross_pool(
        &self,
        caller: &Address,
        position: PositionId,
        target_pool: PoolKey,
        new_range: TickRange,
        min_deltas: Vec<i128>,
        deadline: DateTime<Utc>,
    ) -> Result<PositionId, CoreError> {
        self.rebalance(
            caller,
            RebalanceRequest {
                position,
                target_pool: Some(target_pool),
                new_range,
                min_deltas,
                deadline,
            },
        )
        .await
    }

    /// Runs a multi-leg arbitrage and settles its profit to the caller.
    ///
    /// `min_profit` is validated positionally against the unit's deltas in
    /// currency order; any leg sequence that nets no positive delta fails
    /// before settlement.
    pub async fn execute_arbitrage(
        &self,
        caller: &Address,
        swaps: Vec<SwapParams>,
        min_profit: Vec<i128>,
    ) -> Result<Vec<CurrencyDelta>, CoreError> {
        let _guard = self.acquire()?;
        let legs = swaps.len();

        let (unit, deltas) = self.engine.execute_arbitrage(caller.clone(), swaps).await?;
        validate_deltas(&deltas, &min_profit)?;
        unit.settle_all(SettleMode::Transfer).await?;

        self.note_operation(caller, OperationKind::Arbitrage, &deltas)
            .await;
        info!(
            caller = %caller,
            legs,
            currencies = deltas.len(),
            "Arbitrage settled"
        );
        Ok(deltas)
    }

    /// Analytics for a caller; zeroed defaults for one never seen.
    pub async fn operation_stats(&self, caller: &Address) -> OperationStats {
        self.analytics
            .read()
            .await
            .get(caller)
            .cloned()
            .unwrap_or_default()
    }

    async fn rebalance(
        &self,
        caller: &Address,
        request: RebalanceRequest,
    ) -> Result<PositionId, CoreError> {
        let _guard = self.acquire()?;

        let owner = self
            .ownership
            .owner_of(&request.position)
            .await
            .ok_or_else(|| CoreError::PositionNotOwned {
                position: request.position,
                caller: caller.clone(),
            })?;
        if owner != *caller {
            return Err(CoreError::PositionNotOwned {
                position: request.position,
                caller: caller.clone(),
            });
        }

        request.new_range.validate()?;
        if Utc::now() > request.deadline {
            return Err(CoreError::DeadlineExpired {
                deadline: request.deadline,
            });
        }

        let record = self.ledger.position(&request.position).await.ok_or(
            CoreError::InvalidPositionState {
                position: request.position,
                expected: PositionState::Active,
                actual: PositionState::NonExistent,
            },
        )?;
        if record.state != PositionState::Active {
            return Err(CoreError::InvalidPositionState {
                position: request.position,
                expected: PositionState::Active,
                actual: record.state,
            });
        }
        if record.liquidity == 0 {
            return Err(CoreError::InsufficientLiquidity { available: 0 });
        }

        let target_pool = match &request.target_pool {
            Some(target) if !target.same_pair(&record.pool) => {
                let foreign = if record.pool.contains(&target.currency0) {
                    target.currency1.clone()
                } else {
                    target.currency0.clone()
                };
                return Err(CoreError::CurrencyMismatch {
                    currency: foreign,
                    pool: record.pool.id(),
                });
            }
            Some(target) => target.clone(),
            None => record.pool.clone(),
        };

        let (fees0, fees1) = self
            .venue
            .fees_accrued(&record.pool, &request.position)
            .await?;
        let fees = FeeBreakdown::new(fees0, fees1);

        let mut unit = self.engine.begin(caller.clone())?;
        let deltas = unit
            .close_and_reopen(
                LiquidityParams {
                    pool: record.pool.clone(),
                    range: record.range,
                    liquidity: record.liquidity,
                },
                LiquidityParams {
                    pool: target_pool.clone(),
                    range: request.new_range,
                    liquidity: record.liquidity,
                },
            )
            .await?;
        debug!(
            position = %request.position,
            currencies = deltas.len(),
            "Rebalance legs quoted"
        );

        // The quote path can re-enter external code; the owner must not
        // have changed underneath the unit.
        let still_owner = self.ownership.owner_of(&request.position).await;
        if still_owner.as_ref() != Some(&owner) {
            warn!(
                position = %request.position,
                caller = %caller,
                "Owner changed mid-flight, aborting rebalance"
            );
            return Err(CoreError::PositionNotOwned {
                position: request.position,
                caller: caller.clone(),
            });
        }

        validate_deltas(&deltas, &request.min_deltas)?;
        self.enforce_slippage(&deltas, &request.min_deltas)?;
        unit.settle_all(SettleMode::Transfer).await?;

        self.ledger
            .destroy(request.position, owner.clone(), record.liquidity, fees)
            .await?;
        let new_position = PositionId::new();
        self.ledger
            .activate(
                new_position,
                owner.clone(),
                target_pool.clone(),
                request.new_range,
                record.liquidity,
            )
            .await?;

        let kind = if request.target_pool.is_some() {
            OperationKind::CrossPool
        } else {
            OperationKind::SamePool
        };
        self.note_operation(caller, kind, &deltas).await;
        info!(
            caller = %caller,
            position = %request.position,
            new_position = %new_position,
            pool = %target_pool,
            range = %request.new_range,
            "Rebalance settled"
        );
        Ok(new_position)
    }

    fn acquire(&self) -> Result<OpGuard<'_>, CoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::OperationInFlight);
        }
        Ok(OpGuard {
            flag: &self.in_flight,
        })
    }

    /// Rejects deltas that land too far above a strictly positive minimum.
    fn enforce_slippage(
        &self,
        deltas: &[CurrencyDelta],
        minimums: &[i128],
    ) -> Result<(), CoreError> {
        for (delta, minimum) in deltas.iter().zip(minimums) {
            if *minimum <= 0 {
                continue;
            }
            let limit = minimum
                .saturating_add(minimum.saturating_mul(self.config.max_slippage_bps as i128) / 10_000);
            if delta.amount > limit {
                return Err(CoreError::SlippageExceeded {
                    currency: delta.currency.clone(),
                    delta: delta.amount,
                    limit,
                });
            }
        }
        Ok(())
    }

    async fn note_operation(
        &self,
        caller: &Address,
        kind: OperationKind,
        deltas: &[CurrencyDelta],
    ) {
        let mut analytics = self.analytics.write().await;
        let entry = analytics.entry(caller.clone()).or_default();
        match kind {
            OperationKind::SamePool => entry.rebalances += 1,
            OperationKind::CrossPool => {
                entry.rebalances += 1;
                entry.cross_pool_rebalances += 1;
            }
            OperationKind::Arbitrage => entry.arbitrages += 1,
        }
        for delta in deltas {
            if delta.amount > 0 {
                entry.total_profit = entry.total_profit.saturating_add(delta.amount as u128);
            } else {
                entry.total_cost = entry.total_cost.saturating_add(delta.amount.unsigned_abs());
            }
        }
        entry.last_operation_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::InMemoryOwnership;
    use chrono::Duration;
    use tidepool_domain::Currency;
    use tidepool_settlement::vault::InMemoryVault;
    use tidepool_settlement::venue::{PoolSnapshot, StaticVenue, SwapQuote};

    struct Harness {
        venue: Arc<StaticVenue>,
        vault: Arc<InMemoryVault>,
        engine: Arc<SettlementEngine<StaticVenue, InMemoryVault>>,
        ledger: Arc<PositionLedger>,
        ownership: Arc<InMemoryOwnership>,
        coordinator: RebalanceCoordinator<StaticVenue, InMemoryVault, InMemoryOwnership>,
    }

    fn old_pool() -> PoolKey {
        PoolKey::new("USDC".into(), "WETH".into(), 3000)
    }

    fn old_range() -> TickRange {
        TickRange::new(-600, 600)
    }

    fn new_range() -> TickRange {
        TickRange::new(-300, 300)
    }

    fn deadline() -> DateTime<Utc> {
        Utc::now() + Duration::minutes(5)
    }

    fn alice() -> Address {
        "alice".into()
    }

    fn bob() -> Address {
        "bob".into()
    }

    async fn harness_with_position() -> (Harness, PositionId) {
        let venue = Arc::new(StaticVenue::new());
        let vault = Arc::new(InMemoryVault::new());
        let engine = Arc::new(SettlementEngine::new(venue.clone(), vault.clone()));
        let ledger = Arc::new(PositionLedger::new("admin".into()));
        let ownership = Arc::new(InMemoryOwnership::new());
        let coordinator = RebalanceCoordinator::new(
            engine.clone(),
            venue.clone(),
            ledger.clone(),
            ownership.clone(),
        );

        let position = PositionId::new();
        ledger
            .activate(position, alice(), old_pool(), old_range(), 1_000)
            .await
            .unwrap();
        ownership.set_owner(position, alice()).await;

        (
            Harness {
                venue,
                vault,
                engine,
                ledger,
                ownership,
                coordinator,
            },
            position,
        )
    }

    #[tokio::test]
    async fn same_pool_rebalance_replaces_the_position() {
        let (h, position) = harness_with_position().await;
        h.venue
            .set_liquidity_quote(&old_pool(), old_range(), (5_000, 5_000))
            .await;
        h.venue
            .set_liquidity_quote(&old_pool(), new_range(), (4_800, 4_900))
            .await;
        h.venue
            .set_fees_accrued(&old_pool(), position, (40, 25))
            .await;

        let new_position = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![195, 96], deadline())
            .await
            .unwrap();
        assert_ne!(new_position, position);

        assert_eq!(h.ledger.state_of(&position).await, PositionState::Burned);
        let record = h.ledger.position(&new_position).await.unwrap();
        assert_eq!(record.state, PositionState::Active);
        assert_eq!(record.pool, old_pool());
        assert_eq!(record.range, new_range());
        assert_eq!(record.liquidity, 1_000);

        let stats = h.ledger.stats(&alice()).await;
        assert_eq!(stats.total_positions, 2);
        assert_eq!(stats.active_positions, 1);
        assert_eq!(stats.total_fees_earned, 65);

        // Net positive deltas were paid out by the vault.
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 200);
        assert_eq!(h.vault.balance_of(&alice(), &"WETH".into()).await, 100);

        let ops = h.coordinator.operation_stats(&alice()).await;
        assert_eq!(ops.rebalances, 1);
        assert_eq!(ops.cross_pool_rebalances, 0);
        assert_eq!(ops.total_profit, 300);
        assert!(ops.last_operation_at.is_some());
    }

    #[tokio::test]
    async fn inverted_range_rejects_and_mutates_nothing() {
        let (h, position) = harness_with_position().await;

        let err = h
            .coordinator
            .rebalance_same_pool(
                &alice(),
                position,
                TickRange::new(600, -600),
                vec![],
                deadline(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTickRange { .. }));

        let record = h.ledger.position(&position).await.unwrap();
        assert_eq!(record.state, PositionState::Active);
        assert_eq!(record.liquidity, 1_000);
        let stats = h.ledger.stats(&alice()).await;
        assert_eq!(stats.total_positions, 1);
        assert_eq!(stats.active_positions, 1);
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 0);
        assert_eq!(h.coordinator.operation_stats(&alice()).await.rebalances, 0);
    }

    #[tokio::test]
    async fn only_the_current_owner_may_rebalance() {
        let (h, position) = harness_with_position().await;

        let err = h
            .coordinator
            .rebalance_same_pool(&"bob".into(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PositionNotOwned { .. }));

        // A position the registry does not know is nobody's.
        let unknown = PositionId::new();
        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), unknown, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PositionNotOwned { .. }));

        // After an external transfer the registry, not the ledger record,
        // decides who may rebalance; the burn re-syncs the record.
        h.ownership.set_owner(position, bob()).await;
        let new_position = h
            .coordinator
            .rebalance_same_pool(&bob(), position, new_range(), vec![], deadline())
            .await
            .unwrap();
        assert_eq!(h.ledger.position(&new_position).await.unwrap().owner, bob());

        let bob_stats = h.ledger.stats(&bob()).await;
        assert_eq!(bob_stats.total_positions, 2);
        assert_eq!(bob_stats.active_positions, 1);
        let alice_stats = h.ledger.stats(&alice()).await;
        assert_eq!(alice_stats.active_positions, 0);
    }

    #[tokio::test]
    async fn expired_deadline_is_rejected() {
        let (h, position) = harness_with_position().await;
        let stale = Utc::now() - Duration::seconds(1);

        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], stale)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeadlineExpired { .. }));
    }

    #[tokio::test]
    async fn drained_position_cannot_rebalance() {
        let (h, position) = harness_with_position().await;
        h.ledger
            .modify(position, -1_000, FeeBreakdown::default())
            .await
            .unwrap();

        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientLiquidity { available: 0 }));

        // An inactive position fails on state, not liquidity.
        h.ledger.deactivate(position).await.unwrap();
        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidPositionState {
                actual: PositionState::Inactive,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn excessive_positive_delta_is_slippage() {
        let (h, position) = harness_with_position().await;
        h.venue
            .set_liquidity_quote(&old_pool(), old_range(), (5_000, 5_000))
            .await;
        h.venue
            .set_liquidity_quote(&old_pool(), new_range(), (4_800, 4_900))
            .await;

        // USDC nets +200 against a minimum of 100; the 5% band tops out at
        // 105.
        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![100, 96], deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SlippageExceeded {
                delta: 200,
                limit: 105,
                ..
            }
        ));

        // Nothing settled, nothing burned.
        assert_eq!(h.ledger.state_of(&position).await, PositionState::Active);
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 0);
        assert!(h.engine.begin(alice()).is_ok());
    }

    #[tokio::test]
    async fn cross_pool_requires_the_same_pair() {
        let (h, position) = harness_with_position().await;
        let foreign_pool = PoolKey::new("DAI".into(), "USDC".into(), 500);

        let err = h
            .coordinator
            .rebalance_cross_pool(
                &alice(),
                position,
                foreign_pool,
                new_range(),
                vec![],
                deadline(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::CurrencyMismatch { currency: Currency(ref c), .. } if c == "DAI"
        ));
    }

    #[tokio::test]
    async fn cross_pool_rebalance_lands_in_the_target_fee_tier() {
        let (h, position) = harness_with_position().await;
        let target = PoolKey::new("USDC".into(), "WETH".into(), 500);
        h.venue
            .set_liquidity_quote(&old_pool(), old_range(), (600, 400))
            .await;
        // Target quotes fall back to an even split: (500, 500).
        h.vault.credit(&alice(), &"WETH".into(), 100).await;

        let new_position = h
            .coordinator
            .rebalance_cross_pool(
                &alice(),
                position,
                target.clone(),
                new_range(),
                vec![0, -100],
                deadline(),
            )
            .await
            .unwrap();

        let record = h.ledger.position(&new_position).await.unwrap();
        assert_eq!(record.pool, target);
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 100);
        assert_eq!(h.vault.balance_of(&alice(), &"WETH".into()).await, 0);

        let ops = h.coordinator.operation_stats(&alice()).await;
        assert_eq!(ops.rebalances, 1);
        assert_eq!(ops.cross_pool_rebalances, 1);
        assert_eq!(ops.total_profit, 100);
        assert_eq!(ops.total_cost, 100);
    }

    #[tokio::test]
    async fn owner_change_mid_flight_aborts_cleanly() {
        struct FlippingVenue {
            inner: StaticVenue,
            ownership: Arc<InMemoryOwnership>,
            position: PositionId,
        }

        #[async_trait::async_trait]
        impl VenueAdapter for FlippingVenue {
            async fn quote_swap(
                &self,
                pool: &PoolKey,
                currency_in: &Currency,
                amount_in: i128,
            ) -> Result<SwapQuote, CoreError> {
                self.inner.quote_swap(pool, currency_in, amount_in).await
            }

            async fn quote_liquidity(
                &self,
                pool: &PoolKey,
                range: &TickRange,
                liquidity: u128,
            ) -> Result<(i128, i128), CoreError> {
                // The quote path hands control to external code, which here
                // re-points the position at another owner.
                self.ownership
                    .set_owner(self.position, "mallory".into())
                    .await;
                self.inner.quote_liquidity(pool, range, liquidity).await
            }

            async fn fees_accrued(
                &self,
                pool: &PoolKey,
                position: &PositionId,
            ) -> Result<(i128, i128), CoreError> {
                self.inner.fees_accrued(pool, position).await
            }

            async fn pool_snapshot(&self, pool: &PoolKey) -> Result<PoolSnapshot, CoreError> {
                self.inner.pool_snapshot(pool).await
            }
        }

        let ownership = Arc::new(InMemoryOwnership::new());
        let position = PositionId::new();
        let venue = Arc::new(FlippingVenue {
            inner: StaticVenue::new(),
            ownership: ownership.clone(),
            position,
        });
        let vault = Arc::new(InMemoryVault::new());
        let engine = Arc::new(SettlementEngine::new(venue.clone(), vault.clone()));
        let ledger = Arc::new(PositionLedger::new("admin".into()));
        let coordinator = RebalanceCoordinator::new(
            engine.clone(),
            venue.clone(),
            ledger.clone(),
            ownership.clone(),
        );
        ledger
            .activate(position, alice(), old_pool(), old_range(), 1_000)
            .await
            .unwrap();
        ownership.set_owner(position, alice()).await;

        let err = coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PositionNotOwned { .. }));

        // Nothing moved, nothing burned, both guards released.
        let record = ledger.position(&position).await.unwrap();
        assert_eq!(record.state, PositionState::Active);
        assert_eq!(record.liquidity, 1_000);
        assert_eq!(vault.balance_of(&alice(), &"USDC".into()).await, 0);
        assert!(engine.begin(alice()).is_ok());
        let err = coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PositionNotOwned { .. }));
    }

    #[tokio::test]
    async fn entry_points_share_one_guard() {
        let (h, position) = harness_with_position().await;

        h.coordinator.in_flight.store(true, Ordering::SeqCst);
        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::OperationInFlight);
        let err = h
            .coordinator
            .execute_arbitrage(&alice(), vec![], vec![])
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::OperationInFlight);
        h.coordinator.in_flight.store(false, Ordering::SeqCst);

        assert!(
            h.coordinator
                .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn open_settlement_unit_blocks_the_pipeline() {
        let (h, position) = harness_with_position().await;
        let unit = h.engine.begin("someone".into()).unwrap();

        let err = h
            .coordinator
            .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::OperationInFlight);

        drop(unit);
        assert!(
            h.coordinator
                .rebalance_same_pool(&alice(), position, new_range(), vec![], deadline())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn arbitrage_profit_is_validated_then_settled() {
        let (h, _) = harness_with_position().await;
        h.venue
            .set_swap_quote(&old_pool(), &"WETH".into(), 110)
            .await;
        let swaps = vec![
            SwapParams {
                pool: old_pool(),
                currency_in: "USDC".into(),
                amount_in: 100,
            },
            SwapParams {
                pool: old_pool(),
                currency_in: "WETH".into(),
                amount_in: 100,
            },
        ];

        // A bar above the realized profit rejects before settlement.
        let err = h
            .coordinator
            .execute_arbitrage(&alice(), swaps.clone(), vec![20])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeltaBelowMinimum { delta: 10, minimum: 20, .. }));
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 0);

        let deltas = h
            .coordinator
            .execute_arbitrage(&alice(), swaps, vec![10])
            .await
            .unwrap();
        assert_eq!(deltas, vec![CurrencyDelta::new("USDC".into(), 10)]);
        assert_eq!(h.vault.balance_of(&alice(), &"USDC".into()).await, 10);

        let ops = h.coordinator.operation_stats(&alice()).await;
        assert_eq!(ops.arbitrages, 1);
        assert_eq!(ops.total_profit, 10);
    }

    #[tokio::test]
    async fn arbitrage_propagates_engine_rejections() {
        let (h, _) = harness_with_position().await;

        let err = h
            .coordinator
            .execute_arbitrage(
                &alice(),
                vec![SwapParams {
                    pool: old_pool(),
                    currency_in: "USDC".into(),
                    amount_in: 100,
                }],
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 2, actual: 1 }));

        // A flat round trip nets nothing anywhere.
        let err = h
            .coordinator
            .execute_arbitrage(
                &alice(),
                vec![
                    SwapParams {
                        pool: old_pool(),
                        currency_in: "USDC".into(),
                        amount_in: 100,
                    },
                    SwapParams {
                        pool: old_pool(),
                        currency_in: "WETH".into(),
                        amount_in: 100,
                    },
                ],
                vec![],
            )
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NoProfit);
        assert_eq!(err.class(), tidepool_domain::ErrorClass::Outcome);
    }
}
