//! Settlement engine and unit sessions.

use crate::actions::{Action, ActionOutcome, LiquidityParams, SwapParams};
use crate::claims::ClaimBook;
use crate::delta::CurrencyLedger;
use crate::vault::Vault;
use crate::venue::VenueAdapter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tidepool_domain::{Address, CoreError, Currency, CurrencyDelta};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How a unit's outstanding deltas are discharged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleMode {
    /// Move value through the vault.
    Transfer,
    /// Mint and burn claims instead of moving value.
    Claims,
}

/// Validates settled deltas against caller minimums, positionally.
///
/// Deltas arrive in currency order, so `min_expected` must be supplied in
/// the same order.
pub fn validate_deltas(deltas: &[CurrencyDelta], min_expected: &[i128]) -> Result<(), CoreError> {
    if deltas.len() != min_expected.len() {
        return Err(CoreError::LengthMismatch {
            expected: min_expected.len(),
            actual: deltas.len(),
        });
    }
    for (delta, minimum) in deltas.iter().zip(min_expected) {
        if delta.amount < *minimum {
            return Err(CoreError::DeltaBelowMinimum {
                currency: delta.currency.clone(),
                delta: delta.amount,
                minimum: *minimum,
            });
        }
    }
    Ok(())
}

/// Turns actions into deltas and deltas into settlements.
///
/// At most one unit is open at a time; `begin` rejects a nested open with
/// `OperationInFlight`. Claim balances are the only state that survives
/// across units.
pub struct SettlementEngine<V, T> {
    venue: Arc<V>,
    vault: Arc<T>,
    claims: RwLock<ClaimBook>,
    in_flight: AtomicBool,
}

impl<V, T> fmt::Debug for SettlementEngine<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<V: VenueAdapter, T: Vault> SettlementEngine<V, T> {
    /// Creates an engine over the given venue and vault.
    pub fn new(venue: Arc<V>, vault: Arc<T>) -> Self {
        Self {
            venue,
            vault,
            claims: RwLock::new(ClaimBook::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Opens a settlement unit for `caller`.
    ///
    /// Dropping the returned unit without settling aborts it: quotes never
    /// moved value, so nothing external has to be undone.
    pub fn begin(&self, caller: Address) -> Result<SettlementUnit<'_, V, T>, CoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::OperationInFlight);
        }
        debug!(caller = %caller, "Settlement unit opened");
        Ok(SettlementUnit {
            engine: self,
            caller,
            ledger: CurrencyLedger::new(),
        })
    }

    /// Runs a single action in its own unit and settles it by transfer.
    ///
    /// Returns the serialized [`ActionOutcome`], the byte result of
    /// pass-through execution.
    pub async fn execute_one(&self, caller: Address, action: Action) -> Result<Vec<u8>, CoreError> {
        let mut unit = self.begin(caller)?;
        let outcome = unit.execute(action).await?;
        unit.settle_all(SettleMode::Transfer).await?;
        serde_json::to_vec(&outcome).map_err(|e| CoreError::Encoding {
            reason: e.to_string(),
        })
    }

    /// Runs a multi-leg arbitrage in one unit.
    ///
    /// Requires at least two swap legs and a strictly positive net delta in
    /// at least one currency; the still-open unit is returned alongside the
    /// deltas so the caller can validate minimums before settling.
    pub async fn execute_arbitrage(
        &self,
        caller: Address,
        swaps: Vec<SwapParams>,
    ) -> Result<(SettlementUnit<'_, V, T>, Vec<CurrencyDelta>), CoreError> {
        if swaps.len() < 2 {
            return Err(CoreError::LengthMismatch {
                expected: 2,
                actual: swaps.len(),
            });
        }
        let legs = swaps.len();
        let mut unit = self.begin(caller)?;
        for params in swaps {
            unit.execute(Action::Swap(params)).await?;
        }
        let deltas = unit.deltas();
        if !deltas.iter().any(|delta| delta.amount > 0) {
            return Err(CoreError::NoProfit);
        }
        info!(
            caller = %unit.caller,
            legs,
            currencies = deltas.len(),
            "Arbitrage legs executed"
        );
        Ok((unit, deltas))
    }

    /// Claims currently held by `holder` in `currency`.
    pub async fn claim_balance(&self, holder: &Address, currency: &Currency) -> u128 {
        self.claims.read().await.balance_of(holder, currency)
    }

    /// Moves claims between holders outside any unit.
    pub async fn transfer_claims(
        &self,
        from: &Address,
        to: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), CoreError> {
        self.claims
            .write()
            .await
            .transfer(from, to, currency, amount)
    }
}

/// One atomic settlement session.
///
/// Actions execute strictly in submission order and each observes the
/// balances left by its predecessors. The unit either settles completely or
/// is dropped; there is no partial commit.
pub struct SettlementUnit<'a, V, T> {
    engine: &'a SettlementEngine<V, T>,
    caller: Address,
    ledger: CurrencyLedger,
}

impl<V, T> fmt::Debug for SettlementUnit<'_, V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementUnit")
            .field("caller", &self.caller)
            .field("deltas", &self.ledger.deltas())
            .finish_non_exhaustive()
    }
}

impl<V, T> Drop for SettlementUnit<'_, V, T> {
    fn drop(&mut self) {
        self.engine.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<'a, V: VenueAdapter, T: Vault> SettlementUnit<'a, V, T> {
    /// Executes one action, posting its deltas.
    pub async fn execute(&mut self, action: Action) -> Result<ActionOutcome, CoreError> {
        match action {
            Action::Swap(params) => self.execute_swap(params).await,
            Action::AddLiquidity(params) => {
                let (amount0, amount1) = self.quote_pair(&params).await?;
                self.ledger.post(&params.pool.currency0, -amount0)?;
                self.ledger.post(&params.pool.currency1, -amount1)?;
                Ok(ActionOutcome::LiquidityAdded {
                    pool: params.pool.id(),
                    amount0,
                    amount1,
                })
            }
            Action::RemoveLiquidity(params) => {
                if params.liquidity == 0 {
                    return Err(CoreError::InsufficientLiquidity { available: 0 });
                }
                let (amount0, amount1) = self.quote_pair(&params).await?;
                self.ledger.post(&params.pool.currency0, amount0)?;
                self.ledger.post(&params.pool.currency1, amount1)?;
                Ok(ActionOutcome::LiquidityRemoved {
                    pool: params.pool.id(),
                    amount0,
                    amount1,
                })
            }
            Action::CollectFees(params) => {
                let (amount0, amount1) = self
                    .engine
                    .venue
                    .fees_accrued(&params.pool, &params.position)
                    .await?;
                self.ledger.post(&params.pool.currency0, amount0)?;
                self.ledger.post(&params.pool.currency1, amount1)?;
                Ok(ActionOutcome::FeesCollected {
                    position: params.position,
                    amount0,
                    amount1,
                })
            }
            Action::Donate(params) => {
                self.ledger.post(&params.pool.currency0, -params.amount0)?;
                self.ledger.post(&params.pool.currency1, -params.amount1)?;
                Ok(ActionOutcome::Donated {
                    pool: params.pool.id(),
                    amount0: params.amount0,
                    amount1: params.amount1,
                })
            }
        }
    }

    /// Executes actions in order and returns the non-zero deltas.
    pub async fn execute_batch(
        &mut self,
        actions: Vec<Action>,
    ) -> Result<Vec<CurrencyDelta>, CoreError> {
        for action in actions {
            self.execute(action).await?;
        }
        Ok(self.deltas())
    }

    /// Runs a remove leg then an add leg so overlapping currencies net
    /// before settlement.
    pub async fn close_and_reopen(
        &mut self,
        remove: LiquidityParams,
        add: LiquidityParams,
    ) -> Result<Vec<CurrencyDelta>, CoreError> {
        self.execute(Action::RemoveLiquidity(remove)).await?;
        self.execute(Action::AddLiquidity(add)).await?;
        Ok(self.deltas())
    }

    /// Current signed balance for `currency`.
    #[must_use]
    pub fn net_delta(&self, currency: &Currency) -> i128 {
        self.ledger.net_delta(currency)
    }

    /// Non-zero balances in currency order.
    #[must_use]
    pub fn deltas(&self) -> Vec<CurrencyDelta> {
        self.ledger.deltas()
    }

    /// Strictly settles one currency through the vault.
    ///
    /// `amount` must equal the outstanding magnitude exactly.
    pub async fn settle(&mut self, currency: &Currency, amount: i128) -> Result<(), CoreError> {
        let cleared = self.ledger.settle(currency, amount)?;
        if cleared > 0 {
            self.engine
                .vault
                .pay_out(&self.caller, currency, cleared)
                .await?;
        } else if cleared < 0 {
            self.engine
                .vault
                .collect(&self.caller, currency, -cleared)
                .await?;
        }
        Ok(())
    }

    /// Strictly settles one currency against the claim book.
    pub async fn settle_with_claims(
        &mut self,
        currency: &Currency,
        amount: i128,
    ) -> Result<(), CoreError> {
        let cleared = self.ledger.settle(currency, amount)?;
        let mut claims = self.engine.claims.write().await;
        if cleared > 0 {
            claims.mint(&self.caller, currency, cleared as u128)?;
        } else if cleared < 0 {
            claims.burn(&self.caller, currency, (-cleared) as u128)?;
        }
        Ok(())
    }

    /// Discharges every outstanding balance and closes the unit.
    ///
    /// Positive balances pay out (or mint claims), negative balances collect
    /// (or burn claims). Collections and burns run before payouts and mints;
    /// on failure any movement already made is reversed, leaving vault and
    /// claim balances where they started. The unit must net to zero
    /// afterwards; a remaining balance is a `DeltaMismatch`.
    pub async fn settle_all(mut self, mode: SettleMode) -> Result<(), CoreError> {
        let mut deltas = self.ledger.deltas();
        // Collections first: a short counterparty then aborts the unit
        // before any value has left the vault or the claim book.
        deltas.sort_by_key(|delta| delta.amount > 0);
        let mut moved: Vec<CurrencyDelta> = Vec::with_capacity(deltas.len());
        for delta in &deltas {
            let settled = match mode {
                SettleMode::Transfer => self.settle(&delta.currency, delta.amount.abs()).await,
                SettleMode::Claims => {
                    self.settle_with_claims(&delta.currency, delta.amount.abs())
                        .await
                }
            };
            if let Err(err) = settled {
                self.reverse(&moved, mode).await;
                return Err(err);
            }
            moved.push(delta.clone());
        }
        if let Some(open) = self.ledger.deltas().first() {
            return Err(CoreError::DeltaMismatch {
                currency: open.currency.clone(),
                outstanding: open.amount,
                supplied: 0,
            });
        }
        info!(
            caller = %self.caller,
            currencies = deltas.len(),
            mode = ?mode,
            "Settlement unit closed"
        );
        Ok(())
    }

    /// Puts back movements a failed `settle_all` already made, newest first.
    async fn reverse(&self, moved: &[CurrencyDelta], mode: SettleMode) {
        for delta in moved.iter().rev() {
            let undone = match mode {
                SettleMode::Transfer => {
                    if delta.amount > 0 {
                        self.engine
                            .vault
                            .collect(&self.caller, &delta.currency, delta.amount)
                            .await
                    } else {
                        self.engine
                            .vault
                            .pay_out(&self.caller, &delta.currency, -delta.amount)
                            .await
                    }
                }
                SettleMode::Claims => {
                    let mut claims = self.engine.claims.write().await;
                    if delta.amount > 0 {
                        claims.burn(&self.caller, &delta.currency, delta.amount as u128)
                    } else {
                        claims.mint(&self.caller, &delta.currency, (-delta.amount) as u128)
                    }
                }
            };
            if let Err(err) = undone {
                warn!(
                    caller = %self.caller,
                    currency = %delta.currency,
                    error = %err,
                    "Could not reverse a settled movement"
                );
            }
        }
    }

    async fn execute_swap(&mut self, params: SwapParams) -> Result<ActionOutcome, CoreError> {
        if !params.pool.contains(&params.currency_in) {
            return Err(CoreError::CurrencyMismatch {
                currency: params.currency_in.clone(),
                pool: params.pool.id(),
            });
        }
        let quote = self
            .engine
            .venue
            .quote_swap(&params.pool, &params.currency_in, params.amount_in)
            .await?;
        self.ledger.post(&params.currency_in, -params.amount_in)?;
        self.ledger.post(&quote.currency_out, quote.amount_out)?;
        debug!(
            pool = %params.pool,
            currency_in = %params.currency_in,
            amount_in = params.amount_in,
            amount_out = quote.amount_out,
            "Swap leg posted"
        );
        Ok(ActionOutcome::Swap {
            currency_in: params.currency_in,
            amount_in: params.amount_in,
            currency_out: quote.currency_out,
            amount_out: quote.amount_out,
        })
    }

    async fn quote_pair(&self, params: &LiquidityParams) -> Result<(i128, i128), CoreError> {
        self.engine
            .venue
            .quote_liquidity(&params.pool, &params.range, params.liquidity)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::InMemoryVault;
    use crate::venue::StaticVenue;
    use tidepool_domain::{PoolKey, PositionId, TickRange};

    fn pool() -> PoolKey {
        PoolKey::new("USDC".into(), "WETH".into(), 500)
    }

    fn engine() -> SettlementEngine<StaticVenue, InMemoryVault> {
        SettlementEngine::new(Arc::new(StaticVenue::new()), Arc::new(InMemoryVault::new()))
    }

    fn swap(currency_in: &str, amount_in: i128) -> SwapParams {
        SwapParams {
            pool: pool(),
            currency_in: currency_in.into(),
            amount_in,
        }
    }

    #[tokio::test]
    async fn only_one_unit_at_a_time() {
        let engine = engine();
        let unit = engine.begin("alice".into()).unwrap();
        let err = engine.begin("bob".into()).unwrap_err();
        assert_eq!(err, CoreError::OperationInFlight);

        drop(unit);
        assert!(engine.begin("bob".into()).is_ok());
    }

    #[tokio::test]
    async fn zero_sum_batch_settles_without_movement() {
        let engine = engine();
        let mut unit = engine.begin("alice".into()).unwrap();

        // Unscripted swaps quote 1:1, so a round trip nets to zero.
        let deltas = unit
            .execute_batch(vec![
                Action::Swap(swap("USDC", 1_000)),
                Action::Swap(swap("WETH", 1_000)),
            ])
            .await
            .unwrap();
        assert!(deltas.is_empty());

        unit.settle_all(SettleMode::Transfer).await.unwrap();
        assert_eq!(
            engine
                .vault
                .balance_of(&"alice".into(), &"USDC".into())
                .await,
            0
        );
        assert_eq!(
            engine
                .vault
                .balance_of(&"alice".into(), &"WETH".into())
                .await,
            0
        );
    }

    #[tokio::test]
    async fn later_actions_observe_earlier_balances() {
        let engine = engine();
        engine
            .venue
            .set_swap_quote(&pool(), &"USDC".into(), 900)
            .await;

        let mut unit = engine.begin("alice".into()).unwrap();
        unit.execute(Action::Swap(swap("USDC", 1_000))).await.unwrap();
        assert_eq!(unit.net_delta(&"USDC".into()), -1_000);
        assert_eq!(unit.net_delta(&"WETH".into()), 900);

        unit.execute(Action::Swap(swap("WETH", 900))).await.unwrap();
        assert_eq!(unit.net_delta(&"WETH".into()), 0);
        assert_eq!(unit.net_delta(&"USDC".into()), -100);
    }

    #[tokio::test]
    async fn transfer_settlement_collects_what_the_caller_owes() {
        let engine = engine();
        let alice: Address = "alice".into();
        engine.vault.credit(&alice, &"USDC".into(), 10_000).await;
        engine.vault.credit(&alice, &"WETH".into(), 1_000).await;
        engine
            .venue
            .set_liquidity_quote(&pool(), TickRange::new(-60, 60), (600, 400))
            .await;

        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::AddLiquidity(LiquidityParams {
            pool: pool(),
            range: TickRange::new(-60, 60),
            liquidity: 1_000,
        }))
        .await
        .unwrap();
        unit.settle_all(SettleMode::Transfer).await.unwrap();

        // Both legs were owed by the caller.
        assert_eq!(engine.vault.balance_of(&alice, &"USDC".into()).await, 9_400);
        assert_eq!(engine.vault.balance_of(&alice, &"WETH".into()).await, 600);
    }

    #[tokio::test]
    async fn claims_mode_touches_claims_not_the_vault() {
        let engine = engine();
        let alice: Address = "alice".into();
        engine
            .venue
            .set_liquidity_quote(&pool(), TickRange::new(-60, 60), (600, 400))
            .await;

        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::RemoveLiquidity(LiquidityParams {
            pool: pool(),
            range: TickRange::new(-60, 60),
            liquidity: 1_000,
        }))
        .await
        .unwrap();
        unit.settle_all(SettleMode::Claims).await.unwrap();

        assert_eq!(engine.claim_balance(&alice, &"USDC".into()).await, 600);
        assert_eq!(engine.claim_balance(&alice, &"WETH".into()).await, 400);
        assert_eq!(engine.vault.balance_of(&alice, &"USDC".into()).await, 0);

        // A later unit can spend the claims it minted.
        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::AddLiquidity(LiquidityParams {
            pool: pool(),
            range: TickRange::new(-60, 60),
            liquidity: 1_000,
        }))
        .await
        .unwrap();
        unit.settle_all(SettleMode::Claims).await.unwrap();

        assert_eq!(engine.claim_balance(&alice, &"USDC".into()).await, 0);
        assert_eq!(engine.claim_balance(&alice, &"WETH".into()).await, 0);
    }

    #[tokio::test]
    async fn claims_transfer_between_holders_outside_units() {
        let engine = engine();
        let alice: Address = "alice".into();
        let bob: Address = "bob".into();
        engine
            .venue
            .set_liquidity_quote(&pool(), TickRange::new(-60, 60), (600, 400))
            .await;

        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::RemoveLiquidity(LiquidityParams {
            pool: pool(),
            range: TickRange::new(-60, 60),
            liquidity: 1_000,
        }))
        .await
        .unwrap();
        unit.settle_all(SettleMode::Claims).await.unwrap();

        engine
            .transfer_claims(&alice, &bob, &"USDC".into(), 250)
            .await
            .unwrap();
        assert_eq!(engine.claim_balance(&alice, &"USDC".into()).await, 350);
        assert_eq!(engine.claim_balance(&bob, &"USDC".into()).await, 250);

        let err = engine
            .transfer_claims(&alice, &bob, &"USDC".into(), 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientClaims { .. }));
    }

    #[tokio::test]
    async fn failed_settlement_leaves_balances_untouched() {
        let engine = engine();
        let alice: Address = "alice".into();
        engine
            .venue
            .set_swap_quote(&pool(), &"WETH".into(), 200)
            .await;

        // Alice holds no WETH, so the collection leg cannot complete. The
        // USDC payout must not happen either.
        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::Swap(swap("WETH", 100))).await.unwrap();
        assert_eq!(unit.net_delta(&"USDC".into()), 200);
        let err = unit.settle_all(SettleMode::Transfer).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
        assert_eq!(engine.vault.balance_of(&alice, &"USDC".into()).await, 0);
        assert_eq!(engine.vault.balance_of(&alice, &"WETH".into()).await, 0);

        // Claims mode aborts the same way: the burn fails before any mint.
        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::Swap(swap("WETH", 100))).await.unwrap();
        let err = unit.settle_all(SettleMode::Claims).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientClaims { .. }));
        assert_eq!(engine.claim_balance(&alice, &"USDC".into()).await, 0);
        assert_eq!(engine.claim_balance(&alice, &"WETH".into()).await, 0);
    }

    #[tokio::test]
    async fn short_collection_restores_prior_collections() {
        let engine = engine();
        let alice: Address = "alice".into();
        engine.vault.credit(&alice, &"USDC".into(), 600).await;
        engine
            .venue
            .set_liquidity_quote(&pool(), TickRange::new(-60, 60), (600, 400))
            .await;

        // Both legs collect; only the USDC leg is funded. The collected 600
        // comes back when the WETH leg falls short.
        let mut unit = engine.begin(alice.clone()).unwrap();
        unit.execute(Action::AddLiquidity(LiquidityParams {
            pool: pool(),
            range: TickRange::new(-60, 60),
            liquidity: 1_000,
        }))
        .await
        .unwrap();
        let err = unit.settle_all(SettleMode::Transfer).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
        assert_eq!(engine.vault.balance_of(&alice, &"USDC".into()).await, 600);
        assert_eq!(engine.vault.balance_of(&alice, &"WETH".into()).await, 0);
    }

    #[tokio::test]
    async fn strict_settle_rejects_wrong_amounts() {
        let engine = engine();
        engine
            .venue
            .set_swap_quote(&pool(), &"USDC".into(), 900)
            .await;

        let mut unit = engine.begin("alice".into()).unwrap();
        unit.execute(Action::Swap(swap("USDC", 1_000))).await.unwrap();

        let err = unit.settle(&"WETH".into(), 901).await.unwrap_err();
        assert!(matches!(err, CoreError::DeltaMismatch { .. }));
    }

    #[tokio::test]
    async fn execute_one_returns_outcome_bytes() {
        let engine = engine();
        let position = PositionId::new();
        engine
            .venue
            .set_fees_accrued(&pool(), position, (120, 30))
            .await;

        let bytes = engine
            .execute_one(
                "alice".into(),
                Action::CollectFees(crate::actions::CollectParams {
                    pool: pool(),
                    position,
                }),
            )
            .await
            .unwrap();

        let outcome: ActionOutcome = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::FeesCollected {
                position,
                amount0: 120,
                amount1: 30,
            }
        );
        assert_eq!(
            engine
                .vault
                .balance_of(&"alice".into(), &"USDC".into())
                .await,
            120
        );
        // Guard was released by the completed unit.
        assert!(engine.begin("alice".into()).is_ok());
    }

    #[tokio::test]
    async fn arbitrage_needs_two_legs_and_a_profit() {
        let engine = engine();

        let err = engine
            .execute_arbitrage("alice".into(), vec![swap("USDC", 100)])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 2, actual: 1 }));

        // Flat round trip: no positive delta anywhere.
        let err = engine
            .execute_arbitrage("alice".into(), vec![swap("USDC", 100), swap("WETH", 100)])
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NoProfit);
        assert!(engine.begin("alice".into()).is_ok());
    }

    #[tokio::test]
    async fn profitable_arbitrage_returns_an_open_unit() {
        let engine = engine();
        engine
            .venue
            .set_swap_quote(&pool(), &"WETH".into(), 110)
            .await;

        let (unit, deltas) = engine
            .execute_arbitrage("alice".into(), vec![swap("USDC", 100), swap("WETH", 100)])
            .await
            .unwrap();
        assert_eq!(deltas, vec![CurrencyDelta::new("USDC".into(), 10)]);

        unit.settle_all(SettleMode::Transfer).await.unwrap();
        assert_eq!(
            engine
                .vault
                .balance_of(&"alice".into(), &"USDC".into())
                .await,
            10
        );
    }

    #[tokio::test]
    async fn remove_of_zero_liquidity_is_rejected() {
        let engine = engine();
        let mut unit = engine.begin("alice".into()).unwrap();
        let err = unit
            .execute(Action::RemoveLiquidity(LiquidityParams {
                pool: pool(),
                range: TickRange::new(-60, 60),
                liquidity: 0,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientLiquidity { available: 0 }));
    }

    #[test]
    fn validate_deltas_checks_length_then_floors() {
        let deltas = vec![
            CurrencyDelta::new("USDC".into(), 50),
            CurrencyDelta::new("WETH".into(), -10),
        ];

        assert!(validate_deltas(&deltas, &[50, -10]).is_ok());
        assert!(matches!(
            validate_deltas(&deltas, &[50]),
            Err(CoreError::LengthMismatch { expected: 1, actual: 2 })
        ));
        assert!(matches!(
            validate_deltas(&deltas, &[60, -10]),
            Err(CoreError::DeltaBelowMinimum { delta: 50, minimum: 60, .. })
        ));
    }
}
