//! Quote seam to the external venue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tidepool_domain::{CoreError, Currency, PoolId, PoolKey, PositionId, TickRange};
use tokio::sync::RwLock;

/// Externally maintained pool state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Tick the pool currently trades at.
    pub current_tick: i32,
    /// Swap fee in basis points.
    pub fee_bps: u32,
    /// Protocol's cut of the swap fee in basis points.
    pub protocol_fee_bps: u32,
    /// Cumulative fee growth in the pool's first currency.
    pub fee_growth_0: u128,
    /// Cumulative fee growth in the pool's second currency.
    pub fee_growth_1: u128,
}

/// Quoted output side of a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Currency the caller receives.
    pub currency_out: Currency,
    /// Quoted output amount in raw units.
    pub amount_out: i128,
}

/// Pricing and state queries answered by the external venue.
///
/// Every method is a quote: nothing here moves value. The engine turns
/// quotes into posted deltas, and only settlement moves anything, so a unit
/// aborted mid-flight leaves no external effect.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Quotes the output of swapping `amount_in` of `currency_in`.
    async fn quote_swap(
        &self,
        pool: &PoolKey,
        currency_in: &Currency,
        amount_in: i128,
    ) -> Result<SwapQuote, CoreError>;

    /// Quotes the pair amounts backing `liquidity` units in `range`.
    async fn quote_liquidity(
        &self,
        pool: &PoolKey,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<(i128, i128), CoreError>;

    /// Fees accrued by a position since they were last collected.
    async fn fees_accrued(
        &self,
        pool: &PoolKey,
        position: &PositionId,
    ) -> Result<(i128, i128), CoreError>;

    /// Current externally maintained state of a pool.
    async fn pool_snapshot(&self, pool: &PoolKey) -> Result<PoolSnapshot, CoreError>;
}

/// Scripted in-memory venue.
///
/// Unscripted swaps quote one-to-one and unscripted liquidity quotes split
/// the liquidity evenly across the pair, so value-neutral batches need no
/// setup; tests script exact amounts where the numbers matter.
#[derive(Debug, Default)]
pub struct StaticVenue {
    swap_quotes: RwLock<HashMap<(PoolId, Currency), i128>>,
    liquidity_quotes: RwLock<HashMap<(PoolId, TickRange), (i128, i128)>>,
    fees: RwLock<HashMap<(PoolId, PositionId), (i128, i128)>>,
    ticks: RwLock<HashMap<PoolId, i32>>,
}

impl StaticVenue {
    /// Creates a venue with no scripted quotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the output amount for swaps paying `currency_in` into `pool`.
    pub async fn set_swap_quote(&self, pool: &PoolKey, currency_in: &Currency, amount_out: i128) {
        self.swap_quotes
            .write()
            .await
            .insert((pool.id(), currency_in.clone()), amount_out);
    }

    /// Scripts the pair amounts quoted for `range` in `pool`.
    pub async fn set_liquidity_quote(
        &self,
        pool: &PoolKey,
        range: TickRange,
        amounts: (i128, i128),
    ) {
        self.liquidity_quotes
            .write()
            .await
            .insert((pool.id(), range), amounts);
    }

    /// Scripts the fees accrued by a position.
    pub async fn set_fees_accrued(
        &self,
        pool: &PoolKey,
        position: PositionId,
        amounts: (i128, i128),
    ) {
        self.fees
            .write()
            .await
            .insert((pool.id(), position), amounts);
    }

    /// Scripts the tick a pool currently trades at.
    pub async fn set_current_tick(&self, pool: &PoolKey, tick: i32) {
        self.ticks.write().await.insert(pool.id(), tick);
    }
}

#[async_trait]
impl VenueAdapter for StaticVenue {
    async fn quote_swap(
        &self,
        pool: &PoolKey,
        currency_in: &Currency,
        amount_in: i128,
    ) -> Result<SwapQuote, CoreError> {
        let currency_out =
            pool.counterpart(currency_in)
                .ok_or_else(|| CoreError::CurrencyMismatch {
                    currency: currency_in.clone(),
                    pool: pool.id(),
                })?;
        let amount_out = self
            .swap_quotes
            .read()
            .await
            .get(&(pool.id(), currency_in.clone()))
            .copied()
            .unwrap_or(amount_in);
        Ok(SwapQuote {
            currency_out,
            amount_out,
        })
    }

    async fn quote_liquidity(
        &self,
        pool: &PoolKey,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<(i128, i128), CoreError> {
        if let Some(amounts) = self
            .liquidity_quotes
            .read()
            .await
            .get(&(pool.id(), *range))
        {
            return Ok(*amounts);
        }
        let half = (liquidity / 2) as i128;
        Ok((half, half))
    }

    async fn fees_accrued(
        &self,
        pool: &PoolKey,
        position: &PositionId,
    ) -> Result<(i128, i128), CoreError> {
        Ok(self
            .fees
            .read()
            .await
            .get(&(pool.id(), *position))
            .copied()
            .unwrap_or((0, 0)))
    }

    async fn pool_snapshot(&self, pool: &PoolKey) -> Result<PoolSnapshot, CoreError> {
        let current_tick = self
            .ticks
            .read()
            .await
            .get(&pool.id())
            .copied()
            .unwrap_or(0);
        Ok(PoolSnapshot {
            current_tick,
            fee_bps: pool.fee_bps,
            protocol_fee_bps: 0,
            fee_growth_0: 0,
            fee_growth_1: 0,
        })
    }
}
