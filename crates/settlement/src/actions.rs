//! Typed venue actions and their outcomes.

use serde::{Deserialize, Serialize};
use tidepool_domain::{Currency, PoolId, PoolKey, PositionId, TickRange};

/// Parameters for a single swap leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapParams {
    /// Pool the swap runs against.
    pub pool: PoolKey,
    /// Currency the caller pays in.
    pub currency_in: Currency,
    /// Exact input amount in raw units.
    pub amount_in: i128,
}

/// Parameters for adding or removing liquidity in a tick range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityParams {
    /// Pool holding the range.
    pub pool: PoolKey,
    /// Tick range the liquidity sits in.
    pub range: TickRange,
    /// Liquidity units to add or remove.
    pub liquidity: u128,
}

/// Parameters for collecting fees accrued by a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectParams {
    /// Pool the position belongs to.
    pub pool: PoolKey,
    /// Position whose fees are collected.
    pub position: PositionId,
}

/// Parameters for donating to a pool's in-range liquidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonateParams {
    /// Pool receiving the donation.
    pub pool: PoolKey,
    /// Donated amount of the pool's first currency.
    pub amount0: i128,
    /// Donated amount of the pool's second currency.
    pub amount1: i128,
}

/// One executable venue action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Exchange one currency of a pool for the other.
    Swap(SwapParams),
    /// Deposit liquidity into a tick range.
    AddLiquidity(LiquidityParams),
    /// Withdraw liquidity from a tick range.
    RemoveLiquidity(LiquidityParams),
    /// Collect fees accrued by a position.
    CollectFees(CollectParams),
    /// Donate amounts to a pool's in-range liquidity.
    Donate(DonateParams),
}

/// Typed result of one executed action.
///
/// Pass-through execution serializes this as its byte result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// A swap was quoted and its legs posted.
    Swap {
        /// Currency paid in.
        currency_in: Currency,
        /// Input amount.
        amount_in: i128,
        /// Currency received.
        currency_out: Currency,
        /// Quoted output amount.
        amount_out: i128,
    },
    /// Liquidity was deposited.
    LiquidityAdded {
        /// Pool the deposit targeted.
        pool: PoolId,
        /// Amount owed in the pool's first currency.
        amount0: i128,
        /// Amount owed in the pool's second currency.
        amount1: i128,
    },
    /// Liquidity was withdrawn.
    LiquidityRemoved {
        /// Pool the withdrawal targeted.
        pool: PoolId,
        /// Amount received in the pool's first currency.
        amount0: i128,
        /// Amount received in the pool's second currency.
        amount1: i128,
    },
    /// Accrued fees were collected.
    FeesCollected {
        /// Position the fees belonged to.
        position: PositionId,
        /// Fees in the pool's first currency.
        amount0: i128,
        /// Fees in the pool's second currency.
        amount1: i128,
    },
    /// A donation was posted.
    Donated {
        /// Pool that received the donation.
        pool: PoolId,
        /// Donated amount of the first currency.
        amount0: i128,
        /// Donated amount of the second currency.
        amount1: i128,
    },
}
