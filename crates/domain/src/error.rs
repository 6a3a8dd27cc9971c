//! Error taxonomy.
//!
//! Every failure in the workspace is a [`CoreError`]. Each variant belongs
//! to exactly one [`ErrorClass`]:
//! - `Validation`: the caller supplied something wrong; safe to correct and
//!   retry
//! - `Consistency`: accounting or state-machine invariants were violated;
//!   treated as fatal for the operation
//! - `Outcome`: the operation ran fairly but its result missed the caller's
//!   acceptance bar

use crate::currency::Currency;
use crate::ids::{Address, PositionId};
use crate::pool::PoolId;
use crate::state::PositionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a [`CoreError`], used by callers to branch on fatality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Caller mistake detected before any state change
    Validation,
    /// Violated accounting or state-machine invariant
    Consistency,
    /// Fair run whose result missed the caller's acceptance bar
    Outcome,
}

/// Unified error type for settlement, lifecycle, and coordination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Caller does not own the position it is trying to operate on
    #[error("position {position} is not owned by {caller}")]
    PositionNotOwned {
        /// Position the caller named
        position: PositionId,
        /// Caller that failed the ownership check
        caller: Address,
    },

    /// Tick range is inverted, empty, or outside the global bounds
    #[error("invalid tick range [{lower}, {upper})")]
    InvalidTickRange {
        /// Supplied lower tick
        lower: i32,
        /// Supplied upper tick
        upper: i32,
    },

    /// Operation was submitted after its deadline
    #[error("deadline {deadline} has expired")]
    DeadlineExpired {
        /// Deadline the caller supplied
        deadline: DateTime<Utc>,
    },

    /// Two parallel inputs differ in length, or too few were supplied
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Length the operation requires
        expected: usize,
        /// Length the caller supplied
        actual: usize,
    },

    /// A settlement delta came in below the caller's stated minimum
    #[error("delta {delta} for {currency} is below the minimum {minimum}")]
    DeltaBelowMinimum {
        /// Currency of the offending delta
        currency: Currency,
        /// Delta the operation produced
        delta: i128,
        /// Minimum the caller would accept
        minimum: i128,
    },

    /// Currency is not part of the pool it was used with
    #[error("currency {currency} is not part of pool {pool}")]
    CurrencyMismatch {
        /// Offending currency
        currency: Currency,
        /// Pool it was used with
        pool: PoolId,
    },

    /// Not enough liquidity to perform the operation
    #[error("insufficient liquidity: {available} available")]
    InsufficientLiquidity {
        /// Liquidity actually available
        available: u128,
    },

    /// Caller is not authorized for this operation
    #[error("caller {caller} is not authorized")]
    InvalidCaller {
        /// Rejected caller
        caller: Address,
    },

    /// Claim balance is too small to burn the requested amount
    #[error("claims of {holder} for {currency}: {available} available, {requested} requested")]
    InsufficientClaims {
        /// Claim holder
        holder: Address,
        /// Claim currency
        currency: Currency,
        /// Claims actually held
        available: u128,
        /// Claims the operation tried to burn
        requested: u128,
    },

    /// Account balance is too small to cover a collection
    #[error("funds of {account} for {currency}: {available} available, {required} required")]
    InsufficientFunds {
        /// Account the collection draws from
        account: Address,
        /// Currency being collected
        currency: Currency,
        /// Balance actually held
        available: i128,
        /// Amount the settlement requires
        required: i128,
    },

    /// Supplied settlement amount does not match the outstanding balance
    #[error("delta mismatch for {currency}: outstanding {outstanding}, supplied {supplied}")]
    DeltaMismatch {
        /// Currency being settled
        currency: Currency,
        /// Balance still outstanding
        outstanding: i128,
        /// Amount the caller supplied
        supplied: i128,
    },

    /// Position is not in the state the transition requires
    #[error("position {position} is {actual:?}, expected {expected:?}")]
    InvalidPositionState {
        /// Position the transition targeted
        position: PositionId,
        /// State the transition requires
        expected: PositionState,
        /// State the position is actually in
        actual: PositionState,
    },

    /// Index-based lookup past the end of a registry
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Registry length
        len: usize,
    },

    /// A settlement unit or coordinated operation is already in flight
    #[error("an operation is already in flight")]
    OperationInFlight,

    /// Accumulated balance overflowed its representation
    #[error("balance overflow for {currency}")]
    BalanceOverflow {
        /// Currency whose balance overflowed
        currency: Currency,
    },

    /// External transfer failed mid-settlement
    #[error("transfer failed: {reason}")]
    TransferFailed {
        /// Backend-supplied failure description
        reason: String,
    },

    /// A wire payload could not be encoded or decoded
    #[error("encoding failed: {reason}")]
    Encoding {
        /// Serializer-supplied failure description
        reason: String,
    },

    /// Arbitrage produced no positive delta in any currency
    #[error("no profit in any currency")]
    NoProfit,

    /// A delta exceeded the acceptance band above the caller's minimum
    #[error("delta {delta} for {currency} exceeds the slippage limit {limit}")]
    SlippageExceeded {
        /// Currency of the offending delta
        currency: Currency,
        /// Delta the operation produced
        delta: i128,
        /// Upper bound the band allows
        limit: i128,
    },
}

impl CoreError {
    /// Class of this error within the taxonomy
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::PositionNotOwned { .. }
            | CoreError::InvalidTickRange { .. }
            | CoreError::DeadlineExpired { .. }
            | CoreError::LengthMismatch { .. }
            | CoreError::DeltaBelowMinimum { .. }
            | CoreError::CurrencyMismatch { .. }
            | CoreError::InsufficientLiquidity { .. }
            | CoreError::InvalidCaller { .. }
            | CoreError::InsufficientClaims { .. }
            | CoreError::InsufficientFunds { .. } => ErrorClass::Validation,
            CoreError::DeltaMismatch { .. }
            | CoreError::InvalidPositionState { .. }
            | CoreError::IndexOutOfBounds { .. }
            | CoreError::OperationInFlight
            | CoreError::BalanceOverflow { .. }
            | CoreError::TransferFailed { .. }
            | CoreError::Encoding { .. } => ErrorClass::Consistency,
            CoreError::NoProfit | CoreError::SlippageExceeded { .. } => ErrorClass::Outcome,
        }
    }
}
