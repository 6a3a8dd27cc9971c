//! Currencies and signed value flows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque asset identifier
///
/// Currencies are totally ordered so a pool's pair can be canonicalized
/// regardless of the order the caller supplies them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    /// Creates a currency from any string-like value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed obligation in one currency between a settlement unit and its caller
///
/// Positive means the unit owes the caller; negative means the caller owes
/// the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDelta {
    /// Currency the obligation is denominated in
    pub currency: Currency,
    /// Signed amount in raw units
    pub amount: i128,
}

impl CurrencyDelta {
    /// Creates a delta for the given currency and signed amount
    pub fn new(currency: Currency, amount: i128) -> Self {
        Self { currency, amount }
    }
}

/// Fee components reported alongside a position lifecycle notification
///
/// Components are carried per pool currency in the pool's canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Fees accrued in the pool's first currency
    pub amount0: i128,
    /// Fees accrued in the pool's second currency
    pub amount1: i128,
}

impl FeeBreakdown {
    /// Creates a fee breakdown from its two components
    pub fn new(amount0: i128, amount1: i128) -> Self {
        Self { amount0, amount1 }
    }

    /// Sum of the positive components; non-positive components credit nothing
    #[must_use]
    pub fn credited_total(&self) -> u128 {
        let first = if self.amount0 > 0 { self.amount0 as u128 } else { 0 };
        let second = if self.amount1 > 0 { self.amount1 as u128 } else { 0 };
        first + second
    }

    /// True when both components are zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount0 == 0 && self.amount1 == 0
    }
}
