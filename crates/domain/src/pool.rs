//! Pool identity derived from a canonical currency pair.

use crate::currency::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a pool: its currency pair plus the fee tier in basis points
///
/// The constructor sorts the two currencies, so the same pair and fee always
/// produce the same key no matter the order the caller supplies them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    /// Lexicographically smaller currency of the pair
    pub currency0: Currency,
    /// Lexicographically larger currency of the pair
    pub currency1: Currency,
    /// Swap fee tier in basis points
    pub fee_bps: u32,
}

impl PoolKey {
    /// Creates a canonical pool key, sorting the currency pair
    pub fn new(a: Currency, b: Currency, fee_bps: u32) -> Self {
        let (currency0, currency1) = if a <= b { (a, b) } else { (b, a) };
        Self {
            currency0,
            currency1,
            fee_bps,
        }
    }

    /// Stable identifier used for map keys and event payloads
    #[must_use]
    pub fn id(&self) -> PoolId {
        PoolId(format!(
            "{}/{}/{}",
            self.currency0, self.currency1, self.fee_bps
        ))
    }

    /// True when the currency is one side of this pool's pair
    #[must_use]
    pub fn contains(&self, currency: &Currency) -> bool {
        &self.currency0 == currency || &self.currency1 == currency
    }

    /// The other side of the pair, or `None` if the currency is not in it
    #[must_use]
    pub fn counterpart(&self, currency: &Currency) -> Option<Currency> {
        if currency == &self.currency0 {
            Some(self.currency1.clone())
        } else if currency == &self.currency1 {
            Some(self.currency0.clone())
        } else {
            None
        }
    }

    /// True when both pools trade the same currency pair
    #[must_use]
    pub fn same_pair(&self, other: &PoolKey) -> bool {
        self.currency0 == other.currency0 && self.currency1 == other.currency1
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.currency0, self.currency1, self.fee_bps)
    }
}

/// Stable string form of a pool key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub String);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
