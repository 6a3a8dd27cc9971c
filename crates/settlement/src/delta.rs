//! Per-unit signed delta accounting.

use std::collections::BTreeMap;
use tidepool_domain::{CoreError, Currency, CurrencyDelta};

/// Signed balance accumulator scoped to one settlement unit.
///
/// Tracks, per currency, how much the unit owes the caller (positive) or the
/// caller owes the unit (negative). Balances are enumerated in currency
/// order, so delta lists are deterministic. An instance never outlives the
/// unit it belongs to.
#[derive(Debug, Default)]
pub struct CurrencyLedger {
    balances: BTreeMap<Currency, i128>,
}

impl CurrencyLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates a signed delta for `currency`.
    ///
    /// Amounts carry no sign or magnitude constraint; the running balance is
    /// checked for overflow.
    pub fn post(&mut self, currency: &Currency, amount: i128) -> Result<(), CoreError> {
        let balance = self.balances.entry(currency.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::BalanceOverflow {
                currency: currency.clone(),
            })?;
        Ok(())
    }

    /// Current signed balance for `currency`; zero if never touched.
    #[must_use]
    pub fn net_delta(&self, currency: &Currency) -> i128 {
        self.balances.get(currency).copied().unwrap_or(0)
    }

    /// True when every tracked currency nets to exactly zero.
    #[must_use]
    pub fn all_settled(&self) -> bool {
        self.balances.values().all(|balance| *balance == 0)
    }

    /// Zeroes one currency by recording an external movement of `amount`
    /// in the opposite direction.
    ///
    /// `amount` is the movement's magnitude and must equal the outstanding
    /// balance exactly. Returns the signed balance that was cleared: positive
    /// means the caller must be paid that much, negative means it must be
    /// collected from them.
    pub fn settle(&mut self, currency: &Currency, amount: i128) -> Result<i128, CoreError> {
        let outstanding = self.net_delta(currency);
        if amount != outstanding.abs() {
            return Err(CoreError::DeltaMismatch {
                currency: currency.clone(),
                outstanding,
                supplied: amount,
            });
        }
        self.balances.insert(currency.clone(), 0);
        Ok(outstanding)
    }

    /// Non-zero balances in currency order.
    #[must_use]
    pub fn deltas(&self) -> Vec<CurrencyDelta> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance != 0)
            .map(|(currency, balance)| CurrencyDelta::new(currency.clone(), *balance))
            .collect()
    }
}
