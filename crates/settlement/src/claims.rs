//! Transferable claim credit.

use std::collections::HashMap;
use tidepool_domain::{Address, CoreError, Currency};

/// Claim balances per holder and currency.
///
/// Claims are the engine's internal credit: minted instead of paying value
/// out, burned instead of collecting it. Unlike a settlement unit's deltas
/// they survive across units, which is their point.
#[derive(Debug, Default)]
pub struct ClaimBook {
    balances: HashMap<(Address, Currency), u128>,
}

impl ClaimBook {
    /// Creates an empty claim book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of claims to `holder`.
    pub fn mint(
        &mut self,
        holder: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), CoreError> {
        let balance = self
            .balances
            .entry((holder.clone(), currency.clone()))
            .or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::BalanceOverflow {
                currency: currency.clone(),
            })?;
        Ok(())
    }

    /// Burns `amount` of claims held by `holder`.
    pub fn burn(
        &mut self,
        holder: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), CoreError> {
        let key = (holder.clone(), currency.clone());
        let available = self.balances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(CoreError::InsufficientClaims {
                holder: holder.clone(),
                currency: currency.clone(),
                available,
                requested: amount,
            });
        }
        self.balances.insert(key, available - amount);
        Ok(())
    }

    /// Moves `amount` of claims from one holder to another.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), CoreError> {
        self.burn(from, currency, amount)?;
        self.mint(to, currency, amount)
    }

    /// Claims currently held by `holder` in `currency`.
    #[must_use]
    pub fn balance_of(&self, holder: &Address, currency: &Currency) -> u128 {
        self.balances
            .get(&(holder.clone(), currency.clone()))
            .copied()
            .unwrap_or(0)
    }
}
