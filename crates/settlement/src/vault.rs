//! External transfer seam.

use async_trait::async_trait;
use std::collections::HashMap;
use tidepool_domain::{Address, CoreError, Currency};
use tokio::sync::RwLock;

/// Value-moving backend used when a unit settles by transfer.
///
/// Amounts handed to either method are strictly positive magnitudes; the
/// engine has already resolved the direction. Backends that cannot complete
/// a movement for reasons other than caller funds report
/// [`CoreError::TransferFailed`].
#[async_trait]
pub trait Vault: Send + Sync {
    /// Pays `amount` of `currency` out to `to`.
    async fn pay_out(&self, to: &Address, currency: &Currency, amount: i128)
    -> Result<(), CoreError>;

    /// Collects `amount` of `currency` from `from`.
    async fn collect(
        &self,
        from: &Address,
        currency: &Currency,
        amount: i128,
    ) -> Result<(), CoreError>;
}

/// In-memory vault tracking one balance per address and currency.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    balances: RwLock<HashMap<(Address, Currency), i128>>,
}

impl InMemoryVault {
    /// Creates a vault with no balances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account with funds.
    pub async fn credit(&self, account: &Address, currency: &Currency, amount: i128) {
        *self
            .balances
            .write()
            .await
            .entry((account.clone(), currency.clone()))
            .or_insert(0) += amount;
    }

    /// Balance currently held by an account.
    pub async fn balance_of(&self, account: &Address, currency: &Currency) -> i128 {
        self.balances
            .read()
            .await
            .get(&(account.clone(), currency.clone()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Vault for InMemoryVault {
    async fn pay_out(
        &self,
        to: &Address,
        currency: &Currency,
        amount: i128,
    ) -> Result<(), CoreError> {
        *self
            .balances
            .write()
            .await
            .entry((to.clone(), currency.clone()))
            .or_insert(0) += amount;
        Ok(())
    }

    async fn collect(
        &self,
        from: &Address,
        currency: &Currency,
        amount: i128,
    ) -> Result<(), CoreError> {
        let mut balances = self.balances.write().await;
        let key = (from.clone(), currency.clone());
        let available = balances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(CoreError::InsufficientFunds {
                account: from.clone(),
                currency: currency.clone(),
                available,
                required: amount,
            });
        }
        balances.insert(key, available - amount);
        Ok(())
    }
}
