//! Read-only seam to the external ownership registry.

use async_trait::async_trait;
use std::collections::HashMap;
use tidepool_domain::{Address, PositionId};
use tokio::sync::RwLock;

/// Answers who currently owns a position externally.
///
/// The registry is authoritative; the ledger's records may lag behind it
/// until a transition re-syncs them. Implementations must never mutate
/// core state.
#[async_trait]
pub trait OwnershipSource: Send + Sync {
    /// Current external owner of `position`, or `None` if the registry
    /// does not know it.
    async fn owner_of(&self, position: &PositionId) -> Option<Address>;
}

/// In-memory ownership registry.
#[derive(Debug, Default)]
pub struct InMemoryOwnership {
    owners: RwLock<HashMap<PositionId, Address>>,
}

impl InMemoryOwnership {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the owner of a position.
    pub async fn set_owner(&self, position: PositionId, owner: Address) {
        self.owners.write().await.insert(position, owner);
    }

    /// Forgets a position.
    pub async fn clear(&self, position: &PositionId) {
        self.owners.write().await.remove(position);
    }
}

#[async_trait]
impl OwnershipSource for InMemoryOwnership {
    async fn owner_of(&self, position: &PositionId) -> Option<Address> {
        self.owners.read().await.get(position).cloned()
    }
}
