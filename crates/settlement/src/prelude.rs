//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use tidepool_settlement::prelude::*;
//! ```

// Actions
pub use crate::actions::{
    Action, ActionOutcome, CollectParams, DonateParams, LiquidityParams, SwapParams,
};

// Claims
pub use crate::claims::ClaimBook;

// Delta accounting
pub use crate::delta::CurrencyLedger;

// Engine
pub use crate::engine::{SettleMode, SettlementEngine, SettlementUnit, validate_deltas};

// Vault
pub use crate::vault::{InMemoryVault, Vault};

// Venue
pub use crate::venue::{PoolSnapshot, StaticVenue, SwapQuote, VenueAdapter};
