//! Shared vocabulary for the tidepool settlement and position-tracking core.
//!
//! This crate defines the identifiers, value types, and error taxonomy used
//! by every other crate in the workspace:
//! - Account, currency, pool, and position identifiers
//! - Tick ranges with global bounds
//! - Signed currency deltas and fee breakdowns
//! - The position lifecycle states
//! - The `CoreError` taxonomy split into validation, consistency, and
//!   outcome classes

/// Account and position identifiers.
pub mod ids;

/// Currencies and signed value flows.
pub mod currency;

/// Pool identity derived from a canonical currency pair.
pub mod pool;

/// Tick ranges and global tick bounds.
pub mod range;

/// Position lifecycle states.
pub mod state;

/// Error taxonomy.
pub mod error;

// Re-export for easier access
pub use currency::{Currency, CurrencyDelta, FeeBreakdown};
pub use error::{CoreError, ErrorClass};
pub use ids::{Address, PositionId};
pub use pool::{PoolId, PoolKey};
pub use range::{MAX_TICK, MIN_TICK, TickRange};
pub use state::PositionState;
