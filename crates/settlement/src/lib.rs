//! Delta accounting and settlement for venue actions.
//!
//! This crate turns typed venue actions into signed currency deltas and
//! discharges those deltas atomically:
//! - Per-unit delta accounting with strict zero-sum closure
//! - Swap, liquidity, fee-collection, and donation actions
//! - Transfer settlement through a vault seam
//! - Claim settlement through a transferable claim book
//! - Multi-leg arbitrage execution with profit gating

/// Prelude module for convenient imports.
pub mod prelude;

/// Typed venue actions and their outcomes.
pub mod actions;
/// Transferable claim credit.
pub mod claims;
/// Per-unit signed delta accounting.
pub mod delta;
/// Settlement engine and unit sessions.
pub mod engine;
/// External transfer seam.
pub mod vault;
/// Quote seam to the external venue.
pub mod venue;
