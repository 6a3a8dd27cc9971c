//! Orchestration of position restructuring over the settlement engine.
//!
//! This crate validates and drives user-facing operations end to end:
//! - Same-pool and cross-pool rebalances with minimum-delta and slippage
//!   checks
//! - Multi-leg arbitrage with profit validation
//! - Ownership verification against an external registry, re-checked
//!   around the quote path
//! - Ledger notification of every burn and activation it causes
//! - Per-user operation and cost analytics

/// Prelude module for convenient imports.
pub mod prelude;

/// The rebalance coordinator and its configuration.
pub mod coordinator;
/// Read-only seam to the external ownership registry.
pub mod ownership;
