//! Position lifecycle tracking and provider analytics.
//!
//! This crate mirrors position lifecycles reported by the settlement side
//! into an authoritative in-process ledger:
//! - Lifecycle state machine with a terminal burned state
//! - Per-owner statistics and pool interaction history
//! - Write-once milestones over threshold ladders
//! - Deterministic provider scoring and tiers
//! - Broadcast event streams and point-in-time batched reads

/// Prelude module for convenient imports.
pub mod prelude;

/// Lifecycle and milestone event payloads.
pub mod events;
/// The position ledger and its configuration.
pub mod ledger;
/// Write-once milestone flags and their threshold ladders.
pub mod milestones;
/// Point-in-time position records.
pub mod record;
/// Deterministic provider scoring.
pub mod score;
/// Fail-fast batched reads.
pub mod snapshot;
/// Per-owner aggregate statistics.
pub mod stats;
