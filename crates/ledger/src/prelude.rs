//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use tidepool_ledger::prelude::*;
//! ```

// Events
pub use crate::events::{LifecycleEvent, LifecycleEventKind, MilestoneEvent};

// Ledger
pub use crate::ledger::{LedgerConfig, PositionLedger};

// Milestones
pub use crate::milestones::{MilestoneKind, MilestoneStatus};

// Records
pub use crate::record::PositionRecord;

// Scoring
pub use crate::score::{ProviderScore, ScoreTier, score_user};

// Snapshots
pub use crate::snapshot::{SnapshotQuery, SnapshotReader, SnapshotValue};

// Statistics
pub use crate::stats::UserStats;
