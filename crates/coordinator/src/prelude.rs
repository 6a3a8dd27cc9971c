//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use tidepool_coordinator::prelude::*;
//! ```

// Coordinator
pub use crate::coordinator::{
    CoordinatorConfig, OperationStats, RebalanceCoordinator, RebalanceRequest,
};

// Ownership
pub use crate::ownership::{InMemoryOwnership, OwnershipSource};
