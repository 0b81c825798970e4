//! Notification dispatch pipeline.
//!
//! This module handles:
//! - Preference-based partition of candidate recipients
//! - Batched, paced email fan-out with per-recipient outcomes
//! - Job handles for observing dispatch completion
//!
//! ## Submodules
//!
//! - `filter` - Recipient eligibility and partitioning
//! - `batch` - The batch dispatcher and its summary types
//! - `queue` - Dispatch job tracking

pub mod batch;
pub mod filter;
pub mod queue;

// Re-export commonly used items
pub use batch::{
    BatchDispatcher, DEFAULT_BATCH_SIZE, DEFAULT_INTER_BATCH_DELAY, DeliveryStatus,
    DispatchOutcome, DispatchSummary, SKIPPED_PREFS_REASON,
};
pub use filter::{RecipientPartition, is_eligible, partition_recipients};
pub use queue::{DispatchQueue, QueuedDispatch};
