//! Deletion engine for sweepfile.
//!
//! Removes [`DeletionTarget`]s produced by the analyses in a background task,
//! reporting progress and the final result through a channel. Every target
//! is attempted independently: a failed removal is recorded and the run
//! moves on to the next one.

mod delete;
mod progress;

pub use delete::{delete_all, start_deletion, DeletionResult};
pub use progress::{OperationComplete, OperationProgress};

pub use sweepfile_core::{DeletionOutcome, DeletionTarget};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
