//! Tree walking for sweepfile.
//!
//! This crate drives traversal over [`DirectoryHandle`] capabilities and
//! ships two of them: [`LocalDirectory`] over the local filesystem and
//! [`MemoryDirectory`], an in-memory tree with failure injection.
//!
//! # Overview
//!
//! - **Sequential depth-first walk** with pre-order enter and post-order exit
//!   callbacks through the [`Visitor`] trait
//! - **Per-entry failure isolation**: unreadable entries become
//!   [`ScanWarning`]s and siblings are still walked
//! - **Progress updates** via broadcast channels
//! - **Cancellation** through a `CancellationToken`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweepfile_scan::{LocalDirectory, ScanConfig, TreeWalker};
//!
//! # async fn run() -> Result<(), sweepfile_scan::ScanError> {
//! let root = Arc::new(LocalDirectory::open("/path/to/scan").await?);
//! let walker = TreeWalker::new(ScanConfig::default())?;
//! let collection = walker.collect_files(root).await?;
//!
//! println!("Files: {}", collection.files.len());
//! println!("Skipped: {}", collection.skipped.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use sweepfile_scan::{ScanConfig, TreeWalker};
//!
//! # fn run() -> Result<(), sweepfile_scan::ScanError> {
//! let walker = TreeWalker::new(ScanConfig::default())?;
//! let mut progress_rx = walker.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{}", progress.status);
//!     }
//! });
//! # Ok(())
//! # }
//! ```

mod local;
mod memory;
mod progress;
mod walker;

pub use local::{LocalDirectory, LocalFile};
pub use memory::{MemoryDirectory, MemoryFile};
pub use progress::{progress_channel, ProgressTracker, PROGRESS_CHANNEL_SIZE};
pub use walker::{DirSummary, FileCollection, TreeWalker, Visitor, WalkStats};

// Re-export core types for convenience
pub use sweepfile_core::{
    DirectoryEntry, DirectoryHandle, FileEntry, FileHandle, ScanConfig, ScanConfigBuilder,
    ScanError, ScanPhase, ScanProgress, ScanWarning,
};
