//! Analysis algorithms for sweepfile.
//!
//! This crate provides three analyses over a [`DirectoryHandle`] root:
//!
//! - **Empty folder pruning** - Remove directories with no files below them
//! - **Duplicate detection** - Find duplicate files using BLAKE3 hashing
//! - **Junk classification** - Sort files into six cleanup categories
//!
//! # Empty Folder Pruning
//!
//! Directories resolve bottom-up. One that holds no file anywhere below it
//! is removed through its parent as soon as it resolves:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweepfile_analyze::{EmptyFolderPruner, PruneConfig};
//! use sweepfile_scan::{LocalDirectory, ScanConfig};
//!
//! # async fn run() -> Result<(), sweepfile_core::ScanError> {
//! let root = Arc::new(LocalDirectory::open("/path/to/clean").await?);
//! let pruner = EmptyFolderPruner::new(ScanConfig::default(), PruneConfig::default())?;
//! let report = pruner.prune(root).await?;
//!
//! for outcome in &report.outcomes {
//!     println!("{} deleted={}", outcome.path, outcome.deleted);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Duplicate Detection
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweepfile_analyze::DuplicateFinder;
//! use sweepfile_scan::LocalDirectory;
//!
//! # async fn run() -> Result<(), sweepfile_core::ScanError> {
//! let root = Arc::new(LocalDirectory::open("/path/to/scan").await?);
//! let report = DuplicateFinder::new().find_duplicates(root).await?;
//!
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//!
//! let selection = report.select_all_but_first();
//! let targets = report.deletion_targets(&selection);
//! # let _ = targets;
//! # Ok(())
//! # }
//! ```
//!
//! # Junk Classification
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweepfile_analyze::JunkClassifier;
//! use sweepfile_scan::LocalDirectory;
//!
//! # async fn run() -> Result<(), sweepfile_core::ScanError> {
//! let root = Arc::new(LocalDirectory::open("/path/to/scan").await?);
//! let report = JunkClassifier::new().scan(root).await?;
//!
//! for summary in &report.summaries {
//!     println!("{}: {} files", summary.label, summary.count);
//! }
//! # Ok(())
//! # }
//! ```

mod duplicates;
pub mod junk;
mod prune;

pub use duplicates::{
    DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup, DuplicateReport,
    FileSelection, FileTypeFilter,
};
pub use junk::{
    CategorizedFile, CategorySelection, CategorySummary, JunkCategory, JunkCategoryId,
    JunkClassifier, JunkConfig, JunkConfigBuilder, JunkReport, MatchContext, CATEGORIES,
};
pub use prune::{
    DirectoryResolution, Emptiness, EmptyFolderPruner, PruneConfig, PruneConfigBuilder,
    PruneReport,
};

// Re-export core types
pub use sweepfile_core::{ContentHash, DeletionOutcome, DeletionTarget, DirectoryHandle, FileEntry};
