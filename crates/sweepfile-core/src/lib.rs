//! Core types and capabilities for sweepfile.
//!
//! This crate provides the data model shared by the walker, the analyses
//! and the deletion executor: handle capabilities, file entries, deletion
//! outcomes, progress snapshots, errors and traversal configuration.

mod config;
mod entry;
mod error;
mod handle;
mod outcome;
mod progress;

pub use config::{EntryFilter, ScanConfig, ScanConfigBuilder};
pub use entry::{extension_of, ContentHash, DirectoryEntry, FileEntry};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use handle::{
    join_path, ChildEntry, DirectoryHandle, EntryKind, FileHandle, FileMetadata, Handle,
};
pub use outcome::{DeletionOutcome, DeletionTarget};
pub use progress::{ScanPhase, ScanProgress};
