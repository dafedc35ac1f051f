//! Deletion targets and per-item deletion outcomes.

use std::sync::Arc;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::handle::DirectoryHandle;

/// Result of one attempted removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    /// Root-relative path of the entry.
    pub path: String,
    /// Whether the entry was removed.
    pub deleted: bool,
    /// Failure description when `deleted` is false.
    pub reason: Option<String>,
    /// The entry was already gone when removal was attempted.
    #[serde(default)]
    pub missing: bool,
}

impl DeletionOutcome {
    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deleted: true,
            reason: None,
            missing: false,
        }
    }

    pub fn failed(path: impl Into<String>, error: &ScanError) -> Self {
        Self {
            path: path.into(),
            deleted: false,
            reason: Some(error.to_string()),
            missing: error.is_not_found(),
        }
    }

    /// Whether the entry is no longer on disk after this attempt.
    pub fn is_gone(&self) -> bool {
        self.deleted || self.missing
    }
}

/// Something that can be removed through its parent handle.
#[derive(Debug, Clone)]
pub struct DeletionTarget {
    /// Root-relative path, used for reporting.
    pub path: String,
    /// Name of the entry inside `parent`.
    pub name: CompactString,
    /// Directory holding the entry.
    pub parent: Arc<dyn DirectoryHandle>,
    /// Remove directory contents as well.
    pub recursive: bool,
    /// Bytes freed on success (0 for directories).
    pub size: u64,
}

impl DeletionTarget {
    /// Target a single file.
    pub fn file(
        path: impl Into<String>,
        name: impl Into<CompactString>,
        parent: Arc<dyn DirectoryHandle>,
        size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            parent,
            recursive: false,
            size,
        }
    }

    /// Target a directory and everything below it.
    pub fn directory(
        path: impl Into<String>,
        name: impl Into<CompactString>,
        parent: Arc<dyn DirectoryHandle>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            parent,
            recursive: true,
            size: 0,
        }
    }

    /// Attempt the removal. Never fails; the outcome records what happened.
    pub async fn remove(&self) -> DeletionOutcome {
        match self.parent.remove_entry(&self.name, self.recursive).await {
            Ok(()) => {
                debug!(path = %self.path, "removed");
                DeletionOutcome::deleted(&self.path)
            }
            Err(err) => {
                warn!(path = %self.path, error = %err, "removal failed");
                DeletionOutcome::failed(&self.path, &err)
            }
        }
    }
}
