//! File and directory entries produced by traversal.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::handle::{DirectoryHandle, FileHandle};

/// 256-bit BLAKE3 content digest for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A file discovered during traversal.
///
/// Keeps the handles needed to read the file and to remove it from its parent.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// Root-relative path, segments joined by `/`.
    pub path: String,
    /// File name (last path segment).
    pub name: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Directory containing the file.
    #[serde(skip)]
    pub parent: Arc<dyn DirectoryHandle>,
    /// The file itself.
    #[serde(skip)]
    pub handle: Arc<dyn FileHandle>,
}

impl FileEntry {
    /// Lower-cased text after the last `.` in the name, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Time elapsed between the last modification and `reference`.
    ///
    /// Modification times in the future count as zero age.
    pub fn age(&self, reference: SystemTime) -> Duration {
        reference
            .duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
    }
}

/// A directory discovered during traversal.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Root-relative path; empty for the root itself.
    pub path: String,
    /// Directory name.
    pub name: CompactString,
    /// Depth below the root (root is 0).
    pub depth: u32,
    /// Parent directory, absent for the root.
    pub parent: Option<Arc<dyn DirectoryHandle>>,
    /// The directory itself.
    pub handle: Arc<dyn DirectoryHandle>,
}

/// Lower-cased extension of a file name.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}
