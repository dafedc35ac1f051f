//! Capability handles supplied by the host environment.
//!
//! The engine never touches a filesystem directly. It borrows a root
//! [`DirectoryHandle`] and reaches everything else through it: listing
//! children, opening them, reading file content and removing named entries.
//! A [`Handle`] is either a file or a directory, and each variant only
//! exposes the operations that make sense for its kind.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Kind of a directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

/// A named child as reported by [`DirectoryHandle::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: CompactString,
    pub kind: EntryKind,
}

impl ChildEntry {
    pub fn new(name: impl Into<CompactString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<CompactString>) -> Self {
        Self::new(name, EntryKind::File)
    }

    pub fn directory(name: impl Into<CompactString>) -> Self {
        Self::new(name, EntryKind::Directory)
    }
}

/// Metadata readable from an open file handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Capability over a single file.
#[async_trait]
pub trait FileHandle: Send + Sync + fmt::Debug {
    /// File name (not a path).
    fn name(&self) -> &str;

    /// Read size and modification time.
    async fn metadata(&self) -> Result<FileMetadata, ScanError>;

    /// Read the whole file content.
    async fn read_all(&self) -> Result<Vec<u8>, ScanError>;
}

/// Capability over a directory and its children.
#[async_trait]
pub trait DirectoryHandle: Send + Sync + fmt::Debug {
    /// Directory name (not a path).
    fn name(&self) -> &str;

    /// Enumerate direct children. Order is unspecified.
    async fn list_children(&self) -> Result<Vec<ChildEntry>, ScanError>;

    /// Open a child file by name.
    async fn open_file(&self, name: &str) -> Result<Arc<dyn FileHandle>, ScanError>;

    /// Open a child directory by name.
    async fn open_directory(&self, name: &str) -> Result<Arc<dyn DirectoryHandle>, ScanError>;

    /// Remove a child by name. Non-empty directories need `recursive`.
    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), ScanError>;
}

/// A handle of either kind.
#[derive(Debug, Clone)]
pub enum Handle {
    File(Arc<dyn FileHandle>),
    Directory(Arc<dyn DirectoryHandle>),
}

impl Handle {
    /// Open the handle for a listed child of `parent`.
    pub async fn open_child(
        parent: &dyn DirectoryHandle,
        child: &ChildEntry,
    ) -> Result<Self, ScanError> {
        match child.kind {
            EntryKind::File => parent.open_file(&child.name).await.map(Handle::File),
            EntryKind::Directory => parent
                .open_directory(&child.name)
                .await
                .map(Handle::Directory),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Handle::File(_) => EntryKind::File,
            Handle::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::File(file) => file.name(),
            Handle::Directory(dir) => dir.name(),
        }
    }

    pub fn into_file(self) -> Option<Arc<dyn FileHandle>> {
        match self {
            Handle::File(file) => Some(file),
            Handle::Directory(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<Arc<dyn DirectoryHandle>> {
        match self {
            Handle::Directory(dir) => Some(dir),
            Handle::File(_) => None,
        }
    }
}

/// Join a child name onto a root-relative path.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}
