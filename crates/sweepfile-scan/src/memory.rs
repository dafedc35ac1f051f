//! In-memory handle capability with failure injection.
//!
//! Every handle opened from a [`MemoryDirectory`] shares one tree. Setup
//! methods take paths relative to the root of that tree, `/`-separated.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use compact_str::CompactString;
use parking_lot::Mutex;

use sweepfile_core::{
    join_path, ChildEntry, DirectoryHandle, EntryKind, FileHandle, FileMetadata, ScanError,
};

#[derive(Debug, Clone)]
enum Node {
    File {
        content: Arc<Vec<u8>>,
        modified: SystemTime,
    },
    Directory,
}

#[derive(Debug, Default)]
struct MemoryTree {
    nodes: BTreeMap<String, Node>,
    deny_listing: BTreeSet<String>,
    deny_reading: BTreeSet<String>,
    deny_removal: BTreeSet<String>,
    read_only: bool,
    removals: Vec<String>,
}

impl MemoryTree {
    fn ensure_parents(&mut self, path: &str) {
        let mut current = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            current = join_path(&current, segment);
            self.nodes.entry(current.clone()).or_insert(Node::Directory);
        }
    }

    fn is_directory(&self, path: &str) -> bool {
        path.is_empty() || matches!(self.nodes.get(path), Some(Node::Directory))
    }

    fn descendants(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn children(&self, path: &str) -> Vec<ChildEntry> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, node)| {
                let rest = &key[prefix.len()..];
                if rest.contains('/') {
                    return None;
                }
                let kind = match node {
                    Node::File { .. } => EntryKind::File,
                    Node::Directory => EntryKind::Directory,
                };
                Some(ChildEntry::new(rest, kind))
            })
            .collect()
    }
}

/// A directory in a shared in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    tree: Arc<Mutex<MemoryTree>>,
    path: String,
    name: CompactString,
}

impl MemoryDirectory {
    /// Create an empty tree and return its root.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            tree: Arc::new(Mutex::new(MemoryTree::default())),
            path: String::new(),
            name: name.into(),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: &str, content: impl Into<Vec<u8>>) -> &Self {
        self.add_file_modified(path, content, SystemTime::now())
    }

    /// Add a file with an explicit modification time.
    pub fn add_file_modified(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> &Self {
        let mut tree = self.tree.lock();
        tree.ensure_parents(path);
        tree.nodes.insert(
            path.to_string(),
            Node::File {
                content: Arc::new(content.into()),
                modified,
            },
        );
        self
    }

    /// Add a directory, creating missing parents.
    pub fn add_dir(&self, path: &str) -> &Self {
        let mut tree = self.tree.lock();
        tree.ensure_parents(path);
        tree.nodes.insert(path.to_string(), Node::Directory);
        self
    }

    /// Make listing the directory at `path` fail with permission denied.
    pub fn deny_listing(&self, path: &str) -> &Self {
        self.tree.lock().deny_listing.insert(path.to_string());
        self
    }

    /// Make reading the file at `path` fail with permission denied.
    pub fn deny_reading(&self, path: &str) -> &Self {
        self.tree.lock().deny_reading.insert(path.to_string());
        self
    }

    /// Make removing the entry at `path` fail with permission denied.
    pub fn deny_removal(&self, path: &str) -> &Self {
        self.tree.lock().deny_removal.insert(path.to_string());
        self
    }

    /// Reject every removal, as a read-only grant would.
    pub fn set_read_only(&self, read_only: bool) -> &Self {
        self.tree.lock().read_only = read_only;
        self
    }

    /// Remove an entry behind the engine's back.
    pub fn remove_externally(&self, path: &str) {
        let mut tree = self.tree.lock();
        for key in tree.descendants(path) {
            tree.nodes.remove(&key);
        }
        tree.nodes.remove(path);
    }

    /// Whether an entry exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.tree.lock().nodes.contains_key(path)
    }

    /// Every path in the tree, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.tree.lock().nodes.keys().cloned().collect()
    }

    /// Paths removed through [`DirectoryHandle::remove_entry`], in order.
    pub fn removals(&self) -> Vec<String> {
        self.tree.lock().removals.clone()
    }

    /// Root-relative path of this directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn child(&self, name: &str) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            path: join_path(&self.path, name),
            name: name.into(),
        }
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self) -> Result<Vec<ChildEntry>, ScanError> {
        let tree = self.tree.lock();
        if tree.deny_listing.contains(&self.path) {
            return Err(ScanError::PermissionDenied {
                path: self.path.clone(),
            });
        }
        if !tree.is_directory(&self.path) {
            return Err(ScanError::NotFound {
                path: self.path.clone(),
            });
        }
        Ok(tree.children(&self.path))
    }

    async fn open_file(&self, name: &str) -> Result<Arc<dyn FileHandle>, ScanError> {
        let path = join_path(&self.path, name);
        let tree = self.tree.lock();
        match tree.nodes.get(&path) {
            Some(Node::File { .. }) => Ok(Arc::new(MemoryFile {
                tree: Arc::clone(&self.tree),
                name: name.into(),
                path,
            })),
            Some(Node::Directory) => Err(ScanError::Unsupported {
                path,
                reason: "is a directory".to_string(),
            }),
            None => Err(ScanError::NotFound { path }),
        }
    }

    async fn open_directory(&self, name: &str) -> Result<Arc<dyn DirectoryHandle>, ScanError> {
        let path = join_path(&self.path, name);
        let tree = self.tree.lock();
        match tree.nodes.get(&path) {
            Some(Node::Directory) => Ok(Arc::new(self.child(name))),
            Some(Node::File { .. }) => Err(ScanError::NotADirectory { path }),
            None => Err(ScanError::NotFound { path }),
        }
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), ScanError> {
        let path = join_path(&self.path, name);
        let mut tree = self.tree.lock();
        if !tree.nodes.contains_key(&path) {
            return Err(ScanError::NotFound { path });
        }
        if tree.read_only || tree.deny_removal.contains(&path) {
            return Err(ScanError::PermissionDenied { path });
        }

        let descendants = tree.descendants(&path);
        if !descendants.is_empty() && !recursive {
            return Err(ScanError::Other {
                message: format!("Directory not empty: {path}"),
            });
        }
        for key in descendants {
            tree.nodes.remove(&key);
        }
        tree.nodes.remove(&path);
        tree.removals.push(path);
        Ok(())
    }
}

/// A file in a shared in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    tree: Arc<Mutex<MemoryTree>>,
    path: String,
    name: CompactString,
}

impl MemoryFile {
    fn node(&self) -> Result<(Arc<Vec<u8>>, SystemTime), ScanError> {
        match self.tree.lock().nodes.get(&self.path) {
            Some(Node::File { content, modified }) => Ok((Arc::clone(content), *modified)),
            _ => Err(ScanError::NotFound {
                path: self.path.clone(),
            }),
        }
    }
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn metadata(&self) -> Result<FileMetadata, ScanError> {
        let (content, modified) = self.node()?;
        Ok(FileMetadata {
            size: content.len() as u64,
            modified,
        })
    }

    async fn read_all(&self) -> Result<Vec<u8>, ScanError> {
        if self.tree.lock().deny_reading.contains(&self.path) {
            return Err(ScanError::PermissionDenied {
                path: self.path.clone(),
            });
        }
        let (content, _) = self.node()?;
        Ok(content.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_file_creates_parents() {
        let root = MemoryDirectory::new("root");
        root.add_file("a/b/c.txt", "data");

        assert_eq!(root.paths(), vec!["a", "a/b", "a/b/c.txt"]);
        assert_eq!(
            root.list_children().await.unwrap(),
            vec![ChildEntry::directory("a")]
        );

        let a = root.open_directory("a").await.unwrap();
        let b = a.open_directory("b").await.unwrap();
        assert_eq!(b.list_children().await.unwrap(), vec![ChildEntry::file("c.txt")]);
    }

    #[tokio::test]
    async fn test_children_do_not_leak_across_siblings() {
        let root = MemoryDirectory::new("root");
        root.add_dir("a").add_file("ab.txt", "x").add_file("a/inner.txt", "y");

        let mut names: Vec<String> = root
            .list_children()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "ab.txt"]);
    }

    #[tokio::test]
    async fn test_removal_rules() {
        let root = MemoryDirectory::new("root");
        root.add_file("full/f.txt", "x").add_dir("empty").add_file("locked.txt", "l");
        root.deny_removal("locked.txt");

        assert!(root.remove_entry("full", false).await.is_err());
        root.remove_entry("empty", false).await.unwrap();
        root.remove_entry("full", true).await.unwrap();
        assert!(!root.exists("full/f.txt"));

        let err = root.remove_entry("locked.txt", false).await.unwrap_err();
        assert!(matches!(err, ScanError::PermissionDenied { .. }));
        let err = root.remove_entry("empty", true).await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(root.removals(), vec!["empty", "full"]);
    }

    #[tokio::test]
    async fn test_read_denial_and_read_only() {
        let root = MemoryDirectory::new("root");
        root.add_file("x.bin", vec![1u8, 2, 3]).deny_reading("x.bin");

        let file = root.open_file("x.bin").await.unwrap();
        assert_eq!(file.metadata().await.unwrap().size, 3);
        assert!(file.read_all().await.is_err());

        root.set_read_only(true);
        assert!(root.remove_entry("x.bin", false).await.is_err());
        assert!(root.exists("x.bin"));
    }
}
