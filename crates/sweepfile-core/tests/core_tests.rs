use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use sweepfile_core::{
    ChildEntry, ContentHash, DeletionTarget, DirectoryHandle, EntryKind, FileEntry, FileHandle,
    FileMetadata, Handle, ScanConfig, ScanError, ScanPhase, ScanProgress,
};

/// A directory that records removals and fails for names starting with `locked`.
#[derive(Debug, Default)]
struct RecordingDir {
    removed: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl DirectoryHandle for RecordingDir {
    fn name(&self) -> &str {
        "root"
    }

    async fn list_children(&self) -> Result<Vec<ChildEntry>, ScanError> {
        Ok(vec![ChildEntry::file("a.txt"), ChildEntry::directory("sub")])
    }

    async fn open_file(&self, name: &str) -> Result<Arc<dyn FileHandle>, ScanError> {
        Ok(Arc::new(StaticFile {
            name: name.to_string(),
        }))
    }

    async fn open_directory(&self, _name: &str) -> Result<Arc<dyn DirectoryHandle>, ScanError> {
        Ok(Arc::new(RecordingDir::default()))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), ScanError> {
        if name.starts_with("locked") {
            return Err(ScanError::PermissionDenied {
                path: name.to_string(),
            });
        }
        if name.starts_with("gone") {
            return Err(ScanError::NotFound {
                path: name.to_string(),
            });
        }
        self.removed
            .lock()
            .unwrap()
            .push((name.to_string(), recursive));
        Ok(())
    }
}

#[derive(Debug)]
struct StaticFile {
    name: String,
}

#[async_trait]
impl FileHandle for StaticFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn metadata(&self) -> Result<FileMetadata, ScanError> {
        Ok(FileMetadata {
            size: 5,
            modified: SystemTime::UNIX_EPOCH,
        })
    }

    async fn read_all(&self) -> Result<Vec<u8>, ScanError> {
        Ok(b"hello".to_vec())
    }
}

#[test]
fn test_content_hash_creation_and_hex() {
    let bytes = [0xab; 32];
    let hash = ContentHash::new(bytes);

    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(hex.starts_with("ab"));

    assert_eq!(hash, ContentHash::new(bytes));
    assert_ne!(hash, ContentHash::new([0xcd; 32]));
}

#[tokio::test]
async fn test_open_child_respects_kind() {
    let root = RecordingDir::default();

    let file = Handle::open_child(&root, &ChildEntry::file("a.txt"))
        .await
        .unwrap();
    assert_eq!(file.kind(), EntryKind::File);
    assert_eq!(file.name(), "a.txt");
    assert!(file.clone().into_directory().is_none());
    let content = file.into_file().unwrap().read_all().await.unwrap();
    assert_eq!(content, b"hello");

    let dir = Handle::open_child(&root, &ChildEntry::directory("sub"))
        .await
        .unwrap();
    assert_eq!(dir.kind(), EntryKind::Directory);
    assert!(dir.into_directory().is_some());
}

#[tokio::test]
async fn test_deletion_target_outcomes() {
    let root = Arc::new(RecordingDir::default());
    let parent: Arc<dyn DirectoryHandle> = root.clone();

    let ok = DeletionTarget::directory("x/empty", "empty", parent.clone())
        .remove()
        .await;
    assert!(ok.deleted);
    assert_eq!(ok.path, "x/empty");

    let denied = DeletionTarget::file("x/locked.txt", "locked.txt", parent.clone(), 10)
        .remove()
        .await;
    assert!(!denied.deleted);
    assert!(!denied.missing);
    assert!(denied.reason.is_some());

    let gone = DeletionTarget::file("x/gone.txt", "gone.txt", parent, 10)
        .remove()
        .await;
    assert!(!gone.deleted);
    assert!(gone.missing);

    let removed = root.removed.lock().unwrap().clone();
    assert_eq!(removed, vec![("empty".to_string(), true)]);
}

#[test]
fn test_file_entry_age_and_extension() {
    let parent: Arc<dyn DirectoryHandle> = Arc::new(RecordingDir::default());
    let handle: Arc<dyn FileHandle> = Arc::new(StaticFile {
        name: "Crash.DMP".to_string(),
    });
    let now = SystemTime::now();
    let entry = FileEntry {
        path: "reports/Crash.DMP".to_string(),
        name: "Crash.DMP".into(),
        size: 42,
        modified: now - Duration::from_secs(3600),
        parent,
        handle,
    };

    assert_eq!(entry.extension().as_deref(), Some("dmp"));
    assert_eq!(entry.age(now), Duration::from_secs(3600));
    // A modification time after the reference counts as zero age
    assert_eq!(entry.age(now - Duration::from_secs(7200)), Duration::ZERO);
}

#[test]
fn test_file_entry_serializes_without_handles() {
    let parent: Arc<dyn DirectoryHandle> = Arc::new(RecordingDir::default());
    let handle: Arc<dyn FileHandle> = Arc::new(StaticFile {
        name: "a.txt".to_string(),
    });
    let entry = FileEntry {
        path: "a.txt".to_string(),
        name: "a.txt".into(),
        size: 5,
        modified: SystemTime::UNIX_EPOCH,
        parent,
        handle,
    };

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["path"], "a.txt");
    assert_eq!(json["size"], 5);
    assert!(json.get("parent").is_none());
    assert!(json.get("handle").is_none());
}

#[test]
fn test_scan_config_round_trip_defaults() {
    let config: ScanConfig = serde_json::from_str("{}").unwrap();
    assert!(config.include_hidden);
    assert_eq!(config.progress_interval, 20);
    assert!(config.ignore_patterns.is_empty());
}

#[test]
fn test_progress_display() {
    let progress = ScanProgress::new(ScanPhase::Deleting, 1, 4, "Deleting 1/4");
    assert_eq!(progress.phase.to_string(), "Deleting");
    assert_eq!(progress.percentage(), 25.0);
}
