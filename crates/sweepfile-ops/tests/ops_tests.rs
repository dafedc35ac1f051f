use std::fs;
use std::sync::Arc;

use sweepfile_core::DirectoryHandle;
use sweepfile_ops::{delete_all, start_deletion, DeletionResult, DeletionTarget};
use sweepfile_scan::{LocalDirectory, MemoryDirectory};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn file_targets(root: &MemoryDirectory, names: &[&str]) -> Vec<DeletionTarget> {
    let parent: Arc<dyn DirectoryHandle> = Arc::new(root.clone());
    names
        .iter()
        .map(|name| DeletionTarget::file(*name, *name, Arc::clone(&parent), 10))
        .collect()
}

#[tokio::test]
async fn test_start_deletion_reports_progress_and_completion() {
    let root = MemoryDirectory::new("root");
    root.add_file("a", "x").add_file("b", "x").add_file("c", "x");

    let mut rx = start_deletion(
        file_targets(&root, &["a", "b", "c"]),
        CancellationToken::new(),
    );

    let mut progress_updates = Vec::new();
    let mut complete = None;
    while let Some(result) = rx.recv().await {
        match result {
            DeletionResult::Progress(p) => progress_updates.push(p),
            DeletionResult::Complete(c) => complete = Some(c),
        }
    }

    let complete = complete.unwrap();
    assert_eq!(complete.deleted, 3);
    assert_eq!(complete.bytes_freed, 30);
    assert!(complete.is_success());
    assert!(root.paths().is_empty());

    let last = progress_updates.last().unwrap();
    assert_eq!(last.items_completed, 3);
    assert_eq!(last.items_total, 3);
    assert!(progress_updates
        .windows(2)
        .all(|w| w[0].items_completed <= w[1].items_completed));
}

#[tokio::test]
async fn test_failures_are_independent() {
    let root = MemoryDirectory::new("root");
    root.add_file("a", "x")
        .add_file("locked", "x")
        .add_file("c", "x")
        .deny_removal("locked");

    let complete = delete_all(
        file_targets(&root, &["a", "locked", "c", "vanished"]),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(complete.outcomes.len(), 4);
    assert_eq!(complete.deleted, 2);
    assert_eq!(complete.failed, 1);
    assert_eq!(complete.missing, 1);
    assert_eq!(complete.bytes_freed, 20);

    let failures: Vec<&str> = complete.failures().map(|o| o.path.as_str()).collect();
    assert_eq!(failures, vec!["locked"]);
    assert!(root.exists("locked"));
}

#[tokio::test]
async fn test_cancelled_run_stops_early() {
    let root = MemoryDirectory::new("root");
    root.add_file("a", "x").add_file("b", "x");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let complete = delete_all(file_targets(&root, &["a", "b"]), cancel).await;

    assert!(complete.cancelled);
    assert!(complete.outcomes.is_empty());
    assert!(root.exists("a") && root.exists("b"));
}

#[tokio::test]
async fn test_empty_target_list_completes() {
    let mut rx = start_deletion(Vec::new(), CancellationToken::new());

    let mut saw_complete = false;
    while let Some(result) = rx.recv().await {
        if let DeletionResult::Complete(complete) = result {
            assert_eq!(complete.deleted, 0);
            saw_complete = true;
        }
    }
    assert!(saw_complete);
}

#[tokio::test]
async fn test_delete_local_files_and_directories() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("junk.tmp"), "12345").unwrap();
    fs::create_dir_all(temp.path().join("old/nested")).unwrap();

    let root: Arc<dyn DirectoryHandle> = Arc::new(LocalDirectory::open(temp.path()).await.unwrap());
    let targets = vec![
        DeletionTarget::file("junk.tmp", "junk.tmp", Arc::clone(&root), 5),
        DeletionTarget::directory("old", "old", Arc::clone(&root)),
    ];

    let complete = delete_all(targets, CancellationToken::new()).await;

    assert_eq!(complete.deleted, 2);
    assert_eq!(complete.bytes_freed, 5);
    assert!(!temp.path().join("junk.tmp").exists());
    assert!(!temp.path().join("old").exists());
}
