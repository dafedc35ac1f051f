use std::sync::Arc;

use async_trait::async_trait;
use sweepfile_core::WarningKind;
use sweepfile_scan::{
    DirSummary, DirectoryEntry, FileEntry, LocalDirectory, MemoryDirectory, ScanConfig,
    ScanError, ScanPhase, ScanWarning, TreeWalker, Visitor,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Recorder {
    events: Vec<String>,
    exits: Vec<(String, DirSummary)>,
    skipped: Vec<ScanWarning>,
}

#[async_trait]
impl Visitor for Recorder {
    async fn enter_directory(&mut self, dir: &DirectoryEntry) {
        self.events.push(format!("enter:{}", dir.path));
    }

    async fn visit_file(&mut self, file: FileEntry) {
        self.events.push(format!("file:{}", file.path));
    }

    async fn exit_directory(&mut self, dir: &DirectoryEntry, summary: DirSummary) {
        self.events.push(format!("exit:{}", dir.path));
        self.exits.push((dir.path.clone(), summary));
    }

    fn skipped(&mut self, warning: ScanWarning) {
        self.skipped.push(warning);
    }
}

impl Recorder {
    fn summary(&self, path: &str) -> DirSummary {
        self.exits
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| *s)
            .unwrap()
    }
}

/// Removes `remove` from the tree when `trigger` is entered, as if another
/// process deleted it between listing and opening.
struct Vanisher {
    root: MemoryDirectory,
    trigger: &'static str,
    remove: &'static str,
    inner: Recorder,
}

impl Vanisher {
    fn new(root: &MemoryDirectory, trigger: &'static str, remove: &'static str) -> Self {
        Self {
            root: root.clone(),
            trigger,
            remove,
            inner: Recorder::default(),
        }
    }
}

#[async_trait]
impl Visitor for Vanisher {
    async fn enter_directory(&mut self, dir: &DirectoryEntry) {
        if dir.path == self.trigger {
            self.root.remove_externally(self.remove);
        }
        self.inner.enter_directory(dir).await;
    }

    async fn visit_file(&mut self, file: FileEntry) {
        self.inner.visit_file(file).await;
    }

    async fn exit_directory(&mut self, dir: &DirectoryEntry, summary: DirSummary) {
        self.inner.exit_directory(dir, summary).await;
    }

    fn skipped(&mut self, warning: ScanWarning) {
        self.inner.skipped(warning);
    }
}

fn sample_tree() -> MemoryDirectory {
    let root = MemoryDirectory::new("root");
    root.add_file("b/two.txt", "2")
        .add_file("a/one.txt", "1")
        .add_dir("a/empty")
        .add_file("top.txt", "t");
    root
}

fn walker() -> TreeWalker {
    TreeWalker::new(ScanConfig::default()).unwrap()
}

#[tokio::test]
async fn test_walk_order_is_preorder_enter_postorder_exit() {
    let root = sample_tree();
    let mut recorder = Recorder::default();

    let stats = walker()
        .walk(Arc::new(root), &mut recorder)
        .await
        .unwrap();

    assert_eq!(
        recorder.events,
        vec![
            "enter:",
            "enter:a",
            "enter:a/empty",
            "exit:a/empty",
            "file:a/one.txt",
            "exit:a",
            "enter:b",
            "file:b/two.txt",
            "exit:b",
            "file:top.txt",
            "exit:",
        ]
    );
    assert_eq!(stats.files, 3);
    assert_eq!(stats.dirs, 3);
    assert_eq!(stats.warnings, 0);

    assert!(recorder.summary("a/empty").is_empty());
    assert_eq!(recorder.summary("a").files, 1);
    assert_eq!(recorder.summary("").files, 3);
}

#[tokio::test]
async fn test_walk_is_deterministic() {
    let root = sample_tree();
    let walker = walker();

    let mut first = Recorder::default();
    walker.walk(Arc::new(root.clone()), &mut first).await.unwrap();
    let mut second = Recorder::default();
    walker.walk(Arc::new(root), &mut second).await.unwrap();

    assert_eq!(first.events, second.events);
}

#[tokio::test]
async fn test_unlistable_directory_is_isolated() {
    let root = MemoryDirectory::new("root");
    root.add_file("locked/secret.txt", "s")
        .add_file("open/visible.txt", "v")
        .deny_listing("locked");

    let mut recorder = Recorder::default();
    let stats = walker()
        .walk(Arc::new(root), &mut recorder)
        .await
        .unwrap();

    assert!(recorder.events.contains(&"file:open/visible.txt".to_string()));
    assert_eq!(recorder.skipped.len(), 1);
    assert_eq!(recorder.skipped[0].path, "locked");
    assert_eq!(recorder.skipped[0].kind, WarningKind::PermissionDenied);
    assert_eq!(stats.warnings, 1);

    let locked = recorder.summary("locked");
    assert!(!locked.complete);
    assert!(!locked.is_empty());
    assert!(!recorder.summary("").complete);
}

#[tokio::test]
async fn test_root_listing_failure_is_an_error() {
    let root = MemoryDirectory::new("root");
    root.add_file("a.txt", "a").deny_listing("");

    let mut recorder = Recorder::default();
    let result = walker().walk(Arc::new(root), &mut recorder).await;

    assert!(matches!(result, Err(ScanError::PermissionDenied { .. })));
    assert!(recorder.events.is_empty());
}

#[tokio::test]
async fn test_ignored_entries_are_not_visited_but_still_count() {
    let root = MemoryDirectory::new("root");
    root.add_file("keep/notes.md", "n")
        .add_file("skip/ignored.bak", "i")
        .add_dir("node_modules/pkg");

    let config = ScanConfig::builder()
        .ignore_patterns(vec!["*.bak".to_string(), "node_modules".to_string()])
        .build()
        .unwrap();
    let mut recorder = Recorder::default();
    TreeWalker::new(config)
        .unwrap()
        .walk(Arc::new(root), &mut recorder)
        .await
        .unwrap();

    assert!(!recorder.events.iter().any(|e| e.contains("ignored.bak")));
    assert!(!recorder.events.iter().any(|e| e.contains("node_modules")));

    // The ignored file still makes its directory non-empty
    assert_eq!(recorder.summary("skip").files, 1);
    assert!(!recorder.summary("").complete);
}

#[tokio::test]
async fn test_hidden_entries_can_be_skipped() {
    let root = MemoryDirectory::new("root");
    root.add_file(".git/HEAD", "ref").add_file("visible.txt", "v");

    let config = ScanConfig::builder().include_hidden(false).build().unwrap();
    let collection = TreeWalker::new(config)
        .unwrap()
        .collect_files(Arc::new(root))
        .await
        .unwrap();

    let paths: Vec<&str> = collection.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["visible.txt"]);
}

#[tokio::test]
async fn test_max_depth_limits_descent() {
    let root = MemoryDirectory::new("root");
    root.add_file("top.txt", "t")
        .add_file("one/mid.txt", "m")
        .add_file("one/two/deep.txt", "d");

    let config = ScanConfig::builder().max_depth(Some(2u32)).build().unwrap();
    let mut recorder = Recorder::default();
    TreeWalker::new(config)
        .unwrap()
        .walk(Arc::new(root), &mut recorder)
        .await
        .unwrap();

    assert!(recorder.events.contains(&"file:one/mid.txt".to_string()));
    assert!(!recorder.events.iter().any(|e| e.contains("deep.txt")));
    assert!(!recorder.summary("one").complete);
}

#[tokio::test]
async fn test_unreadable_file_is_skipped_but_counted() {
    let root = MemoryDirectory::new("root");
    root.add_file("dir/file.txt", "x");

    let mut vanisher = Vanisher::new(&root, "dir", "dir/file.txt");
    walker().walk(Arc::new(root), &mut vanisher).await.unwrap();

    assert_eq!(vanisher.inner.skipped.len(), 1);
    assert_eq!(vanisher.inner.skipped[0].kind, WarningKind::NotFound);
    assert_eq!(vanisher.inner.summary("dir").files, 1);
}

#[tokio::test]
async fn test_directory_gone_before_open_is_skipped() {
    let root = MemoryDirectory::new("root");
    root.add_file("a/one.txt", "1").add_file("b/two.txt", "2");

    let mut vanisher = Vanisher::new(&root, "a", "b");
    let stats = walker().walk(Arc::new(root), &mut vanisher).await.unwrap();

    assert_eq!(stats.dirs, 1);
    assert_eq!(vanisher.inner.skipped.len(), 1);
    assert_eq!(vanisher.inner.skipped[0].path, "b");
    assert_eq!(vanisher.inner.skipped[0].kind, WarningKind::NotFound);
    assert!(!vanisher.inner.events.iter().any(|e| e == "enter:b"));

    let summary = vanisher.inner.summary("");
    assert_eq!(summary.files, 1);
    assert!(!summary.complete);
}

#[tokio::test]
async fn test_cancellation_stops_walk() {
    let root = sample_tree();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = walker()
        .with_cancellation(cancel)
        .collect_files(Arc::new(root))
        .await;
    assert!(matches!(result, Err(ScanError::Interrupted)));
}

#[tokio::test]
async fn test_count_reports_totals_and_progress() {
    let root = sample_tree();
    let walker = walker();
    let mut rx = walker.subscribe();

    let stats = walker.count(Arc::new(root)).await.unwrap();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.dirs, 3);

    let mut last = None;
    while let Ok(progress) = rx.try_recv() {
        assert_eq!(progress.phase, ScanPhase::Counting);
        last = Some(progress.current);
    }
    // Root plus three subdirectories entered
    assert_eq!(last, Some(4));
}

#[tokio::test]
async fn test_collect_files_from_local_tree() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("nested/deeper")).unwrap();
    std::fs::write(temp.path().join("nested/deeper/z.txt"), "zzz").unwrap();
    std::fs::write(temp.path().join("a.txt"), "a").unwrap();

    let root = LocalDirectory::open(temp.path()).await.unwrap();
    let collection = walker().collect_files(Arc::new(root)).await.unwrap();

    let paths: Vec<&str> = collection.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.txt", "nested/deeper/z.txt"]);
    assert_eq!(collection.files[1].size, 3);
    assert!(collection.skipped.is_empty());
}
