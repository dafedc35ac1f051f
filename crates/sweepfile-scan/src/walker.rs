//! Depth-first traversal over directory handle capabilities.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use async_trait::async_trait;
use sweepfile_core::{
    join_path, ChildEntry, DirectoryEntry, DirectoryHandle, EntryFilter, EntryKind, FileEntry,
    FileHandle, Handle, ScanConfig, ScanError, ScanPhase, ScanProgress, ScanWarning,
};

use crate::progress::{progress_channel, ProgressTracker};

/// What the walker learned about a directory's subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSummary {
    /// Files anywhere below the directory, counted from listings.
    pub files: u64,
    /// Every directory below was enumerated.
    pub complete: bool,
}

impl DirSummary {
    fn new() -> Self {
        Self {
            files: 0,
            complete: true,
        }
    }

    /// A directory whose children are unknown.
    fn unexplored() -> Self {
        Self {
            files: 0,
            complete: false,
        }
    }

    fn absorb(&mut self, child: DirSummary) {
        self.files += child.files;
        self.complete &= child.complete;
    }

    /// No file exists anywhere below, and that is known for certain.
    pub fn is_empty(&self) -> bool {
        self.files == 0 && self.complete
    }
}

/// Callbacks driven by [`TreeWalker::walk`].
///
/// Directories are entered in pre-order and exited in post-order: a
/// directory's exit always comes after the exit of every directory below it.
#[async_trait]
pub trait Visitor: Send {
    /// Whether files should be opened and passed to [`Visitor::visit_file`].
    ///
    /// Files are still counted in [`DirSummary`] when this returns false.
    fn wants_files(&self) -> bool {
        true
    }

    async fn enter_directory(&mut self, _dir: &DirectoryEntry) {}

    async fn visit_file(&mut self, _file: FileEntry) {}

    async fn exit_directory(&mut self, _dir: &DirectoryEntry, _summary: DirSummary) {}

    /// An entry could not be opened, read or enumerated.
    fn skipped(&mut self, _warning: ScanWarning) {}
}

/// Totals for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Files listed (including unreadable ones).
    pub files: u64,
    /// Directories entered below the root.
    pub dirs: u64,
    /// Entry-level failures.
    pub warnings: u64,
}

/// Files gathered by [`TreeWalker::collect_files`], in discovery order.
#[derive(Debug, Clone, Default)]
pub struct FileCollection {
    pub files: Vec<FileEntry>,
    pub skipped: Vec<ScanWarning>,
    pub stats: WalkStats,
}

/// Sequential depth-first walker.
///
/// Children are visited in name order, so two walks over an unchanged tree
/// see the same sequence. Failures are isolated per entry: an unreadable
/// directory is reported and its siblings are still walked. Only failing to
/// list the root aborts a walk.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    config: ScanConfig,
    filter: EntryFilter,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self {
            config: ScanConfig::default(),
            filter: EntryFilter::default(),
            cancel: CancellationToken::new(),
            progress_tx: progress_channel(),
        }
    }
}

impl TreeWalker {
    /// Create a walker for the given configuration.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let filter = config.entry_filter()?;
        Ok(Self {
            config,
            filter,
            cancel: CancellationToken::new(),
            progress_tx: progress_channel(),
        })
    }

    /// Stop walking once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send enumeration and counting progress to `tx`.
    pub fn with_progress(mut self, tx: broadcast::Sender<ScanProgress>) -> Self {
        self.progress_tx = tx;
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Walk everything below `root`, driving `visitor`.
    pub async fn walk<V: Visitor>(
        &self,
        root: Arc<dyn DirectoryHandle>,
        visitor: &mut V,
    ) -> Result<WalkStats, ScanError> {
        self.check_cancelled()?;
        let children = root.list_children().await?;
        let entry = DirectoryEntry {
            path: String::new(),
            name: root.name().into(),
            depth: 0,
            parent: None,
            handle: root,
        };

        let mut stats = WalkStats::default();
        self.walk_dir(entry, children, visitor, &mut stats).await?;
        debug!(
            files = stats.files,
            dirs = stats.dirs,
            warnings = stats.warnings,
            "walk complete"
        );
        Ok(stats)
    }

    /// Count files and directories with one full traversal.
    pub async fn count(&self, root: Arc<dyn DirectoryHandle>) -> Result<WalkStats, ScanError> {
        let mut counter = CountingVisitor {
            progress: ProgressTracker::new(
                self.progress_tx.clone(),
                ScanPhase::Counting,
                0,
                self.config.progress_interval,
            ),
        };
        let stats = self.walk(root, &mut counter).await?;
        counter.progress.finish();
        Ok(stats)
    }

    /// Collect every readable file below `root` in discovery order.
    pub async fn collect_files(
        &self,
        root: Arc<dyn DirectoryHandle>,
    ) -> Result<FileCollection, ScanError> {
        let mut collector = CollectingVisitor {
            files: Vec::new(),
            skipped: Vec::new(),
            progress: ProgressTracker::new(
                self.progress_tx.clone(),
                ScanPhase::Enumerating,
                0,
                self.config.progress_interval,
            ),
        };
        let stats = self.walk(root, &mut collector).await?;
        collector.progress.finish();

        Ok(FileCollection {
            files: collector.files,
            skipped: collector.skipped,
            stats,
        })
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            Err(ScanError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn walk_dir<'a, V: Visitor>(
        &'a self,
        dir: DirectoryEntry,
        mut children: Vec<ChildEntry>,
        visitor: &'a mut V,
        stats: &'a mut WalkStats,
    ) -> BoxFuture<'a, Result<DirSummary, ScanError>> {
        async move {
            visitor.enter_directory(&dir).await;
            children.sort_by(|a, b| a.name.cmp(&b.name));

            let mut summary = DirSummary::new();
            for child in children {
                self.check_cancelled()?;

                if self.filter.should_skip(&child.name) {
                    // Ignored entries still exist on disk.
                    match child.kind {
                        EntryKind::File => summary.files += 1,
                        EntryKind::Directory => summary.complete = false,
                    }
                    continue;
                }

                let path = join_path(&dir.path, &child.name);
                let depth = dir.depth + 1;
                match child.kind {
                    EntryKind::File => {
                        summary.files += 1;
                        stats.files += 1;
                        if !visitor.wants_files() {
                            continue;
                        }
                    }
                    EntryKind::Directory => {
                        if !self.config.allows_depth(depth) {
                            summary.complete = false;
                            continue;
                        }
                    }
                }

                let handle = match Handle::open_child(dir.handle.as_ref(), &child).await {
                    Ok(handle) => handle,
                    Err(err) => {
                        warn!(path = %path, error = %err, "cannot open entry");
                        stats.warnings += 1;
                        visitor.skipped(ScanWarning::from_error(&path, &err));
                        if child.kind == EntryKind::Directory {
                            summary.complete = false;
                        }
                        continue;
                    }
                };

                match handle {
                    Handle::File(handle) => match file_entry(&dir, &child, path, handle).await {
                        Ok(file) => visitor.visit_file(file).await,
                        Err(warning) => {
                            warn!(path = %warning.path, "{}", warning.message);
                            stats.warnings += 1;
                            visitor.skipped(warning);
                        }
                    },
                    Handle::Directory(handle) => {
                        stats.dirs += 1;
                        let entry = DirectoryEntry {
                            path,
                            name: child.name.clone(),
                            depth,
                            parent: Some(dir.handle.clone()),
                            handle,
                        };

                        let listing = entry.handle.list_children().await;
                        let child_summary = match listing {
                            Ok(grandchildren) => {
                                self.walk_dir(entry, grandchildren, &mut *visitor, &mut *stats)
                                    .await?
                            }
                            Err(err) => {
                                warn!(path = %entry.path, error = %err, "cannot list directory");
                                stats.warnings += 1;
                                visitor.skipped(ScanWarning::from_error(&entry.path, &err));
                                visitor.enter_directory(&entry).await;
                                let unexplored = DirSummary::unexplored();
                                visitor.exit_directory(&entry, unexplored).await;
                                unexplored
                            }
                        };
                        summary.absorb(child_summary);
                    }
                }
            }

            visitor.exit_directory(&dir, summary).await;
            Ok(summary)
        }
        .boxed()
    }
}

async fn file_entry(
    dir: &DirectoryEntry,
    child: &ChildEntry,
    path: String,
    handle: Arc<dyn FileHandle>,
) -> Result<FileEntry, ScanWarning> {
    let metadata = handle
        .metadata()
        .await
        .map_err(|e| ScanWarning::metadata_error(&path, &e))?;

    Ok(FileEntry {
        path,
        name: child.name.clone(),
        size: metadata.size,
        modified: metadata.modified,
        parent: dir.handle.clone(),
        handle,
    })
}

struct CountingVisitor {
    progress: ProgressTracker,
}

#[async_trait]
impl Visitor for CountingVisitor {
    fn wants_files(&self) -> bool {
        false
    }

    async fn enter_directory(&mut self, _dir: &DirectoryEntry) {
        self.progress.advance();
    }
}

struct CollectingVisitor {
    files: Vec<FileEntry>,
    skipped: Vec<ScanWarning>,
    progress: ProgressTracker,
}

#[async_trait]
impl Visitor for CollectingVisitor {
    async fn visit_file(&mut self, file: FileEntry) {
        self.files.push(file);
        self.progress.advance();
    }

    fn skipped(&mut self, warning: ScanWarning) {
        self.skipped.push(warning);
    }
}
