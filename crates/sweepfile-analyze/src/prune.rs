//! Empty folder pruning.
//!
//! Every directory below the root resolves to [`Emptiness::HasContent`] or
//! [`Emptiness::Empty`] once all of its children have resolved. Empty
//! directories are removed recursively through their parent handle as soon
//! as they resolve, so a parent that only held empty directories resolves
//! empty as well and is removed right after them.

use std::sync::Arc;

use async_trait::async_trait;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use sweepfile_core::{
    DeletionOutcome, DeletionTarget, DirectoryEntry, DirectoryHandle, ScanConfig, ScanError,
    ScanPhase, ScanProgress, ScanWarning,
};
use sweepfile_scan::{progress_channel, DirSummary, ProgressTracker, TreeWalker, Visitor};

/// Configuration for empty folder pruning.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct PruneConfig {
    /// Resolve the tree without removing anything.
    #[builder(default)]
    #[serde(default)]
    pub dry_run: bool,

    /// Count directories first so progress has a total.
    #[builder(default)]
    #[serde(default)]
    pub precount: bool,
}

impl PruneConfig {
    /// Create a new config builder.
    pub fn builder() -> PruneConfigBuilder {
        PruneConfigBuilder::default()
    }
}

/// Final state of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emptiness {
    /// A file exists somewhere below, or the subtree could not be fully read.
    HasContent,
    /// No file exists anywhere below.
    Empty,
}

/// One directory's resolution, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryResolution {
    /// Root-relative path; empty for the root.
    pub path: String,
    pub emptiness: Emptiness,
}

/// Results from a pruning pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneReport {
    /// Every resolved directory, children before parents.
    pub resolutions: Vec<DirectoryResolution>,
    /// One outcome per attempted removal.
    pub outcomes: Vec<DeletionOutcome>,
    /// Directories that would be removed (dry run only).
    pub planned: Vec<String>,
    /// Entries that could not be read.
    pub warnings: Vec<ScanWarning>,
    /// The pass was cancelled; outcomes so far are still listed.
    pub interrupted: bool,
}

impl PruneReport {
    /// Number of directories removed.
    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.deleted).count()
    }

    /// Number of removals that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.deleted).count()
    }

    /// Resolution of the directory at `path`, if it was reached.
    pub fn resolution(&self, path: &str) -> Option<Emptiness> {
        self.resolutions
            .iter()
            .find(|r| r.path == path)
            .map(|r| r.emptiness)
    }
}

/// Removes directories that contain no files anywhere below them.
///
/// The root itself is never removed.
#[derive(Debug, Clone)]
pub struct EmptyFolderPruner {
    config: PruneConfig,
    walker: TreeWalker,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl EmptyFolderPruner {
    /// Create a pruner with the given traversal and pruning configuration.
    pub fn new(scan_config: ScanConfig, config: PruneConfig) -> Result<Self, ScanError> {
        let progress_tx = progress_channel();
        let walker = TreeWalker::new(scan_config)?.with_progress(progress_tx.clone());
        Ok(Self {
            config,
            walker,
            progress_tx,
        })
    }

    /// Stop pruning once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.walker = self.walker.with_cancellation(cancel);
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Resolve every directory below `root` and remove the empty ones.
    ///
    /// Fails only when the root cannot be listed or the pre-count is
    /// cancelled. Cancellation during the pass returns the partial report
    /// with `interrupted` set.
    pub async fn prune(&self, root: Arc<dyn DirectoryHandle>) -> Result<PruneReport, ScanError> {
        let total = if self.config.precount {
            self.walker.count(Arc::clone(&root)).await?.dirs + 1
        } else {
            0
        };

        let mut progress = ProgressTracker::new(
            self.progress_tx.clone(),
            ScanPhase::Pruning,
            total,
            self.walker.config().progress_interval,
        );
        progress.start();

        let mut visitor = PruneVisitor {
            dry_run: self.config.dry_run,
            report: PruneReport::default(),
            progress,
        };

        match self.walker.walk(root, &mut visitor).await {
            Ok(_) => {}
            Err(ScanError::Interrupted) => {
                info!("pruning interrupted");
                visitor.report.interrupted = true;
            }
            Err(err) => return Err(err),
        }
        visitor.progress.finish();

        let report = visitor.report;
        info!(
            resolved = report.resolutions.len(),
            deleted = report.deleted_count(),
            failed = report.failed_count(),
            dry_run = self.config.dry_run,
            "pruning complete"
        );
        Ok(report)
    }
}

struct PruneVisitor {
    dry_run: bool,
    report: PruneReport,
    progress: ProgressTracker,
}

#[async_trait]
impl Visitor for PruneVisitor {
    fn wants_files(&self) -> bool {
        false
    }

    async fn exit_directory(&mut self, dir: &DirectoryEntry, summary: DirSummary) {
        let emptiness = if summary.is_empty() {
            Emptiness::Empty
        } else {
            Emptiness::HasContent
        };
        debug!(path = %dir.path, ?emptiness, "resolved");
        self.report.resolutions.push(DirectoryResolution {
            path: dir.path.clone(),
            emptiness,
        });
        self.progress.advance();

        let Some(parent) = &dir.parent else {
            return;
        };
        if emptiness != Emptiness::Empty {
            return;
        }

        if self.dry_run {
            self.report.planned.push(dir.path.clone());
        } else {
            let target = DeletionTarget::directory(&dir.path, dir.name.clone(), Arc::clone(parent));
            self.report.outcomes.push(target.remove().await);
        }
    }

    fn skipped(&mut self, warning: ScanWarning) {
        self.report.warnings.push(warning);
    }
}
