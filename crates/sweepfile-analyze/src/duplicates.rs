//! Duplicate file detection using content hashing.
//!
//! Runs in two passes over the tree:
//! 1. Enumerate files, keeping those that pass the type and size filters
//! 2. Compute a full BLAKE3 hash of each kept file and group by hash
//!
//! With the size pre-filter on, files whose size no other file shares are
//! never read. Groups are the same either way.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sweepfile_core::{
    ContentHash, DeletionOutcome, DeletionTarget, DirectoryHandle, FileEntry, ScanConfig,
    ScanError, ScanPhase, ScanProgress, ScanWarning,
};
use sweepfile_scan::{progress_channel, ProgressTracker, TreeWalker};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "heic", "heif",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "mpeg", "mpg", "3gp", "m4v",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods", "odp",
];

/// Which files take part in duplicate detection, by extension.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileTypeFilter {
    #[default]
    All,
    Images,
    Videos,
    Documents,
    /// Anything that is not an image, video or document, including files
    /// without an extension.
    Others,
}

impl FileTypeFilter {
    /// Whether a file with the given lower-cased extension passes.
    pub fn matches(&self, extension: Option<&str>) -> bool {
        let in_set = |set: &[&str]| extension.is_some_and(|ext| set.contains(&ext));
        match self {
            Self::All => true,
            Self::Images => in_set(IMAGE_EXTENSIONS),
            Self::Videos => in_set(VIDEO_EXTENSIONS),
            Self::Documents => in_set(DOCUMENT_EXTENSIONS),
            Self::Others => {
                !in_set(IMAGE_EXTENSIONS)
                    && !in_set(VIDEO_EXTENSIONS)
                    && !in_set(DOCUMENT_EXTENSIONS)
            }
        }
    }
}

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DuplicateConfig {
    /// File types to consider.
    #[builder(default)]
    #[serde(default)]
    pub file_type: FileTypeFilter,

    /// Minimum file size to consider.
    #[builder(default = "0")]
    #[serde(default)]
    pub min_size: u64,

    /// Maximum file size to consider.
    #[builder(default = "u64::MAX")]
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Skip hashing files whose size is unique.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub size_prefilter: bool,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_groups: usize,
}

fn default_max_size() -> u64 {
    u64::MAX
}

fn default_true() -> bool {
    true
}

impl DuplicateConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(format!("min_size ({min}) is larger than max_size ({max})"));
            }
        }
        Ok(())
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            file_type: FileTypeFilter::All,
            min_size: 0,
            max_size: u64::MAX,
            size_prefilter: true,
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }

    fn accepts(&self, file: &FileEntry) -> bool {
        file.size >= self.min_size
            && file.size <= self.max_size
            && self.file_type.matches(file.extension().as_deref())
    }
}

/// A group of duplicate files sharing the same content.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// All duplicate files, in discovery order.
    pub files: Vec<FileEntry>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    fn new(hash: ContentHash, size: u64, files: Vec<FileEntry>) -> Self {
        let mut group = Self {
            hash,
            size,
            files,
            wasted_bytes: 0,
        };
        group.update_wasted();
        group
    }

    fn update_wasted(&mut self) {
        self.wasted_bytes = self.size * self.deletable_count() as u64;
    }

    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// The first file found. A hint for which copy to keep, nothing more.
    pub fn original(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    /// Every file except the original.
    pub fn all_but_first(&self) -> &[FileEntry] {
        self.files.get(1..).unwrap_or_default()
    }
}

/// A set of files picked for removal, by root-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelection {
    paths: BTreeSet<String>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    pub fn deselect(&mut self, path: &str) {
        self.paths.remove(path);
    }

    /// Flip the selection state of `path`. Returns whether it is now selected.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.paths.remove(path) {
            false
        } else {
            self.paths.insert(path.to_string());
            true
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Groups of duplicate files, sorted by wasted space descending.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files that passed the filters.
    pub files_analyzed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of unique duplicate groups.
    pub group_count: usize,

    /// Files that could not be read or hashed.
    pub skipped: Vec<ScanWarning>,
}

impl DuplicateReport {
    fn from_groups(
        groups: Vec<DuplicateGroup>,
        files_analyzed: u64,
        skipped: Vec<ScanWarning>,
    ) -> Self {
        let mut report = Self {
            groups,
            files_analyzed,
            skipped,
            ..Self::default()
        };
        report.update_totals();
        report
    }

    fn update_totals(&mut self) {
        self.total_duplicate_size = self
            .groups
            .iter()
            .map(|g| g.size * g.files.len() as u64)
            .sum();
        self.total_wasted_space = self.groups.iter().map(|g| g.wasted_bytes).sum();
        self.files_with_duplicates = self.groups.iter().map(|g| g.files.len() as u64).sum();
        self.group_count = self.groups.len();
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Select every file except the first of each group.
    pub fn select_all_but_first(&self) -> FileSelection {
        let mut selection = FileSelection::new();
        for group in &self.groups {
            for file in group.all_but_first() {
                selection.select(file.path.clone());
            }
        }
        selection
    }

    /// Every selected file that is still part of a group.
    pub fn selected_files<'a>(
        &'a self,
        selection: &'a FileSelection,
    ) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.groups
            .iter()
            .flat_map(|g| g.files.iter())
            .filter(|f| selection.contains(&f.path))
    }

    /// Total size of the selected files.
    pub fn selected_size(&self, selection: &FileSelection) -> u64 {
        self.selected_files(selection).map(|f| f.size).sum()
    }

    /// Turn a selection into removal targets, one per selected file.
    pub fn deletion_targets(&self, selection: &FileSelection) -> Vec<DeletionTarget> {
        self.selected_files(selection)
            .map(|f| DeletionTarget::file(&f.path, f.name.clone(), Arc::clone(&f.parent), f.size))
            .collect()
    }

    /// Drop files that are gone after a deletion run.
    ///
    /// Groups left with fewer than two files are removed and the rest are
    /// ranked again. Failed removals leave their files in place.
    pub fn apply_deletions(&mut self, outcomes: &[DeletionOutcome]) {
        let gone: HashSet<&str> = outcomes
            .iter()
            .filter(|o| o.is_gone())
            .map(|o| o.path.as_str())
            .collect();
        if gone.is_empty() {
            return;
        }

        for group in &mut self.groups {
            group.files.retain(|f| !gone.contains(f.path.as_str()));
            group.update_wasted();
        }
        self.groups.retain(|g| g.files.len() >= 2);
        self.groups.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));
        self.update_totals();
    }
}

/// Duplicate file finder.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: DuplicateConfig,
    walker: TreeWalker,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self::build(TreeWalker::default(), DuplicateConfig::default())
    }

    /// Create a new duplicate finder with custom traversal and detection config.
    pub fn with_config(
        scan_config: ScanConfig,
        config: DuplicateConfig,
    ) -> Result<Self, ScanError> {
        Ok(Self::build(TreeWalker::new(scan_config)?, config))
    }

    fn build(walker: TreeWalker, config: DuplicateConfig) -> Self {
        let progress_tx = progress_channel();
        Self {
            config,
            walker: walker.with_progress(progress_tx.clone()),
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    /// Stop detection once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.walker = self.walker.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Find duplicates below `root`.
    pub async fn find_duplicates(
        &self,
        root: Arc<dyn DirectoryHandle>,
    ) -> Result<DuplicateReport, ScanError> {
        // Pass 1: enumerate
        let collection = self.walker.collect_files(root).await?;
        let mut skipped = collection.skipped;

        let mut candidates: Vec<FileEntry> = collection
            .files
            .into_iter()
            .filter(|f| self.config.accepts(f))
            .collect();
        let files_analyzed = candidates.len() as u64;

        if self.config.size_prefilter {
            candidates = retain_shared_sizes(candidates);
        }
        debug!(
            analyzed = files_analyzed,
            to_hash = candidates.len(),
            "enumeration complete"
        );

        // Pass 2: hash and group in discovery order
        let mut progress = ProgressTracker::new(
            self.progress_tx.clone(),
            ScanPhase::Hashing,
            candidates.len() as u64,
            self.walker.config().progress_interval,
        );
        progress.start();

        let mut by_hash: IndexMap<ContentHash, (u64, Vec<FileEntry>)> = IndexMap::new();
        for file in candidates {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Interrupted);
            }

            match file.handle.read_all().await {
                Ok(content) => {
                    let hash = ContentHash::new(*blake3::hash(&content).as_bytes());
                    by_hash
                        .entry(hash)
                        .or_insert_with(|| (content.len() as u64, Vec::new()))
                        .1
                        .push(file);
                }
                Err(err) => {
                    warn!(path = %file.path, error = %err, "cannot hash file");
                    skipped.push(ScanWarning::from_error(&file.path, &err));
                }
            }
            progress.advance();
        }
        progress.finish();

        let mut groups: Vec<DuplicateGroup> = by_hash
            .into_iter()
            .filter(|(_, (_, files))| files.len() >= 2)
            .map(|(hash, (size, files))| DuplicateGroup::new(hash, size, files))
            .collect();
        // Stable sort keeps discovery order among equal groups
        groups.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));

        // Apply max_groups limit if set
        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        let report = DuplicateReport::from_groups(groups, files_analyzed, skipped);
        info!(
            groups = report.group_count,
            wasted = report.total_wasted_space,
            skipped = report.skipped.len(),
            "duplicate detection complete"
        );
        Ok(report)
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only files whose size at least one other file shares.
fn retain_shared_sizes(files: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for file in &files {
        *counts.entry(file.size).or_default() += 1;
    }
    files
        .into_iter()
        .filter(|f| counts.get(&f.size).is_some_and(|&n| n > 1))
        .collect()
}
