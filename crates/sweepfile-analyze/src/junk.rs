//! Junk file classification.
//!
//! Every file is checked against a fixed set of six categories. A file can
//! match several of them; files that match none are left out of the report.
//! Matching only looks at the path, name, extension and age, never at
//! content.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use sweepfile_core::{
    DeletionOutcome, DeletionTarget, DirectoryHandle, FileEntry, ScanConfig, ScanError,
    ScanPhase, ScanProgress, ScanWarning,
};
use sweepfile_scan::{progress_channel, ProgressTracker, TreeWalker};

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Identifier of a junk category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum JunkCategoryId {
    TempSystem,
    CacheBrowser,
    LogFiles,
    InstallerResiduals,
    ThumbCache,
    CrashDumps,
}

impl JunkCategoryId {
    /// The category definition for this id.
    pub fn category(&self) -> &'static JunkCategory {
        &CATEGORIES[*self as usize]
    }

    pub fn label(&self) -> &'static str {
        self.category().label
    }

    pub fn description(&self) -> &'static str {
        self.category().description
    }
}

/// Normalized view of a file that category predicates run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    /// Lower-cased root-relative path with a leading `/`.
    pub path: String,
    /// Lower-cased file name.
    pub name: String,
    /// Lower-cased text after the last `.` in the name.
    pub extension: Option<String>,
    pub size: u64,
    /// Time since last modification, relative to the configured reference.
    pub age: Duration,
}

impl MatchContext {
    pub fn new(file: &FileEntry, reference: SystemTime) -> Self {
        Self {
            path: format!("/{}", file.path.to_lowercase()),
            name: file.name.to_lowercase().to_string(),
            extension: file.extension(),
            size: file.size,
            age: file.age(reference),
        }
    }

    fn has_extension(&self, set: &[&str]) -> bool {
        self.extension
            .as_deref()
            .is_some_and(|ext| set.contains(&ext))
    }

    fn path_contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.path.contains(n))
    }
}

/// A junk category: id, human-readable text and its predicate.
#[derive(Debug)]
pub struct JunkCategory {
    pub id: JunkCategoryId,
    pub label: &'static str,
    pub description: &'static str,
    predicate: fn(&MatchContext, &JunkConfig) -> bool,
}

impl JunkCategory {
    /// Whether a file belongs to this category.
    pub fn matches(&self, context: &MatchContext, config: &JunkConfig) -> bool {
        (self.predicate)(context, config)
    }
}

/// All categories, in id order.
pub static CATEGORIES: [JunkCategory; 6] = [
    JunkCategory {
        id: JunkCategoryId::TempSystem,
        label: "System temporary files",
        description: "Files ending in .tmp, .temp, .bak or .old, names starting with ~, \
                      and anything inside a Temp folder.",
        predicate: |ctx, _| {
            ctx.has_extension(&["tmp", "temp", "bak", "old"])
                || ctx.name.starts_with('~')
                || ctx.path.contains("/temp/")
                || ctx.path.ends_with("/temp")
        },
    },
    JunkCategory {
        id: JunkCategoryId::CacheBrowser,
        label: "Browser and application caches",
        description: "Files stored under Cache, Code Cache, GPU Cache or AppData/Local/Temp folders.",
        predicate: |ctx, _| {
            ctx.path_contains_any(&[
                "cache",
                "code cache",
                "gpu cache",
                "appdata/local/temp",
                "appdata/local/cache",
            ]) || ctx.has_extension(&["cache", "tmp", "temp", "dat"])
        },
    },
    JunkCategory {
        id: JunkCategoryId::LogFiles,
        label: "Old logs and reports",
        description: "Diagnostic .log, .etl and .txt files not modified recently.",
        predicate: |ctx, config| {
            ctx.has_extension(&["log", "etl", "txt"]) && ctx.age > config.log_age_threshold
        },
    },
    JunkCategory {
        id: JunkCategoryId::InstallerResiduals,
        label: "Installer leftovers",
        description: "Update remnants (.msi, .cab, .part, .crdownload) left in Temp or Downloads.",
        predicate: |ctx, _| {
            ctx.has_extension(&["msi", "cab", "part", "crdownload"])
                && ctx.path_contains_any(&["/temp", "/download"])
        },
    },
    JunkCategory {
        id: JunkCategoryId::ThumbCache,
        label: "Thumbnail cache",
        description: "thumbs.db, desktop.ini and IconCache.db files written by file browsers.",
        predicate: |ctx, _| {
            matches!(
                ctx.name.as_str(),
                "thumbs.db" | "desktop.ini" | "iconcache.db" | "ehthumbs.db"
            )
        },
    },
    JunkCategory {
        id: JunkCategoryId::CrashDumps,
        label: "Crash reports",
        description: "Memory dumps (.dmp, .mdmp, .wer) written after a crash.",
        predicate: |ctx, _| {
            ctx.has_extension(&["dmp", "mdmp", "wer"])
                && ctx.path_contains_any(&["/temp", "crash", "reports"])
        },
    },
];

/// Configuration for junk classification.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct JunkConfig {
    /// Reference time for age calculations (default: now).
    #[builder(default = "SystemTime::now()")]
    pub reference_time: SystemTime,

    /// Logs older than this are junk.
    #[builder(default = "7 * ONE_DAY")]
    pub log_age_threshold: Duration,
}

impl Default for JunkConfig {
    fn default() -> Self {
        Self {
            reference_time: SystemTime::now(),
            log_age_threshold: 7 * ONE_DAY,
        }
    }
}

impl JunkConfig {
    /// Create a new config builder.
    pub fn builder() -> JunkConfigBuilder {
        JunkConfigBuilder::default()
    }

    /// Ids of every category the file matches.
    pub fn classify(&self, file: &FileEntry) -> BTreeSet<JunkCategoryId> {
        let context = MatchContext::new(file, self.reference_time);
        CATEGORIES
            .iter()
            .filter(|c| c.matches(&context, self))
            .map(|c| c.id)
            .collect()
    }
}

/// A file together with every category it matched.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedFile {
    #[serde(flatten)]
    pub file: FileEntry,
    pub categories: BTreeSet<JunkCategoryId>,
}

impl CategorizedFile {
    pub fn is_in(&self, id: JunkCategoryId) -> bool {
        self.categories.contains(&id)
    }
}

/// Count and size of the files in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: JunkCategoryId,
    pub label: String,
    pub description: String,
    pub count: u64,
    pub total_size: u64,
}

/// Categories picked for cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    selected: BTreeSet<JunkCategoryId>,
}

impl CategorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every category.
    pub fn all() -> Self {
        JunkCategoryId::iter().collect()
    }

    pub fn select(&mut self, id: JunkCategoryId) {
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: JunkCategoryId) {
        self.selected.remove(&id);
    }

    /// Flip one category. Returns whether it is now selected.
    pub fn toggle(&mut self, id: JunkCategoryId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn contains(&self, id: JunkCategoryId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = JunkCategoryId> + '_ {
        self.selected.iter().copied()
    }

    /// Whether any of `categories` is selected.
    pub fn intersects(&self, categories: &BTreeSet<JunkCategoryId>) -> bool {
        !self.selected.is_disjoint(categories)
    }
}

impl FromIterator<JunkCategoryId> for CategorySelection {
    fn from_iter<I: IntoIterator<Item = JunkCategoryId>>(iter: I) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

/// Results from junk classification.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JunkReport {
    /// Files matching at least one category, in discovery order.
    pub files: Vec<CategorizedFile>,
    /// One summary per category, in id order.
    pub summaries: Vec<CategorySummary>,
    /// Files looked at.
    pub files_scanned: u64,
    /// Files that could not be read.
    pub skipped: Vec<ScanWarning>,
    /// Categories that will be cleaned.
    pub selection: CategorySelection,
}

impl JunkReport {
    fn new(files: Vec<CategorizedFile>, files_scanned: u64, skipped: Vec<ScanWarning>) -> Self {
        let mut report = Self {
            files,
            files_scanned,
            skipped,
            ..Self::default()
        };
        report.update_summaries();
        report.selection = report.default_selection();
        report
    }

    fn update_summaries(&mut self) {
        self.summaries = CATEGORIES
            .iter()
            .map(|category| {
                let (count, total_size) = self
                    .files
                    .iter()
                    .filter(|f| f.is_in(category.id))
                    .fold((0, 0), |(n, size), f| (n + 1, size + f.file.size));
                CategorySummary {
                    id: category.id,
                    label: category.label.to_string(),
                    description: category.description.to_string(),
                    count,
                    total_size,
                }
            })
            .collect();
    }

    /// Every category with at least one match.
    pub fn default_selection(&self) -> CategorySelection {
        self.summaries
            .iter()
            .filter(|s| s.count > 0)
            .map(|s| s.id)
            .collect()
    }

    /// Summary for one category.
    pub fn summary(&self, id: JunkCategoryId) -> Option<&CategorySummary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    /// Size of every detected file, each counted once.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.file.size).sum()
    }

    /// Files in at least one selected category, each once.
    pub fn files_to_clean(&self) -> impl Iterator<Item = &CategorizedFile> + '_ {
        self.files
            .iter()
            .filter(|f| self.selection.intersects(&f.categories))
    }

    /// Size of [`JunkReport::files_to_clean`].
    pub fn selected_size(&self) -> u64 {
        self.files_to_clean().map(|f| f.file.size).sum()
    }

    /// Removal targets for [`JunkReport::files_to_clean`].
    pub fn deletion_targets(&self) -> Vec<DeletionTarget> {
        self.files_to_clean()
            .map(|f| {
                DeletionTarget::file(
                    &f.file.path,
                    f.file.name.clone(),
                    Arc::clone(&f.file.parent),
                    f.file.size,
                )
            })
            .collect()
    }

    /// Drop files that are gone after a deletion run and refresh summaries.
    ///
    /// Files whose removal failed stay in the report.
    pub fn apply_deletions(&mut self, outcomes: &[DeletionOutcome]) {
        let gone: HashSet<&str> = outcomes
            .iter()
            .filter(|o| o.is_gone())
            .map(|o| o.path.as_str())
            .collect();
        self.files.retain(|f| !gone.contains(f.file.path.as_str()));
        self.update_summaries();
    }
}

/// Junk classifier.
#[derive(Debug, Clone)]
pub struct JunkClassifier {
    config: JunkConfig,
    walker: TreeWalker,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl JunkClassifier {
    /// Create a classifier with default config.
    pub fn new() -> Self {
        Self::build(TreeWalker::default(), JunkConfig::default())
    }

    /// Create a classifier with custom traversal and classification config.
    pub fn with_config(scan_config: ScanConfig, config: JunkConfig) -> Result<Self, ScanError> {
        Ok(Self::build(TreeWalker::new(scan_config)?, config))
    }

    fn build(walker: TreeWalker, config: JunkConfig) -> Self {
        let progress_tx = progress_channel();
        Self {
            config,
            walker: walker.with_progress(progress_tx.clone()),
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    /// Stop classification once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.walker = self.walker.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    pub fn config(&self) -> &JunkConfig {
        &self.config
    }

    /// Classify every file below `root`.
    pub async fn scan(&self, root: Arc<dyn DirectoryHandle>) -> Result<JunkReport, ScanError> {
        let collection = self.walker.collect_files(root).await?;
        let files_scanned = collection.files.len() as u64;

        let mut progress = ProgressTracker::new(
            self.progress_tx.clone(),
            ScanPhase::Classifying,
            files_scanned,
            self.walker.config().progress_interval,
        );
        progress.start();

        let mut matched = Vec::new();
        for file in collection.files {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Interrupted);
            }

            let categories = self.config.classify(&file);
            if !categories.is_empty() {
                debug!(path = %file.path, ?categories, "junk");
                matched.push(CategorizedFile { file, categories });
            }
            progress.advance();
        }
        progress.finish();

        let report = JunkReport::new(matched, files_scanned, collection.skipped);
        info!(
            scanned = report.files_scanned,
            matched = report.files.len(),
            size = report.total_size(),
            "junk classification complete"
        );
        Ok(report)
    }
}

impl Default for JunkClassifier {
    fn default() -> Self {
        Self::new()
    }
}
