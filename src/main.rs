//! sweepfile - Find and remove empty folders, duplicate files and junk.
//!
//! Usage:
//!   sweep prune [PATH]        Remove empty folders
//!   sweep duplicates [PATH]   Find duplicate files
//!   sweep junk [PATH]         Find temporary, cache and log junk
//!   sweep --help              Show help

mod logging;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Context, Result};
use itertools::Itertools;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sweepfile_analyze::{
    DuplicateConfig, DuplicateFinder, DuplicateReport, EmptyFolderPruner, FileTypeFilter,
    JunkCategoryId, JunkClassifier, JunkConfig, JunkReport, PruneConfig, PruneReport,
};
use sweepfile_core::{DeletionTarget, DirectoryHandle, ScanConfig, ScanProgress};
use sweepfile_ops::{start_deletion, DeletionResult, OperationComplete};
use sweepfile_scan::LocalDirectory;

#[derive(Parser)]
#[command(
    name = "sweep",
    version,
    about = "Find and remove empty folders, duplicate files and junk",
    long_about = "sweep walks a directory tree and cleans it up.\n\n\
                  `prune` removes folders that hold no files, `duplicates` groups \
                  files by content, and `junk` sorts temporary, cache, log and \
                  crash files into categories. Nothing is deleted by `duplicates` \
                  or `junk` unless asked for."
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Skip entries whose name matches this glob (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN", global = true)]
    ignore: Vec<String>,

    /// Include hidden entries (default)
    #[arg(long, global = true, overrides_with = "no_hidden")]
    hidden: bool,

    /// Skip hidden entries
    #[arg(long, global = true)]
    no_hidden: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

impl CommonArgs {
    fn scan_config(&self) -> Result<ScanConfig> {
        ScanConfig::builder()
            .ignore_patterns(self.ignore.clone())
            .include_hidden(self.hidden || !self.no_hidden)
            .build()
            .wrap_err("Invalid scan options")
    }
}

#[derive(Subcommand)]
enum Command {
    /// Remove folders that contain no files
    Prune {
        /// Path to clean
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,

        /// Count folders first for accurate progress
        #[arg(long)]
        precount: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find duplicate files
    Duplicates {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// File types to compare (all, images, videos, documents, others)
        #[arg(short = 't', long = "type", default_value = "all", value_parser = parse_file_type)]
        file_type: FileTypeFilter,

        /// Minimum file size to consider (e.g., "1KB", "1MB")
        #[arg(short, long, default_value = "0")]
        min_size: String,

        /// Maximum number of duplicate groups to show (0 = all)
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Delete every copy except the first of each group
        #[arg(long)]
        delete_extras: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find junk files by category
    Junk {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Category to clean (repeatable; defaults to every matched category)
        #[arg(short, long = "category", value_name = "ID", value_parser = parse_category)]
        categories: Vec<JunkCategoryId>,

        /// Logs older than this are junk (e.g., "7d", "2w")
        #[arg(long, default_value = "7d")]
        log_age: String,

        /// Delete the files in the selected categories
        #[arg(long)]
        clean: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.common.verbose);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let scan_config = cli.common.scan_config()?;

    match cli.command {
        Command::Prune {
            path,
            dry_run,
            precount,
            format,
        } => {
            let config = PruneConfig::builder()
                .dry_run(dry_run)
                .precount(precount)
                .build()?;
            run_prune(&path, scan_config, config, cancel, format).await?;
        }
        Command::Duplicates {
            path,
            file_type,
            min_size,
            top,
            delete_extras,
            format,
        } => {
            let config = DuplicateConfig::builder()
                .file_type(file_type)
                .min_size(parse_size(&min_size)?)
                .max_groups(top)
                .build()?;
            run_duplicates(&path, scan_config, config, delete_extras, cancel, format).await?;
        }
        Command::Junk {
            path,
            categories,
            log_age,
            clean,
            format,
        } => {
            let config = JunkConfig::builder()
                .log_age_threshold(parse_duration(&log_age)?)
                .build()?;
            run_junk(&path, scan_config, config, categories, clean, cancel, format).await?;
        }
    }

    Ok(())
}

/// Remove empty folders.
async fn run_prune(
    path: &Path,
    scan_config: ScanConfig,
    config: PruneConfig,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let root = open_root(path).await?;
    let dry_run = config.dry_run;

    eprintln!("Pruning {}...", path.display());

    let pruner = EmptyFolderPruner::new(scan_config, config)?.with_cancellation(cancel);
    let progress = ProgressDisplay::spawn(pruner.subscribe());
    let report = pruner.prune(root).await.wrap_err("Pruning failed");
    drop(pruner);
    progress.finish().await;
    let report = report?;

    match format {
        OutputFormat::Text => print_prune_report(&report, dry_run),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_prune_report(report: &PruneReport, dry_run: bool) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Empty Folder Report");
    println!("{}", "─".repeat(70));
    println!();

    if dry_run {
        if report.planned.is_empty() {
            println!(" No empty folders found.");
        } else {
            println!(" Would remove {} folders:", report.planned.len());
            for path in &report.planned {
                println!("   {path}");
            }
        }
    } else if report.outcomes.is_empty() {
        println!(" No empty folders found.");
    } else {
        println!(
            " Removed {} folders, {} failed",
            report.deleted_count(),
            report.failed_count()
        );
        for outcome in &report.outcomes {
            match &outcome.reason {
                None => println!("   removed  {}", outcome.path),
                Some(reason) => println!("   failed   {} ({reason})", outcome.path),
            }
        }
    }

    print_warnings(report.warnings.len());
    if report.interrupted {
        println!();
        println!(" Interrupted before the whole tree was checked.");
    }
    println!();
}

/// Run duplicate detection.
async fn run_duplicates(
    path: &Path,
    scan_config: ScanConfig,
    config: DuplicateConfig,
    delete_extras: bool,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let root = open_root(path).await?;

    eprintln!("Finding duplicates in {}...", path.display());

    let finder =
        DuplicateFinder::with_config(scan_config, config)?.with_cancellation(cancel.clone());
    let progress = ProgressDisplay::spawn(finder.subscribe());
    let report = finder.find_duplicates(root).await.wrap_err("Duplicate detection failed");
    drop(finder);
    progress.finish().await;
    let mut report = report?;

    let deletion = if delete_extras {
        let selection = report.select_all_but_first();
        let complete = delete_targets(report.deletion_targets(&selection), cancel).await?;
        report.apply_deletions(&complete.outcomes);
        Some(complete)
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            print_duplicate_report(&report);
            if let Some(complete) = &deletion {
                print_deletion(complete);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({ "report": report, "deletion": deletion });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_duplicate_report(report: &DuplicateReport) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Duplicate File Report");
    println!("{}", "─".repeat(70));
    println!();

    if !report.has_duplicates() {
        println!(" No duplicate files found.");
    } else {
        println!(
            " Found {} duplicate groups ({} files)",
            report.group_count, report.files_with_duplicates
        );
        println!(
            " Total wasted space: {}",
            format_size(report.total_wasted_space)
        );
        println!();

        for (i, group) in report.groups.iter().enumerate() {
            println!(
                " Group {} ({} files, {} each, {} wasted)",
                i + 1,
                group.count(),
                format_size(group.size),
                format_size(group.wasted_bytes)
            );
            for (j, file) in group.files.iter().enumerate() {
                let marker = if j == 0 { "*" } else { " " };
                println!("  {marker} {}", file.path);
            }
            println!();
        }
    }

    print_warnings(report.skipped.len());
}

/// Run junk classification.
async fn run_junk(
    path: &Path,
    scan_config: ScanConfig,
    config: JunkConfig,
    categories: Vec<JunkCategoryId>,
    clean: bool,
    cancel: CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let root = open_root(path).await?;

    eprintln!("Looking for junk in {}...", path.display());

    let classifier =
        JunkClassifier::with_config(scan_config, config)?.with_cancellation(cancel.clone());
    let progress = ProgressDisplay::spawn(classifier.subscribe());
    let report = classifier.scan(root).await.wrap_err("Junk scan failed");
    drop(classifier);
    progress.finish().await;
    let mut report = report?;

    if !categories.is_empty() {
        report.selection = categories.into_iter().collect();
    }

    let deletion = if clean {
        let complete = delete_targets(report.deletion_targets(), cancel).await?;
        report.apply_deletions(&complete.outcomes);
        Some(complete)
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            print_junk_report(&report);
            if let Some(complete) = &deletion {
                print_deletion(complete);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({ "report": report, "deletion": deletion });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_junk_report(report: &JunkReport) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Junk File Report");
    println!("{}", "─".repeat(70));
    println!();

    for summary in &report.summaries {
        let marker = if report.selection.contains(summary.id) {
            "[x]"
        } else {
            "[ ]"
        };
        println!(
            " {marker} {:<32} {:>8} files {:>12}",
            summary.label,
            summary.count,
            format_size(summary.total_size)
        );
    }
    println!();
    println!(
        " {} files scanned, {} detected ({}), {} selected",
        report.files_scanned,
        report.files.len(),
        format_size(report.total_size()),
        format_size(report.selected_size())
    );

    if !report.files.is_empty() {
        println!();
        for file in report.files_to_clean() {
            let modified: DateTime<Local> = file.file.modified.into();
            println!(
                "   {}  {:>10}  {}  [{}]",
                modified.format("%Y-%m-%d"),
                format_size(file.file.size),
                file.file.path,
                file.categories.iter().join(", ")
            );
        }
    }

    print_warnings(report.skipped.len());
    println!();
}

/// Delete targets in the background, showing progress, and wait for the result.
async fn delete_targets(
    targets: Vec<DeletionTarget>,
    cancel: CancellationToken,
) -> Result<OperationComplete> {
    let show = std::io::stderr().is_terminal();
    let mut rx = start_deletion(targets, cancel);

    while let Some(result) = rx.recv().await {
        match result {
            DeletionResult::Progress(progress) => {
                if show {
                    eprint!(
                        "\r\x1b[2KDeleting {}/{} ({:.0}%, {} freed)",
                        progress.items_completed,
                        progress.items_total,
                        progress.percentage(),
                        format_size(progress.bytes_freed)
                    );
                }
            }
            DeletionResult::Complete(complete) => {
                if show {
                    eprint!("\r\x1b[2K");
                }
                return Ok(complete);
            }
        }
    }

    Err(eyre!("Deletion task ended without a result"))
}

fn print_deletion(complete: &OperationComplete) {
    println!(
        " {} (freed {})",
        complete.summary(),
        format_size(complete.bytes_freed)
    );
    for failure in complete.failures() {
        println!(
            "   failed {} ({})",
            failure.path,
            failure.reason.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
}

fn print_warnings(count: usize) {
    if count > 0 {
        println!();
        println!(" {count} entries could not be read (run with -v for details)");
    }
}

async fn open_root(path: &Path) -> Result<Arc<dyn DirectoryHandle>> {
    debug!(path = %path.display(), "opening root");
    let root = LocalDirectory::open(path)
        .await
        .wrap_err_with(|| format!("Invalid path: {}", path.display()))?;
    Ok(Arc::new(root))
}

/// Prints progress snapshots on one terminal line while a pass runs.
struct ProgressDisplay {
    handle: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    fn spawn(mut rx: broadcast::Receiver<ScanProgress>) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self { handle: None };
        }

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(progress) if progress.is_bounded() => {
                        eprint!("\r\x1b[2K{} ({:.0}%)", progress.status, progress.percentage())
                    }
                    Ok(progress) => eprint!("\r\x1b[2K{}", progress.status),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            eprint!("\r\x1b[2K");
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the display to drain. The sender must be dropped first.
    async fn finish(self) {
        if let Some(handle) = self.handle {
            let _ = handle.await;
        }
    }
}

fn parse_file_type(s: &str) -> Result<FileTypeFilter, String> {
    s.parse()
        .map_err(|_| format!("unknown file type {s:?} (all, images, videos, documents, others)"))
}

fn parse_category(s: &str) -> Result<JunkCategoryId, String> {
    s.parse().map_err(|_| {
        let known = sweepfile_analyze::CATEGORIES.iter().map(|c| c.id).join(", ");
        format!("unknown category {s:?} ({known})")
    })
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => return Err(eyre!("Unknown size unit {other:?}")),
    };
    let number: f64 = number
        .parse()
        .wrap_err_with(|| format!("Invalid size {s:?}"))?;

    Ok((number * multiplier as f64) as u64)
}

/// Parse a duration string (e.g., "30d", "2w", "12h"). Bare numbers are days.
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (number, seconds) = match s.chars().last() {
        Some('w') => (&s[..s.len() - 1], 7.0 * 24.0 * 60.0 * 60.0),
        Some('d') => (&s[..s.len() - 1], 24.0 * 60.0 * 60.0),
        Some('h') => (&s[..s.len() - 1], 60.0 * 60.0),
        _ => (s.as_str(), 24.0 * 60.0 * 60.0),
    };
    let number: f64 = number
        .parse()
        .wrap_err_with(|| format!("Invalid duration {s:?}"))?;

    Duration::try_from_secs_f64(number * seconds)
        .wrap_err_with(|| format!("Invalid duration {s:?}"))
}
