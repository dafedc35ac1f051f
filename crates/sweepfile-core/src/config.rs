//! Traversal configuration shared by every analysis.

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Configuration for traversal.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Entry names to ignore (glob syntax, matched against the name only).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include hidden entries (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Send a progress update every this many items.
    #[builder(default = "20")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    20
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(patterns) = &self.ignore_patterns {
            for pattern in patterns {
                Glob::new(pattern)
                    .map_err(|e| format!("Invalid ignore pattern {pattern:?}: {e}"))?;
            }
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be at least 1".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Compile the ignore patterns into a matcher.
    pub fn entry_filter(&self) -> Result<EntryFilter, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
                message: format!("Invalid ignore pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| ScanError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(EntryFilter {
            ignore,
            include_hidden: self.include_hidden,
        })
    }

    /// Whether entries at `depth` may still be descended into.
    pub fn allows_depth(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            progress_interval: 20,
        }
    }
}

/// Compiled form of the name-based parts of a [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct EntryFilter {
    ignore: GlobSet,
    include_hidden: bool,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            ignore: GlobSet::empty(),
            include_hidden: true,
        }
    }
}

impl EntryFilter {
    /// Check if an entry should be left out of the walk.
    pub fn should_skip(&self, name: &str) -> bool {
        (!self.include_hidden && name.starts_with('.')) || self.ignore.is_match(name)
    }
}
