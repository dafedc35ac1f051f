//! Progress snapshots shared by every pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which pass a progress snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    Counting,
    Enumerating,
    Pruning,
    Hashing,
    Classifying,
    Deleting,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counting => write!(f, "Counting"),
            Self::Enumerating => write!(f, "Enumerating"),
            Self::Pruning => write!(f, "Pruning"),
            Self::Hashing => write!(f, "Hashing"),
            Self::Classifying => write!(f, "Classifying"),
            Self::Deleting => write!(f, "Deleting"),
        }
    }
}

/// A `(current, total, status)` snapshot.
///
/// `current` never decreases within a pass. `total` is fixed when the pass
/// starts, or 0 when it is not known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub current: u64,
    pub total: u64,
    pub status: String,
}

impl ScanProgress {
    pub fn new(phase: ScanPhase, current: u64, total: u64, status: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            status: status.into(),
        }
    }

    /// Progress as a percentage, 0.0 when the total is unknown.
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.total > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let p = ScanProgress::new(ScanPhase::Hashing, 5, 20, "Hashing 5/20");
        assert_eq!(p.percentage(), 25.0);
        assert!(p.is_bounded());

        let p = ScanProgress::new(ScanPhase::Pruning, 7, 0, "");
        assert_eq!(p.percentage(), 0.0);
    }
}
