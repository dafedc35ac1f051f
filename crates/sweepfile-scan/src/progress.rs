//! Progress reporting over a broadcast channel.

use tokio::sync::broadcast;

use sweepfile_core::{ScanPhase, ScanProgress};

/// Default channel capacity for progress updates.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;

/// Create a progress channel sender with the default capacity.
pub fn progress_channel() -> broadcast::Sender<ScanProgress> {
    let (tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
    tx
}

/// Counts items within one pass and sends coarse-grained updates.
///
/// An update goes out every `interval` items and for the last item when the
/// total is known. Sending never fails the pass: with no subscribers the
/// update is simply dropped.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: broadcast::Sender<ScanProgress>,
    phase: ScanPhase,
    current: u64,
    total: u64,
    interval: u64,
    last_sent: Option<u64>,
}

impl ProgressTracker {
    pub fn new(
        tx: broadcast::Sender<ScanProgress>,
        phase: ScanPhase,
        total: u64,
        interval: u64,
    ) -> Self {
        Self {
            tx,
            phase,
            current: 0,
            total,
            interval: interval.max(1),
            last_sent: None,
        }
    }

    /// Announce the start of the pass.
    pub fn start(&mut self) {
        self.send();
    }

    /// Record one processed item.
    pub fn advance(&mut self) {
        self.current += 1;
        if self.current % self.interval == 0 || self.current == self.total {
            self.send();
        }
    }

    /// Send the final count if it has not gone out yet.
    pub fn finish(&mut self) {
        if self.last_sent != Some(self.current) {
            self.send();
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn snapshot(&self) -> ScanProgress {
        let status = if self.total > 0 {
            format!("{} {}/{}", self.phase, self.current, self.total)
        } else {
            format!("{} {}", self.phase, self.current)
        };
        ScanProgress::new(self.phase, self.current, self.total, status)
    }

    fn send(&mut self) {
        let _ = self.tx.send(self.snapshot());
        self.last_sent = Some(self.current);
    }
}
