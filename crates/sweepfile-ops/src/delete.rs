//! Async deletion with progress reporting.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sweepfile_core::DeletionTarget;

use crate::progress::{OperationComplete, OperationProgress};
use crate::OPERATION_CHANNEL_SIZE;

/// Result sent through the channel during a deletion run.
#[derive(Debug, Clone)]
pub enum DeletionResult {
    /// Progress update.
    Progress(OperationProgress),
    /// The run completed.
    Complete(OperationComplete),
}

/// Start removing `targets` in a background task.
///
/// Returns a receiver for progress updates. The last message is always
/// [`DeletionResult::Complete`]. Must be called from within a Tokio runtime.
pub fn start_deletion(
    targets: Vec<DeletionTarget>,
    cancel: CancellationToken,
) -> mpsc::Receiver<DeletionResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let complete = run_deletion(targets, cancel, Some(&tx)).await;
        let _ = tx.send(DeletionResult::Complete(complete)).await;
    });

    rx
}

/// Remove `targets` in order and wait for the result.
pub async fn delete_all(
    targets: Vec<DeletionTarget>,
    cancel: CancellationToken,
) -> OperationComplete {
    run_deletion(targets, cancel, None).await
}

async fn run_deletion(
    targets: Vec<DeletionTarget>,
    cancel: CancellationToken,
    tx: Option<&mpsc::Sender<DeletionResult>>,
) -> OperationComplete {
    let bytes_total = targets.iter().map(|t| t.size).sum();
    let mut progress = OperationProgress::new(targets.len(), bytes_total);
    let mut complete = OperationComplete::default();

    for target in &targets {
        if cancel.is_cancelled() {
            complete.cancelled = true;
            break;
        }

        progress.current = Some(target.path.clone());
        if let Some(tx) = tx {
            let _ = tx.send(DeletionResult::Progress(progress.clone())).await;
        }

        let outcome = target.remove().await;
        progress.record(&outcome, target.size);
        complete.outcomes.push(outcome);
    }

    progress.current = None;
    if let Some(tx) = tx {
        let _ = tx.send(DeletionResult::Progress(progress.clone())).await;
    }

    complete.deleted = progress.deleted;
    complete.failed = progress.failed;
    complete.missing = complete.outcomes.iter().filter(|o| o.missing).count();
    complete.bytes_freed = progress.bytes_freed;

    info!(
        deleted = complete.deleted,
        failed = complete.failed,
        missing = complete.missing,
        bytes_freed = complete.bytes_freed,
        cancelled = complete.cancelled,
        "deletion complete"
    );
    complete
}
