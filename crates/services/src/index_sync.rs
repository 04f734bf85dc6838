//! Bounded background queue for syncing enrollment rollups into the index.
//!
//! The rollup path treats index sync as best-effort: a full or closed queue
//! and a failed save are logged, never surfaced, and never roll back the
//! primary storage write.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use progress_core::model::CourseEnrollment;
use storage::index::SearchIndex;

/// Default capacity of the sync queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Owns the queue worker. Cheap `IndexSyncHandle`s are handed to producers.
pub struct IndexSyncQueue {
    tx: mpsc::Sender<CourseEnrollment>,
    worker: JoinHandle<()>,
}

impl IndexSyncQueue {
    /// Spawn the worker task draining the queue into the search index.
    #[must_use]
    pub fn start(index: Arc<dyn SearchIndex>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<CourseEnrollment>(capacity);
        let worker = tokio::spawn(async move {
            while let Some(enrollment) = rx.recv().await {
                if let Err(err) = index.save_enrollment(&enrollment).await {
                    error!(
                        enrollment_id = %enrollment.id,
                        %err,
                        "enrollment index sync failed"
                    );
                }
            }
        });
        Self { tx, worker }
    }

    #[must_use]
    pub fn handle(&self) -> IndexSyncHandle {
        IndexSyncHandle {
            tx: self.tx.clone(),
        }
    }

    /// Close the queue and wait until every accepted document is processed.
    ///
    /// Outstanding `IndexSyncHandle` clones keep the queue open; drop them
    /// first. Used by shutdown paths and tests that assert delivery.
    pub async fn close_and_wait(self) {
        drop(self.tx);
        if let Err(err) = self.worker.await {
            error!(%err, "index sync worker did not shut down cleanly");
        }
    }
}

/// Producer side of the index-sync queue.
#[derive(Clone)]
pub struct IndexSyncHandle {
    tx: mpsc::Sender<CourseEnrollment>,
}

impl IndexSyncHandle {
    /// Enqueue an enrollment document without blocking the caller.
    ///
    /// A full or closed queue drops the document; the primary write has
    /// already succeeded, so the next rollup for the enrollment re-syncs it.
    pub fn enqueue(&self, enrollment: CourseEnrollment) {
        match self.tx.try_send(enrollment) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(enrollment)) => {
                warn!(
                    enrollment_id = %enrollment.id,
                    "index sync queue full, dropping enrollment document"
                );
            }
            Err(mpsc::error::TrySendError::Closed(enrollment)) => {
                warn!(
                    enrollment_id = %enrollment.id,
                    "index sync queue closed, dropping enrollment document"
                );
            }
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
