//! The course-level rollup flow.
//!
//! Driven by a bulk-update trigger that supplies per-content progress deltas,
//! independently of the per-request batch flow; the two pipelines coordinate
//! only through the stored `CourseEnrollment` state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use progress_core::Clock;
use progress_core::model::{
    ContentId, CourseEnrollment, ProcessingStatus, ProgressStatus, RecordId,
};
use storage::repository::EnrollmentRepository;

use crate::error::RollupError;
use crate::index_sync::IndexSyncHandle;

/// One enrollment record's share of a bulk progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgressDelta {
    /// Derived key of the `CourseEnrollment` to roll up.
    pub enrollment_id: RecordId,
    /// Count of contents newly completed in this update.
    pub progress: u32,
    /// Content whose consumption triggered this delta.
    pub content_id: ContentId,
    /// Derived key of that content's progress record, used to look up its
    /// resulting status in the side mapping.
    pub content_key: RecordId,
}

/// Rolls per-content progress deltas up into course enrollment records.
#[derive(Clone)]
pub struct CourseRollupService {
    clock: Clock,
    enrollments: Arc<dyn EnrollmentRepository>,
    index_sync: IndexSyncHandle,
}

impl CourseRollupService {
    #[must_use]
    pub fn new(
        clock: Clock,
        enrollments: Arc<dyn EnrollmentRepository>,
        index_sync: IndexSyncHandle,
    ) -> Self {
        Self {
            clock,
            enrollments,
            index_sync,
        }
    }

    /// Apply a bulk progress update, one enrollment record at a time.
    ///
    /// Failures are isolated per record: an error is logged and the
    /// remaining records still roll up. Nothing is retried or rolled back.
    pub async fn apply_progress_deltas(
        &self,
        deltas: &[CourseProgressDelta],
        content_states: &HashMap<RecordId, ProgressStatus>,
    ) {
        for delta in deltas {
            if let Err(err) = self.apply_one(delta, content_states).await {
                error!(
                    enrollment_id = %delta.enrollment_id,
                    %err,
                    "course rollup failed for enrollment record"
                );
            }
        }
    }

    async fn apply_one(
        &self,
        delta: &CourseProgressDelta,
        content_states: &HashMap<RecordId, ProgressStatus>,
    ) -> Result<(), RollupError> {
        let Some(existing) = self.enrollments.get_enrollment(&delta.enrollment_id).await? else {
            warn!(
                enrollment_id = %delta.enrollment_id,
                "no enrollment record for rollup, skipping"
            );
            return Ok(());
        };

        let now = self.clock.now();
        let mut course_progress = existing.course_progress + delta.progress;
        if let Some(leaf_count) = existing.leaf_node_count {
            course_progress = course_progress.min(leaf_count);
        }
        let status = CourseEnrollment::derive_status(existing.leaf_node_count, course_progress);

        let mut updated = existing.clone();
        updated.course_progress = course_progress;
        updated.status = status;
        if status == ProgressStatus::Completed && existing.status != ProgressStatus::Completed {
            updated.completed_on = Some(now);
        }
        updated.last_read_content_id = Some(delta.content_id.clone());
        updated.last_read_content_status = content_states.get(&delta.content_key).copied();
        updated.processing_status = ProcessingStatus::Completed;
        updated.date_time = now;

        self.enrollments.upsert_enrollment(&updated).await?;
        self.enrollments
            .update_processing_status(&updated.id, ProcessingStatus::Completed)
            .await?;
        info!(enrollment_id = %updated.id, "enrollment rollup persisted");

        // Best-effort: the primary write stands whether or not this lands.
        self.index_sync.enqueue(updated);
        Ok(())
    }
}
