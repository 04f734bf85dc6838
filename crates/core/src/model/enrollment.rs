use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BatchId, ContentId, CourseId, RecordId, UserId};
use crate::model::progress::ProgressStatus;

//
// ─── PROCESSING STATUS ─────────────────────────────────────────────────────────
//

/// Lifecycle of the asynchronous index sync for a course rollup write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    New,
    InProgress,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// Storage/wire label for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

//
// ─── COURSE ENROLLMENT ─────────────────────────────────────────────────────────
//

/// Course-level rollup of a learner's enrollment in one batch.
///
/// Keyed by `keys::enrollment_key` over the (user, course, batch) tuple. Two
/// independent pipelines write this entity: the per-request batch flow and the
/// bulk rollup trigger. They coordinate only through the stored state, so
/// every write must preserve the same invariants: `course_progress` never
/// exceeds `leaf_node_count` when known, and `completed_on` is stamped exactly
/// once, on the first transition to `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub id: RecordId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub batch_id: BatchId,
    /// Cumulative count of completed leaf contents.
    pub course_progress: u32,
    /// Total leaf contents in the course; unknown until the course is synced.
    pub leaf_node_count: Option<u32>,
    pub status: ProgressStatus,
    pub completed_on: Option<DateTime<Utc>>,
    pub last_read_content_id: Option<ContentId>,
    pub last_read_content_status: Option<ProgressStatus>,
    pub processing_status: ProcessingStatus,
    /// Time of the last rollup write.
    pub date_time: DateTime<Utc>,
}

impl CourseEnrollment {
    /// Derives the enrollment status for a given cumulative progress.
    ///
    /// An unknown or zero leaf count can never complete the course; otherwise
    /// the course completes exactly when progress reaches the leaf count.
    #[must_use]
    pub fn derive_status(leaf_node_count: Option<u32>, course_progress: u32) -> ProgressStatus {
        match leaf_node_count {
            Some(count) if count != 0 && count <= course_progress => ProgressStatus::Completed,
            _ => ProgressStatus::Started,
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
