use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::ids::{BatchId, ContentId, CourseId, UserId};
use crate::model::progress::ProgressStatus;

//
// ─── BATCH STATUS ──────────────────────────────────────────────────────────────
//

/// Enrollment state of a batch. Only `Active` batches accept progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Inactive,
    Active,
}

impl BatchStatus {
    /// Converts the index encoding (0/1) to a `BatchStatus`.
    ///
    /// Unknown values are treated as `Inactive`, matching the original
    /// system's default of 0.
    #[must_use]
    pub fn from_index_value(value: u8) -> Self {
        if value == 1 { Self::Active } else { Self::Inactive }
    }
}

//
// ─── BATCH METADATA ────────────────────────────────────────────────────────────
//

/// Metadata for one enrollment batch, read from the search index.
///
/// Owned by the enrollment-management subsystem; this engine never writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub batch_id: BatchId,
    pub course_id: CourseId,
    pub status: BatchStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl BatchMetadata {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    /// Whether `today` falls inside the batch activity window.
    ///
    /// The batch must have started on or before `today`; an absent end date
    /// leaves the window open-ended. Update classification looks at `status`
    /// alone; this check backs enrollment-side validation, which lives in
    /// another subsystem.
    #[must_use]
    pub fn is_within_window(&self, today: NaiveDate) -> bool {
        if today < self.start_date {
            return false;
        }
        match self.end_date {
            Some(end) => today <= end,
            None => true,
        }
    }
}

//
// ─── BATCH USER AGGREGATE ──────────────────────────────────────────────────────
//

/// Per-(batch, learner) pointer at the most recently accessed content.
///
/// Recomputed in full from the records merged in one request and upserted
/// over any prior value; it is never merged incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUserAggregate {
    pub batch_id: BatchId,
    pub user_id: UserId,
    pub last_read_content_id: ContentId,
    pub last_read_content_status: ProgressStatus,
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
