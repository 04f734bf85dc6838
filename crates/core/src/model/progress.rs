use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{BatchId, ContentId, CourseId, RecordId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while interpreting raw progress values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("invalid progress status value: {0}")]
    InvalidStatus(u8),
}

//
// ─── PROGRESS STATUS ───────────────────────────────────────────────────────────
//

/// Consumption state of one content unit for one learner.
///
/// The ordering is meaningful: a merge never moves a stored status to a lower
/// variant, so `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgressStatus {
    NotStarted,
    Started,
    Completed,
}

impl ProgressStatus {
    /// Converts the wire/storage encoding (0-2) to a `ProgressStatus`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStatus` if the value is not in 0-2.
    pub fn from_u8(value: u8) -> Result<Self, ProgressError> {
        match value {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::Started),
            2 => Ok(Self::Completed),
            _ => Err(ProgressError::InvalidStatus(value)),
        }
    }

    /// Maps this status to its wire/storage encoding.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Started => 1,
            Self::Completed => 2,
        }
    }
}

//
// ─── CONTENT PROGRESS RECORD ───────────────────────────────────────────────────
//

/// Persisted progress of one learner on one content unit within one batch.
///
/// Keyed by `keys::content_progress_key` over the (user, content, course,
/// batch) tuple. Created on the first report for the tuple and only ever
/// mutated through `merge::merge`; the engine never deletes it.
///
/// `version` is a write token: every merge bumps it by one, and the store
/// rejects a write whose predecessor version no longer matches, so concurrent
/// writers cannot silently clobber each other's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentProgressRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub course_id: CourseId,
    pub batch_id: BatchId,
    pub status: ProgressStatus,
    /// 0-100; forced to 100 when the record completes.
    pub progress: u8,
    /// Incremented by one on every merge.
    pub view_count: u32,
    /// Number of merges in which the record transitioned into `Completed`.
    pub completed_count: u32,
    pub last_access_time: Option<DateTime<Utc>>,
    pub last_completed_time: Option<DateTime<Utc>>,
    pub last_updated_time: DateTime<Utc>,
    pub version: u64,
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_encoding_round_trips() {
        assert_eq!(ProgressStatus::from_u8(0).unwrap(), ProgressStatus::NotStarted);
        assert_eq!(ProgressStatus::from_u8(2).unwrap(), ProgressStatus::Completed);
        assert_eq!(ProgressStatus::Started.as_u8(), 1);
    }

    #[test]
    fn status_rejects_out_of_range_values() {
        assert_eq!(
            ProgressStatus::from_u8(3).unwrap_err(),
            ProgressError::InvalidStatus(3)
        );
    }

    #[test]
    fn status_ordering_matches_lifecycle() {
        assert!(ProgressStatus::NotStarted < ProgressStatus::Started);
        assert!(ProgressStatus::Started < ProgressStatus::Completed);
    }
}
