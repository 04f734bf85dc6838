//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::merge::MergeError;
use storage::repository::StorageError;

/// Errors emitted by `ContentStateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpdateError {
    /// The request carried no content reports at all.
    #[error("contents are required for a batch status update")]
    EmptyContents,
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UpdateError {
    /// Stable error code surfaced to clients.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyContents => "emptyContentsForUpdateBatchStatus",
            Self::Merge(MergeError::Timestamp(_)) => "invalidDateFormat",
            Self::Merge(_) => "invalidRequestData",
            Self::Storage(_) => "internalError",
        }
    }

    /// Whether the caller, not the system, is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// Errors emitted while rolling one enrollment record up.
///
/// These never escape `CourseRollupService::apply_progress_deltas`; they are
/// logged per record so one failure cannot stop the rest of the rollup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RollupError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::time::InvalidTimestamp;

    #[test]
    fn empty_contents_uses_the_stable_code() {
        let err = UpdateError::EmptyContents;
        assert_eq!(err.error_code(), "emptyContentsForUpdateBatchStatus");
        assert!(err.is_client_error());
    }

    #[test]
    fn malformed_timestamp_maps_to_invalid_date_format() {
        let err = UpdateError::Merge(MergeError::Timestamp(InvalidTimestamp {
            literal: "not-a-date".into(),
        }));
        assert_eq!(err.error_code(), "invalidDateFormat");
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_failures_are_not_client_errors() {
        let err = UpdateError::Storage(StorageError::NotFound);
        assert!(!err.is_client_error());
    }
}
