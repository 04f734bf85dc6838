//! The progress reconciliation algorithm.
//!
//! `merge` combines one incoming activity report with the previously stored
//! record for the same (user, content, course, batch) tuple and produces the
//! record to persist. It is a pure function: all IO (fetching the existing
//! record, writing the result) lives in the services layer, which makes the
//! monotonicity invariants directly testable.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::keys;
use crate::model::{
    BatchId, ContentProgressRecord, ContentStateReport, CourseId, ProgressError, ProgressStatus,
    UserId,
};
use crate::time::{InvalidTimestamp, latest_of, parse_timestamp};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Client-visible failures while interpreting an incoming report.
///
/// Either aborts the whole batch the report belongs to; nothing from a
/// half-merged batch is ever persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    #[error(transparent)]
    Status(#[from] ProgressError),
    #[error(transparent)]
    Timestamp(#[from] InvalidTimestamp),
}

//
// ─── MERGE SCOPE ───────────────────────────────────────────────────────────────
//

/// Identifies the tuple a report is merged under.
///
/// The course id comes from the resolved batch metadata, not from the report.
#[derive(Debug, Clone, Copy)]
pub struct MergeScope<'a> {
    pub user_id: &'a UserId,
    pub course_id: &'a CourseId,
    pub batch_id: &'a BatchId,
}

//
// ─── MERGE ─────────────────────────────────────────────────────────────────────
//

/// Merges an incoming report with the stored record for the same tuple.
///
/// Invariants enforced here:
/// - `status` never decreases; once `completed_count >= 1` it is pinned to
///   `Completed`.
/// - `progress` is the max of stored and incoming, forced to 100 on the merge
///   that completes the record.
/// - `view_count` increments by exactly one per merge.
/// - `completed_count` increments by exactly one per merge whose incoming
///   status is `Completed` and not below the stored status.
/// - Access and completion times follow the `latest_of` rule.
///
/// # Errors
///
/// Returns `MergeError` for an out-of-range status value or a malformed
/// timestamp literal; the caller must not persist anything for the batch.
pub fn merge(
    report: &ContentStateReport,
    scope: MergeScope<'_>,
    existing: Option<&ContentProgressRecord>,
    now: DateTime<Utc>,
) -> Result<ContentProgressRecord, MergeError> {
    let incoming_status = match report.status {
        Some(raw) => ProgressStatus::from_u8(raw)?,
        None => ProgressStatus::NotStarted,
    };
    let incoming_progress = report.progress.unwrap_or(0).min(100);
    let incoming_access = parse_timestamp(report.last_access_time.as_deref())?;
    let incoming_completed = parse_timestamp(report.last_completed_time.as_deref())?;

    let merged = match existing {
        Some(existing) => merge_existing(
            existing,
            incoming_status,
            incoming_progress,
            incoming_access,
            incoming_completed,
            now,
        ),
        None => first_report(
            report,
            scope,
            incoming_status,
            incoming_progress,
            incoming_access,
            incoming_completed,
            now,
        ),
    };
    Ok(merged)
}

fn merge_existing(
    existing: &ContentProgressRecord,
    incoming_status: ProgressStatus,
    incoming_progress: u8,
    incoming_access: Option<DateTime<Utc>>,
    incoming_completed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ContentProgressRecord {
    let mut merged = existing.clone();
    merged.view_count = existing.view_count + 1;
    merged.last_access_time = Some(latest_of(existing.last_access_time, incoming_access, now));
    merged.progress = existing.progress.max(incoming_progress);

    if incoming_status >= existing.status {
        merged.status = incoming_status;
        if incoming_status == ProgressStatus::Completed {
            merged.completed_count = existing.completed_count + 1;
            merged.progress = 100;
            merged.last_completed_time =
                Some(latest_of(existing.last_completed_time, incoming_completed, now));
        }
    }
    // A stale report can never un-complete a record.
    if merged.completed_count >= 1 {
        merged.status = ProgressStatus::Completed;
    }

    merged.last_updated_time = now;
    merged.version = existing.version + 1;
    merged
}

fn first_report(
    report: &ContentStateReport,
    scope: MergeScope<'_>,
    incoming_status: ProgressStatus,
    incoming_progress: u8,
    incoming_access: Option<DateTime<Utc>>,
    incoming_completed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ContentProgressRecord {
    let completed = incoming_status == ProgressStatus::Completed;
    ContentProgressRecord {
        id: keys::content_progress_key(
            scope.user_id,
            &report.content_id,
            scope.course_id,
            scope.batch_id,
        ),
        user_id: scope.user_id.clone(),
        content_id: report.content_id.clone(),
        course_id: scope.course_id.clone(),
        batch_id: scope.batch_id.clone(),
        status: incoming_status,
        progress: if completed { 100 } else { incoming_progress },
        view_count: 1,
        completed_count: u32::from(completed),
        last_access_time: Some(latest_of(None, incoming_access, now)),
        last_completed_time: completed.then(|| latest_of(None, incoming_completed, now)),
        last_updated_time: now,
        version: 1,
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentId;
    use crate::time::{fixed_now, format_timestamp};
    use chrono::Duration;

    fn report(status: Option<u8>, progress: Option<u8>) -> ContentStateReport {
        ContentStateReport {
            batch_id: "b1".into(),
            content_id: ContentId::new("c1"),
            status,
            progress,
            last_access_time: None,
            last_completed_time: None,
        }
    }

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn course() -> CourseId {
        CourseId::new("course1")
    }

    fn batch() -> BatchId {
        BatchId::new("b1")
    }

    fn scope<'a>(user: &'a UserId, course: &'a CourseId, batch: &'a BatchId) -> MergeScope<'a> {
        MergeScope {
            user_id: user,
            course_id: course,
            batch_id: batch,
        }
    }

    #[test]
    fn first_completed_report_initializes_all_counters() {
        let (u, c, b) = (user(), course(), batch());
        let merged = merge(
            &report(Some(2), Some(100)),
            scope(&u, &c, &b),
            None,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(merged.status, ProgressStatus::Completed);
        assert_eq!(merged.progress, 100);
        assert_eq!(merged.view_count, 1);
        assert_eq!(merged.completed_count, 1);
        assert_eq!(merged.last_access_time, Some(fixed_now()));
        assert_eq!(merged.last_completed_time, Some(fixed_now()));
        assert_eq!(merged.version, 1);
    }

    #[test]
    fn first_report_without_status_defaults_to_not_started() {
        let (u, c, b) = (user(), course(), batch());
        let merged = merge(&report(None, Some(40)), scope(&u, &c, &b), None, fixed_now()).unwrap();

        assert_eq!(merged.status, ProgressStatus::NotStarted);
        assert_eq!(merged.progress, 40);
        assert_eq!(merged.completed_count, 0);
        assert_eq!(merged.last_completed_time, None);
    }

    #[test]
    fn stale_report_never_lowers_a_completed_record() {
        let (u, c, b) = (user(), course(), batch());
        let now = fixed_now();
        let stored = merge(&report(Some(2), Some(100)), scope(&u, &c, &b), None, now).unwrap();

        let later = now + Duration::minutes(5);
        let merged = merge(
            &report(Some(1), Some(40)),
            scope(&u, &c, &b),
            Some(&stored),
            later,
        )
        .unwrap();

        assert_eq!(merged.status, ProgressStatus::Completed);
        assert_eq!(merged.progress, 100);
        assert_eq!(merged.view_count, 2);
        assert_eq!(merged.completed_count, 1);
        assert_eq!(merged.last_updated_time, later);
        assert_eq!(merged.version, 2);
    }

    #[test]
    fn repeated_completion_increments_completed_count() {
        let (u, c, b) = (user(), course(), batch());
        let now = fixed_now();
        let first = merge(&report(Some(2), None), scope(&u, &c, &b), None, now).unwrap();
        let second = merge(
            &report(Some(2), None),
            scope(&u, &c, &b),
            Some(&first),
            now + Duration::minutes(1),
        )
        .unwrap();

        assert_eq!(second.completed_count, 2);
        assert_eq!(second.view_count, 2);
    }

    #[test]
    fn view_count_after_n_merges_equals_n() {
        let (u, c, b) = (user(), course(), batch());
        let mut now = fixed_now();
        let mut stored = merge(&report(Some(1), Some(10)), scope(&u, &c, &b), None, now).unwrap();
        for _ in 0..4 {
            now += Duration::minutes(1);
            stored = merge(
                &report(Some(1), Some(10)),
                scope(&u, &c, &b),
                Some(&stored),
                now,
            )
            .unwrap();
        }
        assert_eq!(stored.view_count, 5);
        assert_eq!(stored.completed_count, 0);
        assert_eq!(stored.version, 5);
    }

    #[test]
    fn progress_is_monotonic_across_merges() {
        let (u, c, b) = (user(), course(), batch());
        let now = fixed_now();
        let stored = merge(&report(Some(1), Some(60)), scope(&u, &c, &b), None, now).unwrap();
        let merged = merge(
            &report(Some(1), Some(30)),
            scope(&u, &c, &b),
            Some(&stored),
            now + Duration::minutes(1),
        )
        .unwrap();
        assert_eq!(merged.progress, 60);
    }

    #[test]
    fn missing_status_keeps_the_existing_floor() {
        let (u, c, b) = (user(), course(), batch());
        let now = fixed_now();
        let stored = merge(&report(Some(1), Some(20)), scope(&u, &c, &b), None, now).unwrap();
        let merged = merge(
            &report(None, None),
            scope(&u, &c, &b),
            Some(&stored),
            now + Duration::minutes(1),
        )
        .unwrap();
        assert_eq!(merged.status, ProgressStatus::Started);
        assert_eq!(merged.view_count, 2);
    }

    #[test]
    fn later_access_time_wins() {
        let (u, c, b) = (user(), course(), batch());
        let now = fixed_now();
        let early = format_timestamp(now - Duration::hours(2));
        let late = format_timestamp(now - Duration::hours(1));

        let mut first = report(Some(1), None);
        first.last_access_time = Some(late.clone());
        let stored = merge(&first, scope(&u, &c, &b), None, now).unwrap();

        let mut second = report(Some(1), None);
        second.last_access_time = Some(early);
        let merged = merge(&second, scope(&u, &c, &b), Some(&stored), now).unwrap();

        assert_eq!(merged.last_access_time, Some(now - Duration::hours(1)));
    }

    #[test]
    fn malformed_timestamp_is_a_client_error() {
        let (u, c, b) = (user(), course(), batch());
        let mut bad = report(Some(1), None);
        bad.last_access_time = Some("not-a-date".into());
        let err = merge(&bad, scope(&u, &c, &b), None, fixed_now()).unwrap_err();
        assert!(matches!(err, MergeError::Timestamp(_)));
    }

    #[test]
    fn out_of_range_status_is_rejected() {
        let (u, c, b) = (user(), course(), batch());
        let err = merge(&report(Some(9), None), scope(&u, &c, &b), None, fixed_now()).unwrap_err();
        assert!(matches!(err, MergeError::Status(ProgressError::InvalidStatus(9))));
    }

    #[test]
    fn sentinel_null_timestamp_means_absent() {
        let (u, c, b) = (user(), course(), batch());
        let mut r = report(Some(1), None);
        r.last_access_time = Some("null".into());
        let merged = merge(&r, scope(&u, &c, &b), None, fixed_now()).unwrap();
        assert_eq!(merged.last_access_time, Some(fixed_now()));
    }
}
