use progress_core::model::{
    BatchId, BatchUserAggregate, ContentId, ContentProgressRecord, CourseEnrollment, CourseId,
    ProcessingStatus, ProgressStatus, RecordId, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn status_to_i64(status: ProgressStatus) -> i64 {
    i64::from(status.as_u8())
}

pub(crate) fn status_from_i64(value: i64) -> Result<ProgressStatus, StorageError> {
    let raw = u8::try_from(value)
        .map_err(|_| StorageError::Serialization(format!("invalid status: {value}")))?;
    ProgressStatus::from_u8(raw).map_err(ser)
}

pub(crate) fn processing_status_from_str(s: &str) -> Result<ProcessingStatus, StorageError> {
    match s {
        "NEW" => Ok(ProcessingStatus::New),
        "IN_PROGRESS" => Ok(ProcessingStatus::InProgress),
        "COMPLETED" => Ok(ProcessingStatus::Completed),
        "FAILED" => Ok(ProcessingStatus::Failed),
        _ => Err(StorageError::Serialization(format!(
            "invalid processing status: {s}"
        ))),
    }
}

fn count_from_i64(field: &'static str, value: i64) -> Result<u32, StorageError> {
    u32::try_from(value).map_err(|_| StorageError::Serialization(format!("invalid {field}: {value}")))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ContentProgressRecord, StorageError> {
    let progress_i64: i64 = row.try_get("progress").map_err(ser)?;
    let progress = u8::try_from(progress_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid progress: {progress_i64}")))?;
    let version_i64: i64 = row.try_get("version").map_err(ser)?;
    let version = u64::try_from(version_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid version: {version_i64}")))?;

    Ok(ContentProgressRecord {
        id: RecordId::new(row.try_get::<String, _>("id").map_err(ser)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        content_id: ContentId::new(row.try_get::<String, _>("content_id").map_err(ser)?),
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        batch_id: BatchId::new(row.try_get::<String, _>("batch_id").map_err(ser)?),
        status: status_from_i64(row.try_get::<i64, _>("status").map_err(ser)?)?,
        progress,
        view_count: count_from_i64("view_count", row.try_get("view_count").map_err(ser)?)?,
        completed_count: count_from_i64(
            "completed_count",
            row.try_get("completed_count").map_err(ser)?,
        )?,
        last_access_time: row.try_get("last_access_time").map_err(ser)?,
        last_completed_time: row.try_get("last_completed_time").map_err(ser)?,
        last_updated_time: row.try_get("last_updated_time").map_err(ser)?,
        version,
    })
}

pub(crate) fn map_aggregate_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<BatchUserAggregate, StorageError> {
    Ok(BatchUserAggregate {
        batch_id: BatchId::new(row.try_get::<String, _>("batch_id").map_err(ser)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        last_read_content_id: ContentId::new(
            row.try_get::<String, _>("last_read_content_id").map_err(ser)?,
        ),
        last_read_content_status: status_from_i64(
            row.try_get::<i64, _>("last_read_content_status").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_enrollment_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CourseEnrollment, StorageError> {
    let course_progress = count_from_i64(
        "course_progress",
        row.try_get("course_progress").map_err(ser)?,
    )?;
    let leaf_node_count = row
        .try_get::<Option<i64>, _>("leaf_node_count")
        .map_err(ser)?
        .map(|v| count_from_i64("leaf_node_count", v))
        .transpose()?;
    let last_read_content_status = row
        .try_get::<Option<i64>, _>("last_read_content_status")
        .map_err(ser)?
        .map(status_from_i64)
        .transpose()?;
    let processing_status_str: String = row.try_get("processing_status").map_err(ser)?;

    Ok(CourseEnrollment {
        id: RecordId::new(row.try_get::<String, _>("id").map_err(ser)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        batch_id: BatchId::new(row.try_get::<String, _>("batch_id").map_err(ser)?),
        course_progress,
        leaf_node_count,
        status: status_from_i64(row.try_get::<i64, _>("status").map_err(ser)?)?,
        completed_on: row.try_get("completed_on").map_err(ser)?,
        last_read_content_id: row
            .try_get::<Option<String>, _>("last_read_content_id")
            .map_err(ser)?
            .map(ContentId::new),
        last_read_content_status,
        processing_status: processing_status_from_str(&processing_status_str)?,
        date_time: row.try_get("date_time").map_err(ser)?,
    })
}
