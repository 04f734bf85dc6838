use progress_core::model::{CourseEnrollment, ProcessingStatus, RecordId};

use super::{SqliteRepository, mapping::map_enrollment_row, mapping::status_to_i64};
use crate::repository::{EnrollmentRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn get_enrollment(
        &self,
        id: &RecordId,
    ) -> Result<Option<CourseEnrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, user_id, course_id, batch_id, course_progress, leaf_node_count, status,
                completed_on, last_read_content_id, last_read_content_status, processing_status,
                date_time
            FROM course_enrollments
            WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn upsert_enrollment(&self, enrollment: &CourseEnrollment) -> Result<(), StorageError> {
        let leaf_node_count = enrollment
            .leaf_node_count
            .map(i64::from);

        sqlx::query(
            r"
            INSERT INTO course_enrollments (
                id, user_id, course_id, batch_id, course_progress, leaf_node_count, status,
                completed_on, last_read_content_id, last_read_content_status, processing_status,
                date_time
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                course_progress = excluded.course_progress,
                leaf_node_count = excluded.leaf_node_count,
                status = excluded.status,
                completed_on = excluded.completed_on,
                last_read_content_id = excluded.last_read_content_id,
                last_read_content_status = excluded.last_read_content_status,
                processing_status = excluded.processing_status,
                date_time = excluded.date_time
            ",
        )
        .bind(enrollment.id.as_str())
        .bind(enrollment.user_id.as_str())
        .bind(enrollment.course_id.as_str())
        .bind(enrollment.batch_id.as_str())
        .bind(i64::from(enrollment.course_progress))
        .bind(leaf_node_count)
        .bind(status_to_i64(enrollment.status))
        .bind(enrollment.completed_on)
        .bind(
            enrollment
                .last_read_content_id
                .as_ref()
                .map(|c| c.as_str().to_owned()),
        )
        .bind(
            enrollment
                .last_read_content_status
                .map(status_to_i64),
        )
        .bind(enrollment.processing_status.as_str())
        .bind(enrollment.date_time)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn update_processing_status(
        &self,
        id: &RecordId,
        status: ProcessingStatus,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE course_enrollments SET processing_status = ?2 WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .execute(self.pool())
        .await
        .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
