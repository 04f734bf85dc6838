use progress_core::model::{BatchId, ContentId, ContentProgressRecord, RecordId, UserId};
use sqlx::Row;

use super::{SqliteRepository, mapping::map_progress_row, mapping::status_to_i64};
use crate::repository::{ProgressRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn version_to_i64(version: u64) -> Result<i64, StorageError> {
    i64::try_from(version).map_err(|_| StorageError::Serialization("version overflow".into()))
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn batch_insert(&self, records: &[ContentProgressRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        // One transaction per batch so a version conflict rolls the whole
        // batch back.
        let mut tx = self.pool().begin().await.map_err(conn)?;

        for record in records {
            let stored_version: Option<i64> =
                sqlx::query("SELECT version FROM content_progress WHERE id = ?1")
                    .bind(record.id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(conn)?
                    .map(|row| row.try_get("version"))
                    .transpose()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;

            let expected = version_to_i64(record.version)? - 1;
            match stored_version {
                None if expected == 0 => {
                    sqlx::query(
                        r"
                        INSERT INTO content_progress (
                            id, user_id, content_id, course_id, batch_id, status, progress,
                            view_count, completed_count, last_access_time, last_completed_time,
                            last_updated_time, version
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                        ",
                    )
                    .bind(record.id.as_str())
                    .bind(record.user_id.as_str())
                    .bind(record.content_id.as_str())
                    .bind(record.course_id.as_str())
                    .bind(record.batch_id.as_str())
                    .bind(status_to_i64(record.status))
                    .bind(i64::from(record.progress))
                    .bind(i64::from(record.view_count))
                    .bind(i64::from(record.completed_count))
                    .bind(record.last_access_time)
                    .bind(record.last_completed_time)
                    .bind(record.last_updated_time)
                    .bind(version_to_i64(record.version)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
                Some(stored) if stored == expected => {
                    let result = sqlx::query(
                        r"
                        UPDATE content_progress SET
                            status = ?2,
                            progress = ?3,
                            view_count = ?4,
                            completed_count = ?5,
                            last_access_time = ?6,
                            last_completed_time = ?7,
                            last_updated_time = ?8,
                            version = ?9
                        WHERE id = ?1 AND version = ?10
                        ",
                    )
                    .bind(record.id.as_str())
                    .bind(status_to_i64(record.status))
                    .bind(i64::from(record.progress))
                    .bind(i64::from(record.view_count))
                    .bind(i64::from(record.completed_count))
                    .bind(record.last_access_time)
                    .bind(record.last_completed_time)
                    .bind(record.last_updated_time)
                    .bind(version_to_i64(record.version)?)
                    .bind(expected)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                    if result.rows_affected() != 1 {
                        return Err(StorageError::Conflict);
                    }
                }
                // Stored version moved (or the row vanished) since the read.
                _ => return Err(StorageError::Conflict),
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_records(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
        content_ids: &[ContentId],
    ) -> Result<Vec<ContentProgressRecord>, StorageError> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT
                id, user_id, content_id, course_id, batch_id, status, progress, view_count,
                completed_count, last_access_time, last_completed_time, last_updated_time, version
            FROM content_progress
            WHERE user_id = ?1 AND batch_id = ?2 AND content_id IN (
            ",
        );
        for i in 0..content_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 3).to_string());
        }
        sql.push_str(")\n");

        let mut q = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(batch_id.as_str());
        for id in content_ids {
            q = q.bind(id.as_str());
        }

        let rows = q.fetch_all(self.pool()).await.map_err(conn)?;
        rows.iter().map(map_progress_row).collect()
    }

    async fn get_record_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ContentProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, user_id, content_id, course_id, batch_id, status, progress, view_count,
                completed_count, last_access_time, last_completed_time, last_updated_time, version
            FROM content_progress
            WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }
}
