use progress_core::model::{BatchId, BatchUserAggregate, UserId};

use super::{SqliteRepository, mapping::map_aggregate_row, mapping::status_to_i64};
use crate::repository::{AggregateRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl AggregateRepository for SqliteRepository {
    async fn upsert_aggregate(&self, aggregate: &BatchUserAggregate) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO batch_user_aggregates (
                batch_id, user_id, last_read_content_id, last_read_content_status
            )
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(batch_id, user_id) DO UPDATE SET
                last_read_content_id = excluded.last_read_content_id,
                last_read_content_status = excluded.last_read_content_status
            ",
        )
        .bind(aggregate.batch_id.as_str())
        .bind(aggregate.user_id.as_str())
        .bind(aggregate.last_read_content_id.as_str())
        .bind(status_to_i64(aggregate.last_read_content_status))
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_aggregate(
        &self,
        batch_id: &BatchId,
        user_id: &UserId,
    ) -> Result<Option<BatchUserAggregate>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT batch_id, user_id, last_read_content_id, last_read_content_status
            FROM batch_user_aggregates
            WHERE batch_id = ?1 AND user_id = ?2
            ",
        )
        .bind(batch_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        row.as_ref().map(map_aggregate_row).transpose()
    }
}
