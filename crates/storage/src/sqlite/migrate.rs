use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (content progress, batch user aggregates, course
/// enrollments, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS content_progress (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    content_id TEXT NOT NULL,
                    course_id TEXT NOT NULL,
                    batch_id TEXT NOT NULL,
                    status INTEGER NOT NULL CHECK (status BETWEEN 0 AND 2),
                    progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
                    view_count INTEGER NOT NULL CHECK (view_count >= 0),
                    completed_count INTEGER NOT NULL CHECK (completed_count >= 0),
                    last_access_time TEXT,
                    last_completed_time TEXT,
                    last_updated_time TEXT NOT NULL,
                    version INTEGER NOT NULL CHECK (version >= 1)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS batch_user_aggregates (
                    batch_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    last_read_content_id TEXT NOT NULL,
                    last_read_content_status INTEGER NOT NULL
                        CHECK (last_read_content_status BETWEEN 0 AND 2),
                    PRIMARY KEY (batch_id, user_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS course_enrollments (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    course_id TEXT NOT NULL,
                    batch_id TEXT NOT NULL,
                    course_progress INTEGER NOT NULL CHECK (course_progress >= 0),
                    leaf_node_count INTEGER CHECK (leaf_node_count >= 0),
                    status INTEGER NOT NULL CHECK (status BETWEEN 0 AND 2),
                    completed_on TEXT,
                    last_read_content_id TEXT,
                    last_read_content_status INTEGER
                        CHECK (last_read_content_status BETWEEN 0 AND 2),
                    processing_status TEXT NOT NULL,
                    date_time TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_content_progress_user_batch
                    ON content_progress (user_id, batch_id, content_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_course_enrollments_user_course
                    ON course_enrollments (user_id, course_id, batch_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
