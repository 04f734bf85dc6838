use async_trait::async_trait;
use progress_core::model::{
    BatchId, BatchUserAggregate, ContentId, ContentProgressRecord, CourseEnrollment,
    ProcessingStatus, RecordId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A versioned write lost the race against a concurrent writer; the
    /// caller should re-read and re-merge.
    #[error("version conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Store of per-content progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist all merged records for one batch, or none of them.
    ///
    /// Each write is conditional on its predecessor: a record with
    /// `version == n` only lands if the stored version is `n - 1` (absent for
    /// `n == 1`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if any record's stored version moved
    /// under it; no record from the batch is persisted in that case.
    async fn batch_insert(&self, records: &[ContentProgressRecord]) -> Result<(), StorageError>;

    /// Fetch the stored records for the given content ids under one
    /// (user, batch) pair. Missing ids are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_records(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
        content_ids: &[ContentId],
    ) -> Result<Vec<ContentProgressRecord>, StorageError>;

    /// Fetch one record by its derived key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_record_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ContentProgressRecord>, StorageError>;
}

/// Store of per-(batch, learner) "last read content" aggregates.
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// Replace the aggregate for the (batch, user) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_aggregate(&self, aggregate: &BatchUserAggregate) -> Result<(), StorageError>;

    /// Fetch the aggregate for the (batch, user) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_aggregate(
        &self,
        batch_id: &BatchId,
        user_id: &UserId,
    ) -> Result<Option<BatchUserAggregate>, StorageError>;
}

/// Store of course-level enrollment rollups.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fetch one enrollment by its derived key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn get_enrollment(&self, id: &RecordId)
    -> Result<Option<CourseEnrollment>, StorageError>;

    /// Persist or update an enrollment rollup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_enrollment(&self, enrollment: &CourseEnrollment) -> Result<(), StorageError>;

    /// Partial write of just the processing status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn update_processing_status(
        &self,
        id: &RecordId,
        status: ProcessingStatus,
    ) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<RecordId, ContentProgressRecord>>>,
    aggregates: Arc<Mutex<HashMap<(BatchId, UserId), BatchUserAggregate>>>,
    enrollments: Arc<Mutex<HashMap<RecordId, CourseEnrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn batch_insert(&self, records: &[ContentProgressRecord]) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Validate every version before touching anything so a conflict
        // leaves the whole batch unwritten.
        for record in records {
            let stored_version = guard.get(&record.id).map(|r| r.version);
            if stored_version.unwrap_or(0) + 1 != record.version {
                return Err(StorageError::Conflict);
            }
        }
        for record in records {
            guard.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn get_records(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
        content_ids: &[ContentId],
    ) -> Result<Vec<ContentProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|r| {
                &r.user_id == user_id
                    && &r.batch_id == batch_id
                    && content_ids.contains(&r.content_id)
            })
            .cloned()
            .collect())
    }

    async fn get_record_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ContentProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

#[async_trait]
impl AggregateRepository for InMemoryRepository {
    async fn upsert_aggregate(&self, aggregate: &BatchUserAggregate) -> Result<(), StorageError> {
        let mut guard = self
            .aggregates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (aggregate.batch_id.clone(), aggregate.user_id.clone()),
            aggregate.clone(),
        );
        Ok(())
    }

    async fn get_aggregate(
        &self,
        batch_id: &BatchId,
        user_id: &UserId,
    ) -> Result<Option<BatchUserAggregate>, StorageError> {
        let guard = self
            .aggregates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(batch_id.clone(), user_id.clone())).cloned())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        id: &RecordId,
    ) -> Result<Option<CourseEnrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_enrollment(&self, enrollment: &CourseEnrollment) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(enrollment.id.clone(), enrollment.clone());
        Ok(())
    }

    async fn update_processing_status(
        &self,
        id: &RecordId,
        status: ProcessingStatus,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let enrollment = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        enrollment.processing_status = status;
        Ok(())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub aggregates: Arc<dyn AggregateRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo.clone()),
            aggregates: Arc::new(repo.clone()),
            enrollments: Arc::new(repo),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
