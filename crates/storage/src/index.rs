use async_trait::async_trait;
use progress_core::model::{BatchId, BatchMetadata, CourseEnrollment, RecordId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::repository::StorageError;

/// Read/write contract of the search index collaborator.
///
/// The index itself is owned by another subsystem; this engine only issues a
/// filtered batch lookup and best-effort enrollment document saves.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Single filtered lookup for all referenced batch ids. Ids with no
    /// indexed batch are simply absent from the result, never an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query itself fails.
    async fn search_batches(&self, batch_ids: &[BatchId])
    -> Result<Vec<BatchMetadata>, StorageError>;

    /// Save the updated enrollment rollup document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the save fails; callers treat this as
    /// best-effort.
    async fn save_enrollment(&self, enrollment: &CourseEnrollment) -> Result<(), StorageError>;
}

/// In-memory search index for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemorySearchIndex {
    batches: Arc<Mutex<HashMap<BatchId, BatchMetadata>>>,
    enrollments: Arc<Mutex<HashMap<RecordId, CourseEnrollment>>>,
}

impl InMemorySearchIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a batch document, as the enrollment-management subsystem would.
    pub fn add_batch(&self, batch: BatchMetadata) {
        if let Ok(mut guard) = self.batches.lock() {
            guard.insert(batch.batch_id.clone(), batch);
        }
    }

    /// Enrollment documents saved so far, for assertions.
    #[must_use]
    pub fn saved_enrollments(&self) -> Vec<CourseEnrollment> {
        self.enrollments
            .lock()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn search_batches(
        &self,
        batch_ids: &[BatchId],
    ) -> Result<Vec<BatchMetadata>, StorageError> {
        let guard = self
            .batches
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(batch_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn save_enrollment(&self, enrollment: &CourseEnrollment) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(enrollment.id.clone(), enrollment.clone());
        Ok(())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{BatchStatus, CourseId};

    fn batch(id: &str) -> BatchMetadata {
        BatchMetadata {
            batch_id: BatchId::new(id),
            course_id: CourseId::new("course1"),
            status: BatchStatus::Active,
            start_date: "2026-01-01".parse().unwrap(),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn missing_batches_are_absent_not_errors() {
        let index = InMemorySearchIndex::new();
        index.add_batch(batch("b1"));

        let found = index
            .search_batches(&[BatchId::new("b1"), BatchId::new("b2")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].batch_id, BatchId::new("b1"));
    }
}
