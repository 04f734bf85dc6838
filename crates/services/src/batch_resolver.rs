use std::collections::HashMap;
use std::sync::Arc;

use progress_core::model::{BatchId, BatchMetadata};
use storage::index::SearchIndex;
use storage::repository::StorageError;

/// Resolves enrollment-batch metadata from the search index.
#[derive(Clone)]
pub struct BatchResolver {
    index: Arc<dyn SearchIndex>,
}

impl BatchResolver {
    #[must_use]
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Fetch metadata for all referenced batch ids in one filtered lookup.
    ///
    /// Ids without an indexed batch are simply absent from the map; the
    /// caller classifies them, they are never an error here.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the index query fails.
    pub async fn resolve(
        &self,
        batch_ids: &[BatchId],
    ) -> Result<HashMap<BatchId, BatchMetadata>, StorageError> {
        let batches = self.index.search_batches(batch_ids).await?;
        Ok(batches
            .into_iter()
            .map(|b| (b.batch_id.clone(), b))
            .collect())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{BatchStatus, CourseId};
    use storage::index::InMemorySearchIndex;

    fn batch(id: &str, status: BatchStatus) -> BatchMetadata {
        BatchMetadata {
            batch_id: BatchId::new(id),
            course_id: CourseId::new("course1"),
            status,
            start_date: "2026-01-01".parse().unwrap(),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn resolves_known_ids_and_skips_unknown_ones() {
        let index = InMemorySearchIndex::new();
        index.add_batch(batch("b1", BatchStatus::Active));
        index.add_batch(batch("b2", BatchStatus::Inactive));
        let resolver = BatchResolver::new(Arc::new(index));

        let resolved = resolver
            .resolve(&[BatchId::new("b1"), BatchId::new("b2"), BatchId::new("b3")])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved[&BatchId::new("b1")].is_active());
        assert!(!resolved[&BatchId::new("b2")].is_active());
        assert!(!resolved.contains_key(&BatchId::new("b3")));
    }
}
