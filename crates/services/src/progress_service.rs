//! The content-state update flow.
//!
//! One request is processed end to end on the calling task: reports are
//! grouped per enrollment batch, batch metadata is resolved in one index
//! lookup, and each active batch is merged, persisted, and rolled into its
//! per-user aggregate. Batches are independent: a batch that is missing or
//! closed is classified and skipped without affecting the others, while a
//! malformed report aborts the whole request before anything from its batch
//! is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use progress_core::Clock;
use progress_core::merge::{MergeScope, merge};
use progress_core::model::{
    BatchId, BatchMetadata, BatchUserAggregate, ContentId, ContentProgressRecord,
    ContentStateReport, ContentStateRequest, UserId,
};
use storage::repository::{AggregateRepository, ProgressRepository, StorageError};

use crate::batch_resolver::BatchResolver;
use crate::error::UpdateError;
use crate::response::ContentUpdateResponse;

/// How often a batch write is retried after losing a version race.
const MAX_MERGE_ATTEMPTS: u32 = 3;

/// Reconciles incoming activity reports against stored progress state.
#[derive(Clone)]
pub struct ContentStateService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    aggregates: Arc<dyn AggregateRepository>,
    resolver: BatchResolver,
}

impl ContentStateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        aggregates: Arc<dyn AggregateRepository>,
        resolver: BatchResolver,
    ) -> Self {
        Self {
            clock,
            progress,
            aggregates,
            resolver,
        }
    }

    /// Process one batch of activity reports for a learner.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::EmptyContents` for a request without reports,
    /// a merge error for a malformed report, or a storage error if a write
    /// fails beyond the conflict-retry limit.
    pub async fn update_content_state(
        &self,
        request: &ContentStateRequest,
    ) -> Result<ContentUpdateResponse, UpdateError> {
        if request.contents.is_empty() {
            return Err(UpdateError::EmptyContents);
        }

        // BTreeMap keeps batch processing order deterministic.
        let mut by_batch: BTreeMap<BatchId, Vec<&ContentStateReport>> = BTreeMap::new();
        for report in &request.contents {
            if report.batch_id.trim().is_empty() {
                debug!(content_id = %report.content_id, "dropping report with blank batch id");
                continue;
            }
            by_batch
                .entry(BatchId::new(report.batch_id.clone()))
                .or_default()
                .push(report);
        }

        let batch_ids: Vec<BatchId> = by_batch.keys().cloned().collect();
        let batches = self.resolver.resolve(&batch_ids).await?;

        let mut response = ContentUpdateResponse::default();
        for (batch_id, reports) in &by_batch {
            match batches.get(batch_id) {
                None => response.record_missing(batch_id.clone()),
                Some(batch) if !batch.is_active() => {
                    response.record_not_ongoing(batch_id.clone());
                }
                Some(batch) => {
                    let content_ids = self
                        .process_batch(&request.user_id, batch, reports)
                        .await?;
                    response.record_success(content_ids);
                }
            }
        }
        Ok(response)
    }

    /// Merge and persist all reports for one active batch.
    ///
    /// The read-merge-write sequence is retried when the versioned write
    /// detects a concurrent update, so neither writer's counters are lost.
    async fn process_batch(
        &self,
        user_id: &UserId,
        batch: &BatchMetadata,
        reports: &[&ContentStateReport],
    ) -> Result<Vec<ContentId>, UpdateError> {
        let content_ids: Vec<ContentId> =
            reports.iter().map(|r| r.content_id.clone()).collect();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let merged = self.merge_batch(user_id, batch, reports, &content_ids).await?;

            match self.progress.batch_insert(&merged).await {
                Ok(()) => {
                    if let Some(aggregate) = latest_read_content(user_id, &batch.batch_id, &merged)
                    {
                        self.aggregates.upsert_aggregate(&aggregate).await?;
                    }
                    return Ok(content_ids);
                }
                Err(StorageError::Conflict) if attempt < MAX_MERGE_ATTEMPTS => {
                    warn!(
                        batch_id = %batch.batch_id,
                        attempt,
                        "progress write lost a version race, re-merging"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn merge_batch(
        &self,
        user_id: &UserId,
        batch: &BatchMetadata,
        reports: &[&ContentStateReport],
        content_ids: &[ContentId],
    ) -> Result<Vec<ContentProgressRecord>, UpdateError> {
        let stored = self
            .progress
            .get_records(user_id, &batch.batch_id, content_ids)
            .await?;
        let mut by_content: HashMap<ContentId, ContentProgressRecord> = stored
            .into_iter()
            .map(|r| (r.content_id.clone(), r))
            .collect();

        let scope = MergeScope {
            user_id,
            course_id: &batch.course_id,
            batch_id: &batch.batch_id,
        };
        let now = self.clock.now();

        // Sequential fold: a duplicate content id inside one request merges
        // on top of the earlier report's result, not the stale stored state.
        for report in reports {
            let merged = merge(report, scope, by_content.get(&report.content_id), now)?;
            by_content.insert(report.content_id.clone(), merged);
        }

        Ok(by_content.into_values().collect())
    }
}

/// Picks the "last read content" pointer for a batch from its merged records.
///
/// The record with the latest access time wins; records sharing the maximal
/// timestamp tie-break on the lexicographically greatest content id so the
/// choice is deterministic.
#[must_use]
pub fn latest_read_content(
    user_id: &UserId,
    batch_id: &BatchId,
    records: &[ContentProgressRecord],
) -> Option<BatchUserAggregate> {
    let last_read = records.iter().max_by(|a, b| {
        a.last_access_time
            .cmp(&b.last_access_time)
            .then_with(|| a.content_id.cmp(&b.content_id))
    })?;
    Some(BatchUserAggregate {
        batch_id: batch_id.clone(),
        user_id: user_id.clone(),
        last_read_content_id: last_read.content_id.clone(),
        last_read_content_status: last_read.status,
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
