use serde::{Deserialize, Serialize};

use progress_core::model::{BatchId, ContentId};

/// Classified outcome of a content-state update request.
///
/// Every enrollment-batch id referenced by the request lands in exactly one
/// bucket: its content ids under `SUCCESS_CONTENTS` when the batch was found
/// and active, or the batch id itself under one of the failure buckets.
/// Empty buckets are omitted from the serialized response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdateResponse {
    #[serde(rename = "SUCCESS_CONTENTS", default, skip_serializing_if = "Vec::is_empty")]
    pub success_contents: Vec<ContentId>,
    #[serde(rename = "NOT_A_ON_GOING_BATCH", default, skip_serializing_if = "Vec::is_empty")]
    pub not_a_on_going_batch: Vec<BatchId>,
    #[serde(rename = "BATCH_NOT_EXISTS", default, skip_serializing_if = "Vec::is_empty")]
    pub batch_not_exists: Vec<BatchId>,
}

impl ContentUpdateResponse {
    /// Record the content ids merged and persisted for an active batch.
    pub fn record_success(&mut self, content_ids: impl IntoIterator<Item = ContentId>) {
        self.success_contents.extend(content_ids);
    }

    /// Record a batch that exists but is not in an ongoing enrollment state.
    pub fn record_not_ongoing(&mut self, batch_id: BatchId) {
        self.not_a_on_going_batch.push(batch_id);
    }

    /// Record a batch id the index knows nothing about.
    pub fn record_missing(&mut self, batch_id: BatchId) {
        self.batch_not_exists.push(batch_id);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
