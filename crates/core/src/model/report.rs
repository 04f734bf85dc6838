use serde::{Deserialize, Serialize};

use crate::model::ids::{ContentId, UserId};

/// One incoming activity report for one content unit.
///
/// Timestamps arrive as canonical-format string literals (see `time`); the
/// literal `"null"` and an absent field both mean "no timestamp supplied".
/// A report whose `batch_id` is blank is dropped before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStateReport {
    pub batch_id: String,
    pub content_id: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_access_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_time: Option<String>,
}

/// A batch of activity reports submitted for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStateRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub contents: Vec<ContentStateReport>,
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_from_camel_case_wire_shape() {
        let json = r#"{
            "userId": "u1",
            "contents": [
                {"batchId": "b1", "contentId": "c1", "status": 2, "progress": 100,
                 "lastAccessTime": "2026-02-01 10:00:00:000+0000"}
            ]
        }"#;
        let req: ContentStateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id, UserId::new("u1"));
        assert_eq!(req.contents.len(), 1);
        assert_eq!(req.contents[0].status, Some(2));
        assert_eq!(req.contents[0].last_completed_time, None);
    }

    #[test]
    fn absent_contents_deserializes_as_empty_list() {
        let req: ContentStateRequest = serde_json::from_str(r#"{"userId": "u1"}"#).unwrap();
        assert!(req.contents.is_empty());
    }
}
