//! Deterministic primary-key derivation for stored records.
//!
//! Record ids are the hex digest of a one-way hash over the identifying
//! tuple joined with a delimiter, so the same tuple always maps to the same
//! key and distinct tuples do not collide in practice.

use crate::model::{BatchId, ContentId, CourseId, RecordId, UserId};

const KEY_DELIMITER: &str = "##";

/// Key for a `ContentProgressRecord`: (user, content, course, batch).
#[must_use]
pub fn content_progress_key(
    user_id: &UserId,
    content_id: &ContentId,
    course_id: &CourseId,
    batch_id: &BatchId,
) -> RecordId {
    one_way_hash(&[
        user_id.as_str(),
        content_id.as_str(),
        course_id.as_str(),
        batch_id.as_str(),
    ])
}

/// Key for a `CourseEnrollment`: (user, course, batch).
#[must_use]
pub fn enrollment_key(user_id: &UserId, course_id: &CourseId, batch_id: &BatchId) -> RecordId {
    one_way_hash(&[user_id.as_str(), course_id.as_str(), batch_id.as_str()])
}

fn one_way_hash(parts: &[&str]) -> RecordId {
    let composite = parts.join(KEY_DELIMITER);
    RecordId::new(blake3::hash(composite.as_bytes()).to_hex().to_string())
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
