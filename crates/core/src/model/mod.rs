mod batch;
mod enrollment;
mod ids;
mod progress;
mod report;

pub use batch::{BatchMetadata, BatchStatus, BatchUserAggregate};
pub use enrollment::{CourseEnrollment, ProcessingStatus};
pub use ids::{BatchId, ContentId, CourseId, RecordId, UserId};
pub use progress::{ContentProgressRecord, ProgressError, ProgressStatus};
pub use report::{ContentStateReport, ContentStateRequest};
