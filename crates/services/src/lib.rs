#![forbid(unsafe_code)]

pub mod batch_resolver;
pub mod error;
pub mod index_sync;
pub mod progress_service;
pub mod response;
pub mod rollup_service;

pub use progress_core::Clock;

pub use batch_resolver::BatchResolver;
pub use error::{RollupError, UpdateError};
pub use index_sync::{IndexSyncHandle, IndexSyncQueue};
pub use progress_service::ContentStateService;
pub use response::ContentUpdateResponse;
pub use rollup_service::{CourseProgressDelta, CourseRollupService};
