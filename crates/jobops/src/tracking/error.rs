//! Tracking engine error types.

use thiserror::Error;

use crate::db::DatabaseError;

/// Errors from stage-tracking operations.
///
/// `JobNotFound`/`EventNotFound` map to 404-style responses upstream;
/// the invalid-value variants map to 400-style responses. Validation
/// happens before any write.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Stage event not found: {0}")]
    EventNotFound(String),

    #[error("Invalid stage: '{0}'")]
    InvalidStage(String),

    #[error("Invalid outcome: '{0}'")]
    InvalidOutcome(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
