//! Durable checkpoint state for resumable runs
//!
//! One flat JSON file per artifact (progress, completed searches, pending
//! links, failure log), each persisted independently at batch boundaries.
//! There is no cross-artifact transaction: a crash between two writes can
//! leave them mutually inconsistent, and resumption copes by re-deriving
//! remaining work as set differences instead of trusting counters.
//!
//! Single-writer-process assumed; concurrent orchestrators against the same
//! directory race with last-write-wins semantics.

mod store;

pub use store::{CheckpointStats, CheckpointStore};

use thiserror::Error;

/// Errors raised while initializing checkpoint storage
///
/// Routine persistence failures during a run are deliberately not errors:
/// they are logged as warnings and the in-memory state carries on, trading
/// drift risk for forward progress.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;
