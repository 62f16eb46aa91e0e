//! Placeharvest: a resumable two-phase place-data collection pipeline
//!
//! This crate implements the orchestration layer for large, long-running
//! collection jobs: a durable checkpoint store, an identity-based dedup
//! index, and batch-driven phase state machines (search, details, retry)
//! that survive crashes and resume with at most one batch of lost work.

pub mod checkpoint;
pub mod config;
pub mod dedup;
pub mod executor;
pub mod model;
pub mod output;
pub mod phases;
pub mod recovery;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for placeharvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Executor error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("Required input file missing: {0}")]
    MissingInput(PathBuf),

    #[error("Malformed input file {path}: {message}")]
    MalformedInput { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for placeharvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::CheckpointStore;
pub use config::Config;
pub use dedup::DedupIndex;
pub use executor::{BatchExecutor, DetailSlot, RejectReason, SearchOutcome};
pub use model::{extract_place_id, CandidateLink, EntityRecord, Phase, SearchQuery};
pub use phases::Pipeline;
