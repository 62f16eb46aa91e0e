//! The batch-executor boundary
//!
//! Orchestrators never fetch anything themselves; they hand a batch of
//! work items to a [`BatchExecutor`] and observe one outcome slot per
//! item. Per-item failures are ordinary outcome values; an executor
//! returns `Err` only for batch-wide catastrophic failure, which the
//! orchestrator treats as "skip batch, mark nothing".

mod http;

pub use http::HttpExecutor;

use thiserror::Error;

use crate::model::{CandidateLink, EntityRecord, SearchQuery};

/// Errors surfaced by batch executors
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Whole-batch catastrophic failure (the only error orchestrators see)
    #[error("Batch failed: {0}")]
    Batch(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// One slot of a search batch: the query, its discovered links, and an
/// optional per-query error description
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: SearchQuery,
    pub links: Vec<CandidateLink>,
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn found(query: SearchQuery, links: Vec<CandidateLink>) -> Self {
        Self {
            query,
            links,
            error: None,
        }
    }

    pub fn failed(query: SearchQuery, error: impl Into<String>) -> Self {
        Self {
            query,
            links: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Why a fetched place was rejected by business rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Rating missing or below the configured floor
    BelowRatingFloor,
    /// No name could be extracted
    MissingName,
    /// The page describes something other than a place (postal code,
    /// neighborhood, ...)
    NotAPlace,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RejectReason::BelowRatingFloor => "below rating floor",
            RejectReason::MissingName => "missing name",
            RejectReason::NotAPlace => "not a place",
        };
        f.write_str(name)
    }
}

/// One slot of a details batch
///
/// `Rejected` is a normal outcome (the candidate was fetched and ruled
/// out); `Failed` is a per-item fetch failure and feeds the error-rate
/// halting heuristic. Neither produces a saved record.
#[derive(Debug, Clone)]
pub enum DetailSlot {
    Saved(EntityRecord),
    Rejected(RejectReason),
    Failed(String),
}

impl DetailSlot {
    pub fn is_failed(&self) -> bool {
        matches!(self, DetailSlot::Failed(_))
    }

    pub fn into_record(self) -> Option<EntityRecord> {
        match self {
            DetailSlot::Saved(record) => Some(record),
            _ => None,
        }
    }
}

/// External collaborator performing the actual fetch work for one batch
///
/// Contract: both methods return exactly one slot per input item, in input
/// order, and never fail for individual items; `Err` means the whole
/// batch is unusable.
#[allow(async_fn_in_trait)]
pub trait BatchExecutor {
    /// Runs a batch of search queries, returning discovered links per query
    async fn run_searches(&self, queries: &[SearchQuery]) -> ExecutorResult<Vec<SearchOutcome>>;

    /// Fetches a batch of place detail pages
    async fn run_details(&self, links: &[CandidateLink]) -> ExecutorResult<Vec<DetailSlot>>;
}
