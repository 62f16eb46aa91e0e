use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SearchQuery;

/// The pipeline phase recorded in the progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Search,
    Details,
    Retry,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Search => "search",
            Phase::Details => "details",
            Phase::Retry => "retry",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Advisory resume metadata persisted after every batch
///
/// The counters here are observability data, not authoritative state: the
/// completed-search set and pending queue are re-derived from their own
/// artifacts on resume, so a stale snapshot never corrupts a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,

    #[serde(default)]
    pub completed_searches: u64,

    #[serde(default)]
    pub completed_details: u64,

    #[serde(default)]
    pub total_links_found: u64,

    #[serde(default)]
    pub total_saved: u64,

    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Search,
            completed_searches: 0,
            completed_details: 0,
            total_links_found: 0,
            total_saved: 0,
            last_update: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// The work item recorded alongside a batch-level failure
///
/// Search failures carry the full query so the retry phase can re-issue
/// them; detail failures carry the raw link string. The untagged encoding
/// keeps the on-disk log readable as plain `{item, error, timestamp}`
/// records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailedItem {
    Query(SearchQuery),
    Link(String),
}

impl FailedItem {
    /// True when this failure is structurally a search query
    pub fn is_query(&self) -> bool {
        matches!(self, FailedItem::Query(_))
    }

    pub fn as_query(&self) -> Option<&SearchQuery> {
        match self {
            FailedItem::Query(q) => Some(q),
            FailedItem::Link(_) => None,
        }
    }
}

/// One appended entry in the failure log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub item: FailedItem,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureEntry {
    pub fn new(item: FailedItem, error: impl Into<String>) -> Self {
        Self {
            item,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}
