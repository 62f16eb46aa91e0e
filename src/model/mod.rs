//! Data model for the collection pipeline
//!
//! Explicit tagged types for every entity that crosses a persistence or
//! executor boundary: search queries, candidate links, fetched records,
//! and the progress/failure bookkeeping artifacts.

mod link;
mod progress;
mod query;
mod record;

pub use link::{extract_place_id, place_url_for_id, CandidateLink};
pub use progress::{FailedItem, FailureEntry, Phase, ProgressSnapshot};
pub use query::{parse_query_string, SearchQuery};
pub use record::{BusinessType, EntityRecord};
