//! Identity-based deduplication across runs
//!
//! Recognizes previously captured places by primary identifier, falling
//! back to a normalized name+address hash when no identifier survived
//! extraction. Both sets are append-only and persisted as a single JSON
//! record shared by every orchestration variant.

mod index;

pub use index::DedupIndex;
