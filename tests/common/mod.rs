//! Shared test fixtures: a scripted batch executor and pipeline builders
//!
//! The scripted executor replaces the HTTP executor so orchestration
//! behavior (checkpointing, dedup, halting, retry) can be tested without
//! a network.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use placeharvest::checkpoint::CheckpointStore;
use placeharvest::config::PipelineConfig;
use placeharvest::dedup::DedupIndex;
use placeharvest::executor::{
    BatchExecutor, DetailSlot, ExecutorError, ExecutorResult, RejectReason, SearchOutcome,
};
use placeharvest::model::{CandidateLink, EntityRecord, SearchQuery};
use placeharvest::output::SavedCollection;
use placeharvest::phases::Pipeline;

/// What the executor does for one search query, keyed by query identity
#[derive(Clone)]
pub enum SearchPlan {
    /// Return these links as the query's outcome
    Links(Vec<String>),
    /// Fail the whole batch containing this query
    BatchFail(String),
}

/// What the executor does for one detail link, keyed by raw link string
#[derive(Clone)]
pub enum DetailPlan {
    Record(EntityRecord),
    Reject,
    Fail(String),
    /// Fail the whole batch containing this link
    BatchFail(String),
}

#[derive(Default)]
pub struct ScriptedExecutor {
    searches: HashMap<String, SearchPlan>,
    details: HashMap<String, DetailPlan>,
    pub search_batches: AtomicUsize,
    pub detail_batches: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, query: &str, plan: SearchPlan) -> Self {
        self.searches.insert(query.to_string(), plan);
        self
    }

    pub fn on_detail(mut self, link: &str, plan: DetailPlan) -> Self {
        self.details.insert(link.to_string(), plan);
        self
    }

    pub fn search_batch_count(&self) -> usize {
        self.search_batches.load(Ordering::SeqCst)
    }

    pub fn detail_batch_count(&self) -> usize {
        self.detail_batches.load(Ordering::SeqCst)
    }
}

impl BatchExecutor for ScriptedExecutor {
    async fn run_searches(&self, queries: &[SearchQuery]) -> ExecutorResult<Vec<SearchOutcome>> {
        self.search_batches.fetch_add(1, Ordering::SeqCst);
        for query in queries {
            if let Some(SearchPlan::BatchFail(msg)) = self.searches.get(&query.identity()) {
                return Err(ExecutorError::Batch(msg.clone()));
            }
        }
        Ok(queries
            .iter()
            .map(|query| match self.searches.get(&query.identity()) {
                Some(SearchPlan::Links(links)) => SearchOutcome::found(
                    query.clone(),
                    links.iter().map(CandidateLink::new).collect(),
                ),
                _ => SearchOutcome::failed(query.clone(), "no results"),
            })
            .collect())
    }

    async fn run_details(&self, links: &[CandidateLink]) -> ExecutorResult<Vec<DetailSlot>> {
        self.detail_batches.fetch_add(1, Ordering::SeqCst);
        for link in links {
            if let Some(DetailPlan::BatchFail(msg)) = self.details.get(link.as_str()) {
                return Err(ExecutorError::Batch(msg.clone()));
            }
        }
        Ok(links
            .iter()
            .map(|link| match self.details.get(link.as_str()) {
                Some(DetailPlan::Record(record)) => DetailSlot::Saved(record.clone()),
                Some(DetailPlan::Reject) => DetailSlot::Rejected(RejectReason::BelowRatingFloor),
                Some(DetailPlan::Fail(msg)) => DetailSlot::Failed(msg.clone()),
                Some(DetailPlan::BatchFail(msg)) => DetailSlot::Failed(msg.clone()),
                None => DetailSlot::Failed("unscripted link".to_string()),
            })
            .collect())
    }
}

/// A maps-style link embedding the given place identifier
pub fn maps_link(place_id: &str) -> String {
    format!("https://maps.example.com/place/x/data=!4m2!3m1!1s{}", place_id)
}

pub fn record(place_id: &str, name: &str) -> EntityRecord {
    EntityRecord::with_identity(Some(place_id), name, "1 Main St")
}

/// Default config with the inter-batch delay removed
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        batch_delay_ms: 0,
        ..PipelineConfig::default()
    }
}

/// Builds a pipeline rooted under `root`, with checkpoints, the dedup
/// index, and the collection laid out the way the CLI lays them out
pub fn pipeline_at(
    root: &Path,
    executor: ScriptedExecutor,
    config: PipelineConfig,
) -> Pipeline<ScriptedExecutor> {
    let store = CheckpointStore::new(root.join("checkpoints")).unwrap();
    let dedup = DedupIndex::open(root.join("checkpoints").join("seen_places.json"));
    let collection = SavedCollection::load(root.join("output").join("places.json"));
    Pipeline::new(store, dedup, collection, executor, config)
}
