//! Phase orchestrators
//!
//! A [`Pipeline`] owns one checkpoint namespace, the dedup index, the
//! saved-entity collection, and an injected batch executor, and drives
//! the three phase state machines over them. Orchestration is sequential
//! at batch granularity: each batch is executed, merged, and persisted
//! before the next begins, so an interrupted process loses at most one
//! batch of work.

mod details;
mod retry;
mod search;

pub use details::{DetailsReport, HaltReason, RejectTally};
pub use retry::RetryReport;
pub use search::SearchReport;

use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::dedup::DedupIndex;
use crate::executor::BatchExecutor;
use crate::model::{Phase, SearchQuery};
use crate::output::SavedCollection;

/// Batch-driven orchestrator over one checkpoint namespace
///
/// Recovery variants are just differently-parameterized instances of this
/// same type: a different checkpoint directory, a pre-seeded queue, or a
/// reconciliation-derived queue, with the dedup index shared across all
/// of them.
pub struct Pipeline<E> {
    store: CheckpointStore,
    dedup: DedupIndex,
    collection: SavedCollection,
    executor: E,
    config: PipelineConfig,
}

impl<E: BatchExecutor> Pipeline<E> {
    pub fn new(
        store: CheckpointStore,
        dedup: DedupIndex,
        collection: SavedCollection,
        executor: E,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            dedup,
            collection,
            executor,
            config,
        }
    }

    pub fn store_mut(&mut self) -> &mut CheckpointStore {
        &mut self.store
    }

    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    pub fn dedup_mut(&mut self) -> &mut DedupIndex {
        &mut self.dedup
    }

    pub fn collection(&self) -> &SavedCollection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut SavedCollection {
        &mut self.collection
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn set_phase(&mut self, phase: Phase) {
        let mut progress = self.store.get_progress();
        progress.phase = phase;
        self.store.save_progress(&progress);
    }

    /// Runs the full pipeline: search, details, retry, and a second
    /// details pass when retries enqueued new links
    pub async fn run(&mut self, queries: &[SearchQuery], skip_search: bool, skip_details: bool) {
        let stats = self.store.stats();
        tracing::info!(
            "Resume state: {} searches completed, {} links pending, {} saved, {} failures, dedup count {}",
            stats.completed_searches,
            stats.pending_links,
            self.collection.len(),
            stats.failures,
            self.dedup.count()
        );

        if !skip_search {
            self.set_phase(Phase::Search);
            let report = self.run_search_phase(queries).await;
            tracing::info!(
                "Search phase done: {} queries completed, {} links added, {} batch failures",
                report.queries_completed,
                report.links_added,
                report.batch_failures
            );
        }

        if !skip_details {
            self.set_phase(Phase::Details);
            let report = self.run_details_phase().await;
            tracing::info!(
                "Details phase done: {} processed, {} saved ({})",
                report.processed,
                report.saved,
                report.halt
            );
        }

        if !skip_search && !self.store.get_failures().is_empty() {
            self.set_phase(Phase::Retry);
            let report = self.run_retry_phase().await;
            tracing::info!(
                "Retry phase done: {} retried, {} links added",
                report.retried,
                report.links_added
            );

            if !skip_details && self.store.pending_link_count() > 0 {
                self.set_phase(Phase::Details);
                let report = self.run_details_phase().await;
                tracing::info!(
                    "Post-retry details done: {} processed, {} saved ({})",
                    report.processed,
                    report.saved,
                    report.halt
                );
            }
        }

        let mut progress = self.store.get_progress();
        progress.phase = Phase::Complete;
        progress.completed_at = Some(chrono::Utc::now());
        progress.total_saved = self.collection.len() as u64;
        self.store.save_progress(&progress);

        tracing::info!(
            "Run complete: {} searches, {} links pending, {} places saved, {} failures",
            self.store.completed_search_count(),
            self.store.pending_link_count(),
            self.collection.len(),
            self.store.get_failures().len()
        );
    }
}
