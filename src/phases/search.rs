//! Search phase: issue discovery queries and collect candidate links
//!
//! Queries move Queued -> InBatch -> completed; every query in a batch is
//! marked completed regardless of yield (zero links and per-query errors
//! included); only the retry phase re-attempts failures. A whole-batch
//! executor failure marks nothing completed: each query gets a failure-log
//! entry and stays eligible for a later run.

use std::time::Instant;

use crate::executor::BatchExecutor;
use crate::model::{FailedItem, Phase, SearchQuery};
use crate::phases::Pipeline;

/// Outcome counters for one search-phase run
#[derive(Debug, Default, Clone)]
pub struct SearchReport {
    pub batches: u32,
    pub queries_completed: usize,
    pub links_added: usize,
    pub batch_failures: u32,
}

impl<E: BatchExecutor> Pipeline<E> {
    /// Runs the search phase over the given query list
    ///
    /// Only queries absent from the completed-search set are scheduled.
    /// All four checkpoint artifacts persist after every batch.
    pub async fn run_search_phase(&mut self, queries: &[SearchQuery]) -> SearchReport {
        let mut report = SearchReport::default();

        let remaining = self.store.get_remaining_searches(queries);
        tracing::info!(
            "Search phase: {} total queries, {} already completed, {} remaining",
            queries.len(),
            queries.len() - remaining.len(),
            remaining.len()
        );

        if remaining.is_empty() {
            tracing::info!("All searches already completed");
            return report;
        }

        let batch_size = self.config.search_batch_size;
        let total_batches = remaining.len().div_ceil(batch_size);
        let started = Instant::now();
        let mut scheduled = 0usize;

        for (batch_index, chunk) in remaining.chunks(batch_size).enumerate() {
            scheduled += chunk.len();

            // A prior batch (or concurrent bookkeeping) may have completed
            // some of these; re-check against the live set.
            let pending: Vec<SearchQuery> = chunk
                .iter()
                .filter(|q| !self.store.is_search_completed(&q.identity()))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            tracing::info!(
                "Search batch {}/{} ({} queries)",
                batch_index + 1,
                total_batches,
                pending.len()
            );

            match self.executor.run_searches(&pending).await {
                Ok(outcomes) => {
                    let mut batch_links = Vec::new();
                    for outcome in outcomes {
                        let identity = outcome.query.identity();
                        if outcome.links.is_empty() {
                            tracing::debug!(
                                "{}: no links found ({})",
                                identity,
                                outcome.error.as_deref().unwrap_or("empty result")
                            );
                        } else {
                            let found = outcome.links.len();
                            let unseen = self.dedup.filter_unseen_links(outcome.links);
                            tracing::info!("{}: {} links ({} new)", identity, found, unseen.len());
                            batch_links.extend(unseen);
                        }
                        self.store.mark_search_completed(&identity);
                        report.queries_completed += 1;
                    }

                    if !batch_links.is_empty() {
                        let added = self.store.add_pending_links(&batch_links);
                        tracing::info!("Batch complete: {} new links queued", added);
                        report.links_added += added;
                    }
                }
                Err(e) => {
                    // Whole-batch failure: skip the batch, mark nothing
                    // completed, leave every query retryable.
                    tracing::warn!("Search batch failed: {}", e);
                    for query in &pending {
                        self.store
                            .record_failure(FailedItem::Query(query.clone()), &e.to_string());
                    }
                    report.batch_failures += 1;
                    continue;
                }
            }

            report.batches += 1;
            self.persist_search_checkpoint();

            // Advisory throughput for long runs; never authoritative.
            let elapsed_min = started.elapsed().as_secs_f64() / 60.0;
            if elapsed_min > 0.0 {
                let rate = scheduled as f64 / elapsed_min;
                let left = remaining.len().saturating_sub(scheduled);
                tracing::info!(
                    "Progress: {}/{} queries this run, {:.1} q/min, ETA {:.1} min",
                    scheduled,
                    remaining.len(),
                    rate,
                    left as f64 / rate.max(f64::MIN_POSITIVE)
                );
            }

            if scheduled < remaining.len() {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        tracing::info!(
            "Search phase complete: {} pending links total",
            self.store.pending_link_count()
        );
        report
    }

    fn persist_search_checkpoint(&mut self) {
        let mut progress = self.store.get_progress();
        progress.phase = Phase::Search;
        progress.completed_searches = self.store.completed_search_count() as u64;
        progress.total_links_found = self.store.pending_link_count() as u64;
        self.store.save_progress(&progress);
        self.store.save_all();
        self.dedup.save();
    }
}
