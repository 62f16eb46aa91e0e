//! Retry phase: re-issue failed search queries
//!
//! Scans the failure log for entries that are structurally queries;
//! link-level failures are not retried here. Queries run in batch-sized
//! groups but sequentially within a group, reusing the search phase's
//! bookkeeping. Afterwards the failure log is rewritten without the
//! retried items, matched by value equality; an unrelated entry with
//! byte-identical content would be dropped along with it.

use crate::executor::BatchExecutor;
use crate::model::{FailureEntry, Phase, SearchQuery};
use crate::phases::Pipeline;

/// Outcome counters for one retry-phase run
#[derive(Debug, Default, Clone)]
pub struct RetryReport {
    pub retried: usize,
    pub links_added: usize,
    pub still_failing: usize,
}

impl<E: BatchExecutor> Pipeline<E> {
    /// Re-attempts every search failure in the log
    pub async fn run_retry_phase(&mut self) -> RetryReport {
        let mut report = RetryReport::default();

        let failures = self.store.get_failures();
        let search_failures: Vec<SearchQuery> = failures
            .iter()
            .filter_map(|entry| entry.item.as_query().cloned())
            .collect();

        tracing::info!(
            "Retry phase: {} failures recorded, {} are search queries",
            failures.len(),
            search_failures.len()
        );
        if search_failures.is_empty() {
            tracing::info!("No search failures to retry");
            return report;
        }

        let batch_size = self.config.search_batch_size;
        let total = search_failures.len();
        let mut retried: Vec<SearchQuery> = Vec::new();
        let mut issued = 0usize;

        for chunk in search_failures.chunks(batch_size) {
            issued += chunk.len();
            let mut batch_links = Vec::new();

            for query in chunk {
                let identity = query.identity();
                if self.store.is_search_completed(&identity) {
                    tracing::debug!("{}: already completed, skipping", identity);
                    retried.push(query.clone());
                    continue;
                }

                match self.executor.run_searches(std::slice::from_ref(query)).await {
                    Ok(outcomes) => {
                        if let Some(outcome) = outcomes.into_iter().next() {
                            if outcome.links.is_empty() {
                                tracing::debug!(
                                    "{}: no links found ({})",
                                    identity,
                                    outcome.error.as_deref().unwrap_or("empty result")
                                );
                            } else {
                                let found = outcome.links.len();
                                let unseen = self.dedup.filter_unseen_links(outcome.links);
                                tracing::info!(
                                    "{}: {} links ({} new)",
                                    identity,
                                    found,
                                    unseen.len()
                                );
                                batch_links.extend(unseen);
                            }
                        }
                        self.store.mark_search_completed(&identity);
                        retried.push(query.clone());
                    }
                    Err(e) => {
                        // Entry stays in the failure log for the next run.
                        tracing::warn!("{}: retry failed: {}", identity, e);
                    }
                }
            }

            if !batch_links.is_empty() {
                report.links_added += self.store.add_pending_links(&batch_links);
            }

            let mut progress = self.store.get_progress();
            progress.phase = Phase::Retry;
            progress.completed_searches = self.store.completed_search_count() as u64;
            progress.total_links_found = self.store.pending_link_count() as u64;
            self.store.save_progress(&progress);
            self.store.save_all();
            self.dedup.save();

            if issued < total {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        if !retried.is_empty() {
            // Value-equality rewrite: keep link failures and queries that
            // were not successfully retried.
            let remaining: Vec<FailureEntry> = failures
                .into_iter()
                .filter(|entry| match entry.item.as_query() {
                    Some(query) => !retried.contains(query),
                    None => true,
                })
                .collect();
            report.still_failing = remaining
                .iter()
                .filter(|entry| entry.item.is_query())
                .count();
            self.store.rewrite_failures(&remaining);
            tracing::info!(
                "Retry phase complete: cleared {} retried items from the failure log",
                retried.len()
            );
        }
        report.retried = retried.len();
        report
    }
}
