//! Details phase: fetch place records for pending candidate links
//!
//! Links move Pending -> InBatch -> saved, dropped-as-duplicate, or
//! failed. Links leave the pending queue unconditionally after a batch
//! attempt, whether the executor succeeded or failed: a transient fetch
//! failure permanently drops the link rather than requeuing it. That is
//! long-standing documented behavior; the reconciliation recovery flow
//! exists to win those places back.

use crate::executor::{BatchExecutor, DetailSlot, RejectReason};
use crate::model::{FailedItem, Phase};
use crate::phases::Pipeline;

/// Why the details phase stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The pending queue drained normally
    QueueExhausted,
    /// Too many consecutive batches produced zero unique saved records
    ConsecutiveEmptyBatches(u32),
    /// Too many consecutive batches exceeded the failed-slot rate bound
    ErrorRateExceeded(u32),
}

impl HaltReason {
    /// True when the phase stopped early on a systemic-failure heuristic
    pub fn is_early_halt(&self) -> bool {
        !matches!(self, HaltReason::QueueExhausted)
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::QueueExhausted => write!(f, "pending queue exhausted"),
            HaltReason::ConsecutiveEmptyBatches(n) => {
                write!(f, "halted: {} consecutive batches with zero unique results", n)
            }
            HaltReason::ErrorRateExceeded(n) => {
                write!(f, "halted: {} consecutive batches above the error-rate bound", n)
            }
        }
    }
}

/// Per-reason rejection counters
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectTally {
    pub below_rating_floor: usize,
    pub missing_name: usize,
    pub not_a_place: usize,
}

impl RejectTally {
    fn record(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::BelowRatingFloor => self.below_rating_floor += 1,
            RejectReason::MissingName => self.missing_name += 1,
            RejectReason::NotAPlace => self.not_a_place += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.below_rating_floor + self.missing_name + self.not_a_place
    }
}

/// Outcome counters for one details-phase run
#[derive(Debug, Clone)]
pub struct DetailsReport {
    pub batches: u32,
    pub processed: usize,
    pub saved: usize,
    pub duplicates_dropped: usize,
    pub failed_slots: usize,
    pub rejected: RejectTally,
    pub halt: HaltReason,
}

impl Default for DetailsReport {
    fn default() -> Self {
        Self {
            batches: 0,
            processed: 0,
            saved: 0,
            duplicates_dropped: 0,
            failed_slots: 0,
            rejected: RejectTally::default(),
            halt: HaltReason::QueueExhausted,
        }
    }
}

impl<E: BatchExecutor> Pipeline<E> {
    /// Runs the details phase until the queue drains or a halting
    /// heuristic trips
    ///
    /// Saved results and the pending queue persist together after every
    /// batch; an early halt leaves all unprocessed links in the queue for
    /// a future run.
    pub async fn run_details_phase(&mut self) -> DetailsReport {
        let mut report = DetailsReport::default();

        let pending = self.store.pending_link_count();
        tracing::info!(
            "Details phase: {} pending links, batch size {}",
            pending,
            self.config.details_batch_size
        );
        if pending == 0 {
            tracing::info!("No pending links to process");
            return report;
        }

        // Everything already saved counts as seen, even if the dedup
        // artifact lagged the collection at crash time.
        self.collection.mark_all_seen(&mut self.dedup);

        let mut consecutive_empty = 0u32;
        let mut consecutive_bad = 0u32;

        let halt = loop {
            let batch = self.store.get_next_batch(self.config.details_batch_size);
            if batch.is_empty() {
                break HaltReason::QueueExhausted;
            }
            report.batches += 1;
            tracing::info!("Detail batch {} ({} places)", report.batches, batch.len());

            match self.executor.run_details(&batch).await {
                Ok(slots) => {
                    report.processed += batch.len();

                    let mut failed_now = 0usize;
                    let mut fetched = Vec::new();
                    for slot in slots {
                        match slot {
                            DetailSlot::Saved(record) => fetched.push(record),
                            DetailSlot::Rejected(reason) => report.rejected.record(reason),
                            DetailSlot::Failed(error) => {
                                tracing::debug!("fetch failed: {}", error);
                                failed_now += 1;
                            }
                        }
                    }
                    report.failed_slots += failed_now;

                    let fetched_count = fetched.len();
                    let unique = self.dedup.filter_unique(fetched);
                    let saved_now = unique.len();
                    report.saved += saved_now;
                    report.duplicates_dropped += fetched_count - saved_now;

                    if saved_now > 0 {
                        self.collection.append(unique);
                        tracing::info!(
                            "Saved {} unique places (total: {})",
                            saved_now,
                            self.collection.len()
                        );
                    }

                    // Unconditional removal: processed links never requeue.
                    self.store.remove_processed_links(&batch);
                    self.collection.save();
                    self.dedup.save();

                    if saved_now == 0 {
                        consecutive_empty += 1;
                        tracing::warn!(
                            "0 unique results from {} links ({}/{} consecutive)",
                            batch.len(),
                            consecutive_empty,
                            self.config.empty_batch_halt_threshold
                        );
                    } else {
                        consecutive_empty = 0;
                    }

                    let error_rate = failed_now as f64 / batch.len() as f64;
                    if error_rate > self.config.error_rate_threshold {
                        consecutive_bad += 1;
                        tracing::warn!(
                            "error rate {:.0}% ({}/{} consecutive bad batches)",
                            error_rate * 100.0,
                            consecutive_bad,
                            self.config.error_rate_batch_limit
                        );
                    } else {
                        consecutive_bad = 0;
                    }

                    self.persist_details_checkpoint(batch.len());

                    if consecutive_empty >= self.config.empty_batch_halt_threshold {
                        break HaltReason::ConsecutiveEmptyBatches(consecutive_empty);
                    }
                    if consecutive_bad >= self.config.error_rate_batch_limit {
                        break HaltReason::ErrorRateExceeded(consecutive_bad);
                    }
                }
                Err(e) => {
                    // Whole-batch failure: log each link, then drop the
                    // batch from the queue all the same.
                    tracing::warn!("Detail batch failed: {}", e);
                    for link in &batch {
                        self.store
                            .record_failure(FailedItem::Link(link.as_str().to_string()), &e.to_string());
                    }
                    report.processed += batch.len();
                    self.store.remove_processed_links(&batch);
                    self.persist_details_checkpoint(batch.len());
                }
            }

            let remaining = self.store.pending_link_count();
            tracing::info!(
                "Progress: {} places saved, {} links remaining",
                self.collection.len(),
                remaining
            );
            if remaining > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        };

        if halt.is_early_halt() {
            tracing::warn!(
                "Details phase {}: {} links left in queue for a future run",
                halt,
                self.store.pending_link_count()
            );
        } else {
            tracing::info!("Details phase complete: {} places saved", self.collection.len());
        }
        report.halt = halt;
        report
    }

    fn persist_details_checkpoint(&mut self, batch_len: usize) {
        let mut progress = self.store.get_progress();
        progress.phase = Phase::Details;
        progress.completed_details += batch_len as u64;
        progress.total_saved = self.collection.len() as u64;
        self.store.save_progress(&progress);
    }
}
