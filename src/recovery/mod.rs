//! Recovery and variant orchestrations
//!
//! Alternate entry points built over the same primitives the normal run
//! uses (checkpoint namespaces, the shared dedup index, the phase
//! machines), differing in how the initial work queue is built:
//!
//! - [`replay_queries`]: re-run an externally supplied query list through
//!   search + details in a separate checkpoint namespace.
//! - [`seed_links`]: pre-load the pending queue from an external link
//!   list, then fetch details as usual.
//! - [`reconcile`]: derive the queue from identifier reconciliation
//!   (seen - saved - pending - already-recovered) to win back places that
//!   were marked seen but never durably saved.
//!
//! Every variant merges its output into the canonical saved collection by
//! primary id, never overwriting existing records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::dedup::DedupIndex;
use crate::executor::{BatchExecutor, DetailSlot};
use crate::model::{parse_query_string, place_url_for_id, CandidateLink, SearchQuery};
use crate::output::SavedCollection;
use crate::phases::Pipeline;
use crate::{HarvestError, Result};

/// Suffix appended to the main checkpoint dir for recovery namespaces
pub const RECOVERY_NAMESPACE_SUFFIX: &str = "_recovery";

/// Artifact tracking identifiers already re-fetched by [`reconcile`]
pub const RECOVERED_IDS_FILE: &str = "recovered_ids.json";

/// Outcome of a reconciliation run
#[derive(Debug, Default, Clone)]
pub struct ReconcileReport {
    /// Identifiers selected by the set difference
    pub candidates: usize,
    /// Identifiers actually visited this run
    pub visited: usize,
    /// Records merged into the canonical collection
    pub merged: usize,
    /// Per-item fetch failures observed
    pub errors: usize,
    /// True when the error-rate heuristic stopped the run early
    pub halted_early: bool,
}

/// Loads a JSON array of strings from a required input file
///
/// A missing file is the one startup condition that is process-fatal.
fn load_string_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(HarvestError::MissingInput(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| HarvestError::MalformedInput {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads seed queries from a file of bare query strings
pub fn load_seed_queries(path: &Path) -> Result<Vec<SearchQuery>> {
    Ok(load_string_list(path)?
        .iter()
        .map(|text| parse_query_string(text))
        .collect())
}

/// Loads seed links from a file of raw link strings
pub fn load_seed_links(path: &Path) -> Result<Vec<CandidateLink>> {
    Ok(load_string_list(path)?
        .into_iter()
        .map(CandidateLink::new)
        .collect())
}

/// Replays an external query list through search + details
///
/// `recovery` must be rooted at its own checkpoint namespace but share
/// the canonical dedup index, so only still-unseen links are collected.
/// Returns the number of records merged into `canonical`.
pub async fn replay_queries<E: BatchExecutor>(
    recovery: &mut Pipeline<E>,
    canonical: &mut SavedCollection,
    query_file: &Path,
    search_only: bool,
) -> Result<usize> {
    let queries = load_seed_queries(query_file)?;
    tracing::info!("Recovery replay: {} queries from {}", queries.len(), query_file.display());

    recovery.run_search_phase(&queries).await;
    if search_only {
        return Ok(0);
    }
    recovery.run_details_phase().await;

    let merged = canonical.merge_unique_by_id(recovery.collection().records().to_vec());
    canonical.save();
    tracing::info!("Recovery replay merged {} new records", merged);
    Ok(merged)
}

/// Pre-seeds the pending queue from an external link file, then fetches
///
/// Returns the number of records merged into `canonical`.
pub async fn seed_links<E: BatchExecutor>(
    recovery: &mut Pipeline<E>,
    canonical: &mut SavedCollection,
    links_file: &Path,
) -> Result<usize> {
    let links = load_seed_links(links_file)?;
    let added = recovery.store_mut().add_pending_links(&links);
    tracing::info!(
        "Seeded {} links from {} ({} new in queue)",
        links.len(),
        links_file.display(),
        added
    );

    recovery.run_details_phase().await;

    let merged = canonical.merge_unique_by_id(recovery.collection().records().to_vec());
    canonical.save();
    tracing::info!("Seed-links run merged {} new records", merged);
    Ok(merged)
}

/// Set difference selecting identifiers to re-fetch: every seen id that
/// is not saved, not currently pending, and not already recovered
pub fn derive_reconcile_ids(
    seen: &HashSet<String>,
    saved: &HashSet<String>,
    pending: &[CandidateLink],
    recovered: &HashSet<String>,
) -> Vec<String> {
    let pending_ids: HashSet<String> =
        pending.iter().filter_map(CandidateLink::place_id).collect();

    let mut ids: Vec<String> = seen
        .iter()
        .filter(|id| {
            !saved.contains(*id) && !pending_ids.contains(*id) && !recovered.contains(*id)
        })
        .cloned()
        .collect();
    ids.sort();
    ids
}

/// Re-fetches places that were marked seen but never durably saved
///
/// Unlike the other variants this does NOT run the normal details phase:
/// every candidate is by definition already in the seen set, so the
/// dedup filter would drop each re-fetched record. Instead the loop
/// fetches without seen-filtering, keeps its own recovered-ids artifact
/// at `recovered_path` (appended after every successful batch, so
/// repeated runs converge), and applies only the error-rate halting
/// heuristic. A whole-batch failure leaves its ids unrecovered for the
/// next run.
///
/// `main_pending` is the canonical namespace's pending queue; those
/// links will be fetched by the normal details phase and are excluded
/// here.
pub async fn reconcile<E: BatchExecutor>(
    executor: &E,
    config: &PipelineConfig,
    dedup: &DedupIndex,
    canonical: &mut SavedCollection,
    main_pending: &[CandidateLink],
    recovered_path: &Path,
) -> Result<ReconcileReport> {
    let mut recovered: HashSet<String> = read_recovered_ids(recovered_path);

    let ids = derive_reconcile_ids(
        dedup.seen_place_ids(),
        canonical.saved_place_ids(),
        main_pending,
        &recovered,
    );
    tracing::info!(
        "Reconciliation: {} seen, {} saved, {} pending, {} recovered, {} to visit",
        dedup.place_id_count(),
        canonical.saved_place_ids().len(),
        main_pending.len(),
        recovered.len(),
        ids.len()
    );

    let mut report = ReconcileReport {
        candidates: ids.len(),
        ..ReconcileReport::default()
    };
    if ids.is_empty() {
        tracing::info!("Nothing to reconcile");
        return Ok(report);
    }

    let mut results: Vec<crate::model::EntityRecord> = Vec::new();
    let mut consecutive_bad = 0u32;
    let mut issued = 0usize;

    for chunk in ids.chunks(config.details_batch_size) {
        issued += chunk.len();
        let batch: Vec<CandidateLink> = chunk
            .iter()
            .map(|id| CandidateLink::new(place_url_for_id(id)))
            .collect();
        tracing::info!("Reconcile batch ({} places, {}/{})", batch.len(), issued, ids.len());

        match executor.run_details(&batch).await {
            Ok(slots) => {
                let mut failed_now = 0usize;
                for slot in slots {
                    match slot {
                        DetailSlot::Saved(record) => results.push(record),
                        DetailSlot::Rejected(reason) => {
                            tracing::debug!("rejected: {}", reason);
                        }
                        DetailSlot::Failed(error) => {
                            tracing::debug!("fetch failed: {}", error);
                            failed_now += 1;
                        }
                    }
                }
                report.visited += batch.len();
                report.errors += failed_now;

                let error_rate = failed_now as f64 / batch.len() as f64;
                if error_rate > config.error_rate_threshold {
                    consecutive_bad += 1;
                    tracing::warn!(
                        "error rate {:.0}% ({}/{} consecutive bad batches)",
                        error_rate * 100.0,
                        consecutive_bad,
                        config.error_rate_batch_limit
                    );
                } else {
                    consecutive_bad = 0;
                }

                recovered.extend(chunk.iter().cloned());
                write_recovered_ids(recovered_path, &recovered);

                if consecutive_bad >= config.error_rate_batch_limit {
                    report.halted_early = true;
                    tracing::warn!(
                        "Reconciliation halted: {} consecutive batches above the error-rate bound",
                        consecutive_bad
                    );
                    break;
                }
            }
            Err(e) => {
                // Ids stay unrecovered; the next run picks them up again.
                tracing::warn!("Reconcile batch failed: {}", e);
            }
        }

        if issued < ids.len() {
            tokio::time::sleep(config.batch_delay()).await;
        }
    }

    report.merged = canonical.merge_unique_by_id(results);
    canonical.save();
    tracing::info!(
        "Reconciliation complete: {} visited, {} merged, {} errors",
        report.visited,
        report.merged,
        report.errors
    );
    Ok(report)
}

fn read_recovered_ids(path: &Path) -> HashSet<String> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| match serde_json::from_str::<Vec<String>>(&content) {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(e) => {
                tracing::warn!("Ignoring corrupt recovered-ids file {}: {}", path.display(), e);
                None
            }
        })
        .unwrap_or_default()
}

fn write_recovered_ids(path: &Path, ids: &HashSet<String>) {
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();
    let result = serde_json::to_string(&sorted)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(path, json));
    if let Err(e) = result {
        tracing::warn!("Could not persist recovered ids {}: {}", path.display(), e);
    }
}

/// The checkpoint namespace used by recovery variants for a given main dir
pub fn recovery_namespace(checkpoint_dir: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", checkpoint_dir, RECOVERY_NAMESPACE_SUFFIX))
}
