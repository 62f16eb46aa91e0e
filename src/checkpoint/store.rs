use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::checkpoint::CheckpointResult;
use crate::model::{CandidateLink, FailedItem, FailureEntry, ProgressSnapshot, SearchQuery};

const PROGRESS_FILE: &str = "progress.json";
const COMPLETED_SEARCHES_FILE: &str = "completed_searches.json";
const PENDING_LINKS_FILE: &str = "pending_links.json";
const FAILED_ITEMS_FILE: &str = "failed_items.json";

/// Summary of the persisted state, shown in the resume banner
#[derive(Debug, Clone)]
pub struct CheckpointStats {
    pub phase: crate::model::Phase,
    pub completed_searches: usize,
    pub pending_links: usize,
    pub total_saved: u64,
    pub failures: usize,
}

/// Flat-file checkpoint store for one pipeline namespace
///
/// The completed-search set and pending-link queue are cached in memory
/// after first access; the failure log and progress snapshot are re-read
/// per operation since they are small and append-mostly. All loads are
/// lenient: a corrupt or missing artifact yields empty state, never an
/// error, so a damaged file costs re-work rather than a wedged run.
pub struct CheckpointStore {
    dir: PathBuf,
    completed: Option<HashSet<String>>,
    pending: Option<Vec<CandidateLink>>,
}

impl CheckpointStore {
    /// Opens (creating if needed) a checkpoint directory
    pub fn new(dir: impl Into<PathBuf>) -> CheckpointResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            completed: None,
            pending: None,
        })
    }

    /// The directory holding this namespace's artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    // ===== Progress =====

    /// Loads the current progress snapshot, or a fresh default
    pub fn get_progress(&self) -> ProgressSnapshot {
        read_json(&self.artifact(PROGRESS_FILE)).unwrap_or_default()
    }

    /// Persists a progress snapshot, stamping `last_update`
    pub fn save_progress(&self, progress: &ProgressSnapshot) {
        let mut snapshot = progress.clone();
        snapshot.last_update = Some(Utc::now());
        write_json(&self.artifact(PROGRESS_FILE), &snapshot);
    }

    // ===== Completed searches =====

    fn completed_mut(&mut self) -> &mut HashSet<String> {
        if self.completed.is_none() {
            let loaded: Vec<String> =
                read_json(&self.artifact(COMPLETED_SEARCHES_FILE)).unwrap_or_default();
            self.completed = Some(loaded.into_iter().collect());
        }
        self.completed.as_mut().expect("completed cache populated")
    }

    /// Marks a search query identity as completed (in memory; call
    /// [`save_all`](Self::save_all) at the batch boundary to persist)
    pub fn mark_search_completed(&mut self, identity: &str) {
        self.completed_mut().insert(identity.to_string());
    }

    /// Whether a query identity has already been issued
    pub fn is_search_completed(&mut self, identity: &str) -> bool {
        self.completed_mut().contains(identity)
    }

    pub fn completed_search_count(&mut self) -> usize {
        self.completed_mut().len()
    }

    /// Set difference: the queries not yet in the completed set, in input order
    pub fn get_remaining_searches(&mut self, all_queries: &[SearchQuery]) -> Vec<SearchQuery> {
        let completed = self.completed_mut();
        all_queries
            .iter()
            .filter(|q| !completed.contains(&q.identity()))
            .cloned()
            .collect()
    }

    fn save_completed_searches(&mut self) {
        let path = self.artifact(COMPLETED_SEARCHES_FILE);
        let list: Vec<&String> = self.completed_mut().iter().collect();
        write_json(&path, &list);
    }

    // ===== Pending links =====

    fn pending_mut(&mut self) -> &mut Vec<CandidateLink> {
        if self.pending.is_none() {
            let loaded: Vec<CandidateLink> =
                read_json(&self.artifact(PENDING_LINKS_FILE)).unwrap_or_default();
            self.pending = Some(loaded);
        }
        self.pending.as_mut().expect("pending cache populated")
    }

    /// Appends links not already queued, preserving queue order
    ///
    /// Dedupes by link identity (embedded place id when parseable, raw
    /// string otherwise) against the current queue, then persists
    /// immediately. Returns the number of links actually added.
    pub fn add_pending_links(&mut self, links: &[CandidateLink]) -> usize {
        let pending = self.pending_mut();
        let mut known: HashSet<String> = pending.iter().map(CandidateLink::identity).collect();

        let mut added = 0;
        for link in links {
            let identity = link.identity();
            if known.insert(identity) {
                pending.push(link.clone());
                added += 1;
            }
        }

        if added > 0 {
            let path = self.artifact(PENDING_LINKS_FILE);
            let snapshot = self.pending_mut().clone();
            write_json(&path, &snapshot);
        }
        added
    }

    /// The full pending queue, in order
    pub fn get_pending_links(&mut self) -> &[CandidateLink] {
        self.pending_mut()
    }

    pub fn pending_link_count(&mut self) -> usize {
        self.pending_mut().len()
    }

    /// A fixed-size prefix slice of the pending queue
    pub fn get_next_batch(&mut self, batch_size: usize) -> Vec<CandidateLink> {
        let pending = self.pending_mut();
        pending.iter().take(batch_size).cloned().collect()
    }

    /// Removes the given links from the queue (set subtraction) and persists
    pub fn remove_processed_links(&mut self, batch: &[CandidateLink]) {
        let processed: HashSet<&str> = batch.iter().map(CandidateLink::as_str).collect();
        let pending = self.pending_mut();
        pending.retain(|link| !processed.contains(link.as_str()));

        let path = self.artifact(PENDING_LINKS_FILE);
        let snapshot = self.pending_mut().clone();
        write_json(&path, &snapshot);
    }

    // ===== Failure log =====

    /// Appends a failure entry and persists the log immediately
    pub fn record_failure(&self, item: FailedItem, error: &str) {
        let mut failures = self.get_failures();
        failures.push(FailureEntry::new(item, error));
        write_json(&self.artifact(FAILED_ITEMS_FILE), &failures);
    }

    /// All recorded failures, oldest first
    pub fn get_failures(&self) -> Vec<FailureEntry> {
        read_json(&self.artifact(FAILED_ITEMS_FILE)).unwrap_or_default()
    }

    /// Replaces the failure log wholesale (used after retries)
    pub fn rewrite_failures(&self, entries: &[FailureEntry]) {
        write_json(&self.artifact(FAILED_ITEMS_FILE), &entries);
    }

    /// Deletes the failure log
    pub fn clear_failures(&self) {
        remove_artifact(&self.artifact(FAILED_ITEMS_FILE));
    }

    // ===== Lifecycle =====

    /// Flushes the in-memory caches to disk
    pub fn save_all(&mut self) {
        self.save_completed_searches();
    }

    /// Checkpoint statistics for the resume banner
    pub fn stats(&mut self) -> CheckpointStats {
        let progress = self.get_progress();
        CheckpointStats {
            phase: progress.phase,
            completed_searches: self.completed_search_count(),
            pending_links: self.pending_link_count(),
            total_saved: progress.total_saved,
            failures: self.get_failures().len(),
        }
    }

    /// Clears every persisted artifact and the in-memory caches
    pub fn reset(&mut self) {
        self.completed = Some(HashSet::new());
        self.pending = Some(Vec::new());

        for name in [
            PROGRESS_FILE,
            COMPLETED_SEARCHES_FILE,
            PENDING_LINKS_FILE,
            FAILED_ITEMS_FILE,
        ] {
            remove_artifact(&self.artifact(name));
        }
    }
}

/// Lenient JSON artifact read: missing or corrupt files yield `None`
fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring corrupt checkpoint artifact {}: {}", path.display(), e);
            None
        }
    }
}

/// Best-effort JSON artifact write: failures are warnings, not errors
fn write_json<T: Serialize>(path: &Path, value: &T) {
    let result = serde_json::to_string_pretty(value)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(path, json));
    if let Err(e) = result {
        tracing::warn!("Could not persist {}: {}", path.display(), e);
    }
}

fn remove_artifact(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
