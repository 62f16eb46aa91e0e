use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::model::{CandidateLink, EntityRecord};

/// On-disk shape of the dedup index: two named arrays in one record
#[derive(Debug, Default, Serialize, Deserialize)]
struct DedupRecord {
    #[serde(default)]
    place_ids: Vec<String>,
    #[serde(default)]
    hashes: Vec<String>,
}

/// Append-only index of places already captured
///
/// A record is a duplicate when its primary identifier is known, or when
/// its normalized name+address hash is known. Links are screened by the
/// identifier embedded in the link string; a link whose identifier cannot
/// be parsed is always treated as unseen, preferring a redundant fetch
/// over a lost candidate.
pub struct DedupIndex {
    path: PathBuf,
    seen_place_ids: HashSet<String>,
    seen_hashes: HashSet<String>,
}

impl DedupIndex {
    /// Opens the index at `path`, loading any existing state
    ///
    /// A corrupt or missing file yields an empty index, never an error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record: DedupRecord = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Ignoring corrupt dedup index {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        let index = Self {
            path,
            seen_place_ids: record.place_ids.into_iter().collect(),
            seen_hashes: record.hashes.into_iter().collect(),
        };
        tracing::debug!(
            "Dedup index loaded: {} place ids, {} fallback hashes",
            index.seen_place_ids.len(),
            index.seen_hashes.len()
        );
        index
    }

    /// Persists the current state; failure is a logged warning
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create {}: {}", parent.display(), e);
                return;
            }
        }
        let record = DedupRecord {
            place_ids: self.seen_place_ids.iter().cloned().collect(),
            hashes: self.seen_hashes.iter().cloned().collect(),
        };
        let result = serde_json::to_string(&record)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&self.path, json));
        if let Err(e) = result {
            tracing::warn!("Could not persist dedup index {}: {}", self.path.display(), e);
        }
    }

    /// Whether a record has already been captured, by either identity
    pub fn is_duplicate(&self, record: &EntityRecord) -> bool {
        if let Some(place_id) = &record.place_id {
            if self.seen_place_ids.contains(place_id) {
                return true;
            }
        }

        if !record.name.is_empty() && !record.address.is_empty() {
            let hash = fallback_hash(&record.name, &record.address);
            if self.seen_hashes.contains(&hash) {
                return true;
            }
        }

        false
    }

    /// Marks a record as seen, populating both identity sets when available
    pub fn mark_seen(&mut self, record: &EntityRecord) {
        if let Some(place_id) = &record.place_id {
            self.seen_place_ids.insert(place_id.clone());
        }
        if !record.name.is_empty() && !record.address.is_empty() {
            self.seen_hashes
                .insert(fallback_hash(&record.name, &record.address));
        }
    }

    /// Keeps only records not yet seen, marking each kept record seen
    /// immediately so duplicates within the same batch are also dropped
    pub fn filter_unique(&mut self, records: Vec<EntityRecord>) -> Vec<EntityRecord> {
        let mut unique = Vec::new();
        for record in records {
            if !self.is_duplicate(&record) {
                self.mark_seen(&record);
                unique.push(record);
            }
        }
        unique
    }

    /// Whether a link's embedded identifier is already known
    ///
    /// Unparseable links are never "seen": dedup here prefers false
    /// negatives over silently discarding candidates.
    pub fn is_link_seen(&self, link: &CandidateLink) -> bool {
        match link.place_id() {
            Some(place_id) => self.seen_place_ids.contains(&place_id),
            None => false,
        }
    }

    /// Drops links pointing at places already captured
    pub fn filter_unseen_links(&self, links: Vec<CandidateLink>) -> Vec<CandidateLink> {
        links
            .into_iter()
            .filter(|link| !self.is_link_seen(link))
            .collect()
    }

    /// All known primary identifiers
    pub fn seen_place_ids(&self) -> &HashSet<String> {
        &self.seen_place_ids
    }

    /// Number of distinct identities seen (primary + fallback)
    pub fn count(&self) -> usize {
        self.seen_place_ids.len() + self.seen_hashes.len()
    }

    pub fn place_id_count(&self) -> usize {
        self.seen_place_ids.len()
    }

    /// Clears both sets and persists the empty state
    pub fn clear(&mut self) {
        self.seen_place_ids.clear();
        self.seen_hashes.clear();
        self.save();
    }

    /// Where this index lives on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fallback identity: hash of lowercased, trimmed `name|address`
fn fallback_hash(name: &str, address: &str) -> String {
    let combined = format!(
        "{}|{}",
        name.trim().to_lowercase(),
        address.trim().to_lowercase()
    );
    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fresh_index() -> (TempDir, DedupIndex) {
        let dir = TempDir::new().unwrap();
        let index = DedupIndex::open(dir.path().join("seen_places.json"));
        (dir, index)
    }

    fn record(id: Option<&str>, name: &str, address: &str) -> EntityRecord {
        EntityRecord::with_identity(id, name, address)
    }

    #[test]
    fn test_fresh_index_is_empty() {
        let (_dir, index) = fresh_index();
        assert_eq!(index.count(), 0);
        assert!(!index.is_duplicate(&record(Some("0xa:0xb"), "X", "Y")));
    }

    #[test]
    fn test_mark_seen_populates_both_sets() {
        let (_dir, mut index) = fresh_index();
        index.mark_seen(&record(Some("0xa:0xb"), "X", "Y"));
        assert_eq!(index.place_id_count(), 1);
        assert_eq!(index.count(), 2);

        // recognized by id alone
        assert!(index.is_duplicate(&record(Some("0xa:0xb"), "", "")));
        // recognized by fallback hash alone
        assert!(index.is_duplicate(&record(None, "X", "Y")));
    }

    #[test]
    fn test_fallback_hash_normalizes_case_and_whitespace() {
        let (_dir, mut index) = fresh_index();
        index.mark_seen(&record(None, "Luigi's Pizza", "1 Main St"));
        assert!(index.is_duplicate(&record(None, "  LUIGI'S PIZZA ", "1 MAIN ST  ")));
    }

    #[test]
    fn test_no_fallback_without_both_fields() {
        let (_dir, mut index) = fresh_index();
        index.mark_seen(&record(None, "OnlyName", ""));
        assert_eq!(index.count(), 0);
        assert!(!index.is_duplicate(&record(None, "OnlyName", "")));
    }

    #[test]
    fn test_filter_unique_catches_intra_batch_duplicates() {
        let (_dir, mut index) = fresh_index();
        let batch = vec![
            record(Some("A"), "X", "Y"),
            record(Some("A"), "X", "Y"),
            record(Some("B"), "Z", "W"),
        ];
        let unique = index.filter_unique(batch);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_filter_unique_twice_yields_empty_second_pass() {
        let (_dir, mut index) = fresh_index();
        let batch = vec![record(Some("A"), "X", "Y"), record(Some("B"), "Z", "W")];

        let first = index.filter_unique(batch.clone());
        assert_eq!(first.len(), 2);

        let second = index.filter_unique(batch);
        assert!(second.is_empty());
    }

    #[test]
    fn test_link_seen_only_when_id_parses_and_is_known() {
        let (_dir, mut index) = fresh_index();
        index.mark_seen(&record(Some("0xa:0xb"), "X", "Y"));

        assert!(index.is_link_seen(&CandidateLink::new("https://x/!1s0xa:0xb")));
        assert!(!index.is_link_seen(&CandidateLink::new("https://x/!1s0xc:0xd")));
        // no parseable id: conservatively unseen
        assert!(!index.is_link_seen(&CandidateLink::new("https://x/opaque")));
    }

    #[test]
    fn test_filter_unseen_links() {
        let (_dir, mut index) = fresh_index();
        index.mark_seen(&record(Some("0xa:0xb"), "X", "Y"));

        let links = vec![
            CandidateLink::new("https://x/!1s0xa:0xb"),
            CandidateLink::new("https://x/!1s0xc:0xd"),
            CandidateLink::new("https://x/opaque"),
        ];
        let unseen = index.filter_unseen_links(links);
        assert_eq!(unseen.len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_places.json");

        let mut index = DedupIndex::open(&path);
        index.mark_seen(&record(Some("0xa:0xb"), "X", "Y"));
        index.save();

        let reloaded = DedupIndex::open(&path);
        assert_eq!(reloaded.place_id_count(), 1);
        assert!(reloaded.is_duplicate(&record(None, "X", "Y")));
    }

    #[test]
    fn test_corrupt_file_yields_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_places.json");
        std::fs::write(&path, "{\"place_ids\": [oops").unwrap();

        let index = DedupIndex::open(&path);
        assert_eq!(index.count(), 0);
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_places.json");

        let mut index = DedupIndex::open(&path);
        index.mark_seen(&record(Some("A"), "X", "Y"));
        index.save();
        index.clear();

        let reloaded = DedupIndex::open(&path);
        assert_eq!(reloaded.count(), 0);
    }
}
