use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::dedup::DedupIndex;
use crate::model::EntityRecord;

/// The canonical collection of saved place records
///
/// One JSON array on disk, re-persisted after every batch so a crash
/// costs at most one batch of saved results. Records are only ever
/// appended; merges from recovery runs never overwrite an existing
/// record.
pub struct SavedCollection {
    path: PathBuf,
    records: Vec<EntityRecord>,
    known_ids: HashSet<String>,
}

impl SavedCollection {
    /// Loads the collection at `path`; corrupt or missing files yield an
    /// empty collection
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records: Vec<EntityRecord> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(records) => Some(records),
                Err(e) => {
                    tracing::warn!("Ignoring corrupt collection {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        let known_ids = records
            .iter()
            .filter_map(|r: &EntityRecord| r.place_id.clone())
            .collect();

        Self {
            path,
            records,
            known_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Primary identifiers of every saved record
    pub fn saved_place_ids(&self) -> &HashSet<String> {
        &self.known_ids
    }

    /// Seeds the dedup index with every record already in the collection
    ///
    /// Run before a details phase so previously saved places are never
    /// fetched or saved twice, even if the dedup artifact lagged behind
    /// the collection at crash time.
    pub fn mark_all_seen(&self, dedup: &mut DedupIndex) {
        for record in &self.records {
            dedup.mark_seen(record);
        }
    }

    /// Appends records already screened for uniqueness
    pub fn append(&mut self, records: Vec<EntityRecord>) {
        for record in records {
            if let Some(place_id) = &record.place_id {
                self.known_ids.insert(place_id.clone());
            }
            self.records.push(record);
        }
    }

    /// Merges recovery output by primary id, skipping ids already present
    ///
    /// Records without a primary id are not merged; without an identity
    /// there is no way to honor the never-overwrite rule. Returns the
    /// number of records added.
    pub fn merge_unique_by_id(&mut self, records: Vec<EntityRecord>) -> usize {
        let mut added = 0;
        for record in records {
            let Some(place_id) = record.place_id.clone() else {
                continue;
            };
            if self.known_ids.insert(place_id) {
                self.records.push(record);
                added += 1;
            }
        }
        added
    }

    /// Persists the collection; failure is a logged warning
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create {}: {}", parent.display(), e);
                return;
            }
        }
        let result = serde_json::to_string(&self.records)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&self.path, json));
        if let Err(e) = result {
            tracing::warn!("Could not persist collection {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: Option<&str>, name: &str) -> EntityRecord {
        EntityRecord::with_identity(id, name, "addr")
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let collection = SavedCollection::load(dir.path().join("places.json"));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_append_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("places.json");

        let mut collection = SavedCollection::load(&path);
        collection.append(vec![record(Some("A"), "X"), record(None, "Y")]);
        collection.save();

        let reloaded = SavedCollection::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.saved_place_ids().contains("A"));
    }

    #[test]
    fn test_merge_skips_existing_and_id_less_records() {
        let dir = TempDir::new().unwrap();
        let mut collection = SavedCollection::load(dir.path().join("places.json"));
        collection.append(vec![record(Some("A"), "Original A")]);

        let added = collection.merge_unique_by_id(vec![
            record(Some("A"), "Replacement A"),
            record(Some("B"), "New B"),
            record(None, "Anonymous"),
        ]);

        assert_eq!(added, 1);
        assert_eq!(collection.len(), 2);
        // never overwritten
        assert_eq!(collection.records()[0].name, "Original A");
    }

    #[test]
    fn test_mark_all_seen_seeds_dedup() {
        let dir = TempDir::new().unwrap();
        let mut collection = SavedCollection::load(dir.path().join("places.json"));
        collection.append(vec![record(Some("A"), "X")]);

        let mut dedup = DedupIndex::open(dir.path().join("seen_places.json"));
        collection.mark_all_seen(&mut dedup);
        assert!(dedup.is_duplicate(&record(Some("A"), "other name")));
    }

    #[test]
    fn test_corrupt_file_yields_empty_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("places.json");
        std::fs::write(&path, "[{]").unwrap();
        assert!(SavedCollection::load(&path).is_empty());
    }
}
