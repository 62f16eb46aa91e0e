//! Integration tests for the recovery orchestrations
//!
//! Each variant is driven with a scripted executor against real on-disk
//! checkpoint and collection files.

mod common;

use std::path::Path;

use common::{fast_config, maps_link, record, DetailPlan, ScriptedExecutor, SearchPlan};
use placeharvest::checkpoint::CheckpointStore;
use placeharvest::dedup::DedupIndex;
use placeharvest::model::{place_url_for_id, CandidateLink};
use placeharvest::output::SavedCollection;
use placeharvest::phases::Pipeline;
use placeharvest::recovery;
use placeharvest::HarvestError;
use tempfile::TempDir;

fn canonical_dedup_path(root: &Path) -> std::path::PathBuf {
    root.join("checkpoints").join("seen_places.json")
}

fn canonical_collection(root: &Path) -> SavedCollection {
    SavedCollection::load(root.join("output").join("places.json"))
}

/// A recovery-namespace pipeline sharing the canonical dedup index
fn recovery_pipeline(root: &Path, executor: ScriptedExecutor) -> Pipeline<ScriptedExecutor> {
    let store = CheckpointStore::new(root.join("checkpoints_recovery")).unwrap();
    let dedup = DedupIndex::open(canonical_dedup_path(root));
    let collection = SavedCollection::load(root.join("output").join("recovery_places.json"));
    Pipeline::new(store, dedup, collection, executor, fast_config())
}

#[tokio::test]
async fn test_replay_queries_collects_only_unseen_links() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();

    // A prior main run saved one place and marked it seen.
    let mut canonical = canonical_collection(dir.path());
    canonical.append(vec![record("0xa:0x1", "Already Saved")]);
    canonical.save();
    let mut dedup = DedupIndex::open(canonical_dedup_path(dir.path()));
    dedup.mark_seen(&record("0xa:0x1", "Already Saved"));
    dedup.save();

    let query_file = dir.path().join("recovery_queries.json");
    std::fs::write(&query_file, r#"["Chinese restaurants near 11229"]"#).unwrap();

    let seen_link = maps_link("0xa:0x1");
    let new_link = maps_link("0xa:0x2");
    let executor = ScriptedExecutor::new()
        .on_search(
            "Chinese restaurants near 11229",
            SearchPlan::Links(vec![seen_link, new_link.clone()]),
        )
        .on_detail(&new_link, DetailPlan::Record(record("0xa:0x2", "Recovered")));

    let mut pipeline = recovery_pipeline(dir.path(), executor);
    let merged = recovery::replay_queries(&mut pipeline, &mut canonical, &query_file, false)
        .await
        .unwrap();

    assert_eq!(merged, 1);
    assert_eq!(canonical.len(), 2);
    assert!(canonical.saved_place_ids().contains("0xa:0x2"));

    // The merge is durable and the main checkpoint namespace is untouched.
    assert_eq!(canonical_collection(dir.path()).len(), 2);
    let mut main_store = CheckpointStore::new(dir.path().join("checkpoints")).unwrap();
    assert_eq!(main_store.completed_search_count(), 0);
}

#[tokio::test]
async fn test_replay_queries_missing_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut canonical = canonical_collection(dir.path());
    let mut pipeline = recovery_pipeline(dir.path(), ScriptedExecutor::new());

    let result = recovery::replay_queries(
        &mut pipeline,
        &mut canonical,
        Path::new("/nonexistent/queries.json"),
        false,
    )
    .await;
    assert!(matches!(result, Err(HarvestError::MissingInput(_))));
}

#[tokio::test]
async fn test_seed_links_fetches_and_merges() {
    let dir = TempDir::new().unwrap();
    let link = maps_link("0xe:0x1");
    let links_file = dir.path().join("seed_links.json");
    std::fs::write(&links_file, serde_json::to_string(&vec![link.clone()]).unwrap()).unwrap();

    let executor = ScriptedExecutor::new()
        .on_detail(&link, DetailPlan::Record(record("0xe:0x1", "Seeded")));
    let mut pipeline = recovery_pipeline(dir.path(), executor);
    let mut canonical = canonical_collection(dir.path());

    let merged = recovery::seed_links(&mut pipeline, &mut canonical, &links_file)
        .await
        .unwrap();

    assert_eq!(merged, 1);
    assert_eq!(canonical.len(), 1);
    assert_eq!(pipeline.store_mut().pending_link_count(), 0);
}

#[tokio::test]
async fn test_reconcile_visits_only_seen_but_unsaved_ids() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();

    let saved_id = "0xf:0x1";
    let pending_id = "0xf:0x2";
    let lost_id = "0xf:0x3";

    let mut dedup = DedupIndex::open(canonical_dedup_path(dir.path()));
    for id in [saved_id, pending_id, lost_id] {
        dedup.mark_seen(&record(id, "Visited"));
    }
    dedup.save();

    let mut canonical = canonical_collection(dir.path());
    canonical.append(vec![record(saved_id, "Saved")]);
    canonical.save();

    let main_pending = vec![CandidateLink::new(maps_link(pending_id))];
    let recovered_path = dir.path().join("checkpoints").join("recovered_ids.json");

    let executor = ScriptedExecutor::new().on_detail(
        &place_url_for_id(lost_id),
        DetailPlan::Record(record(lost_id, "Won Back")),
    );

    let report = recovery::reconcile(
        &executor,
        &fast_config(),
        &dedup,
        &mut canonical,
        &main_pending,
        &recovered_path,
    )
    .await
    .unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.visited, 1);
    assert_eq!(report.merged, 1);
    assert!(!report.halted_early);
    assert_eq!(canonical.len(), 2);
    assert!(canonical.saved_place_ids().contains(lost_id));

    // A second pass has nothing left to do.
    let report = recovery::reconcile(
        &executor,
        &fast_config(),
        &dedup,
        &mut canonical,
        &main_pending,
        &recovered_path,
    )
    .await
    .unwrap();
    assert_eq!(report.candidates, 0);
    assert_eq!(report.merged, 0);
}

#[tokio::test]
async fn test_reconcile_halts_on_sustained_error_rate() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();

    let ids: Vec<String> = (1..=6).map(|i| format!("0xf:0x{:x}", i)).collect();
    let mut dedup = DedupIndex::open(canonical_dedup_path(dir.path()));
    let mut executor = ScriptedExecutor::new();
    for id in &ids {
        dedup.mark_seen(&record(id, "Visited"));
        executor = executor.on_detail(
            &place_url_for_id(id),
            DetailPlan::Fail("empty driver".to_string()),
        );
    }
    dedup.save();

    let mut canonical = canonical_collection(dir.path());
    let recovered_path = dir.path().join("checkpoints").join("recovered_ids.json");

    let mut config = fast_config();
    config.details_batch_size = 2;
    config.error_rate_threshold = 0.5;
    config.error_rate_batch_limit = 2;

    let report = recovery::reconcile(
        &executor,
        &config,
        &dedup,
        &mut canonical,
        &[],
        &recovered_path,
    )
    .await
    .unwrap();

    assert!(report.halted_early);
    assert_eq!(report.visited, 4);
    assert_eq!(report.errors, 4);
    assert_eq!(report.merged, 0);

    // Visited ids are checkpointed even when every item failed, so the
    // next pass only sees the two never-visited ids.
    let report = recovery::reconcile(
        &executor,
        &config,
        &dedup,
        &mut canonical,
        &[],
        &recovered_path,
    )
    .await
    .unwrap();
    assert_eq!(report.candidates, 2);
}
