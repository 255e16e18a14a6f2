mod common;

use docsync_core::{CleanupStep, RemovalRecord};
use docsync_sync::{
    artifact::artifact_name,
    state_store::{PENDING_CLEANUP_FILE, PROCESSED_FILE, REMOVALS_FILE},
    CleanupSaga, CleanupStatus, StateStore, SyncError,
};
use tempfile::TempDir;

use common::{loc, settings, StoredSource, World};

const GONE: &str = "https://catalog.test/files/retired.pdf";

fn saga<'a>(world: &'a World, settings: &docsync_sync::RunSettings) -> CleanupSaga<'a> {
    CleanupSaga {
        mirror: &world.mirror,
        knowledge_base: &world.kb,
        artifacts_dir: settings.item.artifacts_dir.clone(),
    }
}

fn removal_records(settings: &docsync_sync::RunSettings) -> Vec<RemovalRecord> {
    let contents = std::fs::read_to_string(settings.state_dir.join(REMOVALS_FILE)).unwrap();
    contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn cleanup_of_already_absent_artifacts_is_complete() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    let mut store = StateStore::open(&settings.state_dir);

    let report = saga(&world, &settings).run(&mut store, &loc(GONE))
        .expect("cleanup");

    assert_eq!(report.status, CleanupStatus::Complete);
    assert_eq!(report.steps.len(), 4);
    assert!(report.steps.values().all(|ok| *ok));
    let records = removal_records(&settings);
    assert_eq!(records.len(), 1);
    assert!(records[0].cleanup.values().all(|ok| *ok));
    assert!(store.pending_cleanup().is_empty());
}

#[test]
fn cleanup_removes_every_trace() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    let name = artifact_name(&loc(GONE));
    world.kb.sources.borrow_mut().push(StoredSource {
        id: "k1".to_string(),
        name: name.clone(),
        locator: loc(GONE),
        content: "text".to_string(),
    });
    world.kb.sources.borrow_mut().push(StoredSource {
        id: "other".to_string(),
        name: "unrelated.md".to_string(),
        locator: loc("https://catalog.test/other.pdf"),
        content: "text".to_string(),
    });
    world.mirror.objects.borrow_mut().insert(name.clone(), b"md".to_vec());
    std::fs::create_dir_all(&settings.item.artifacts_dir).unwrap();
    std::fs::write(settings.item.artifacts_dir.join(&name), "md").unwrap();
    let mut store = StateStore::open(&settings.state_dir);
    store.mark_processed(&loc(GONE), "r1").unwrap();

    let report = saga(&world, &settings).run(&mut store, &loc(GONE))
        .expect("cleanup");

    assert_eq!(report.status, CleanupStatus::Complete);
    assert!(world.kb.named(&name).is_empty());
    assert_eq!(world.kb.sources.borrow().len(), 1);
    assert!(!world.mirror.objects.borrow().contains_key(&name));
    assert!(!settings.item.artifacts_dir.join(&name).exists());
    assert!(store.get(&loc(GONE)).is_none());
    assert!(StateStore::open(&settings.state_dir).get(&loc(GONE)).is_none());
}

#[test]
fn partial_cleanup_attempts_every_step_and_is_queued() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.mirror.fail_delete.set(true);
    world.kb.fail_list.set(true);
    let mut store = StateStore::open(&settings.state_dir);
    store.mark_failed(&loc(GONE), "boom").unwrap();

    let report = saga(&world, &settings).run(&mut store, &loc(GONE))
        .expect("cleanup");

    assert_eq!(report.status, CleanupStatus::Partial);
    assert!(!report.steps[&CleanupStep::KnowledgeBase]);
    assert!(!report.steps[&CleanupStep::Mirror]);
    assert!(report.steps[&CleanupStep::LocalArtifact]);
    assert!(report.steps[&CleanupStep::StateRecord]);
    assert!(store.get(&loc(GONE)).is_none());
    assert!(StateStore::open(&settings.state_dir)
        .pending_cleanup()
        .contains_key(&loc(GONE)));

    // Downstream recovers; the retry completes and leaves the queue.
    world.mirror.fail_delete.set(false);
    world.kb.fail_list.set(false);
    let report = saga(&world, &settings).run(&mut store, &loc(GONE))
        .expect("cleanup");
    assert_eq!(report.status, CleanupStatus::Complete);
    assert!(store.pending_cleanup().is_empty());
    assert_eq!(removal_records(&settings).len(), 2);
}

#[test]
fn cleanup_with_every_step_failing_is_failed_and_queued() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.mirror.fail_delete.set(true);
    world.kb.fail_list.set(true);
    let mut store = StateStore::open(&settings.state_dir);
    store.mark_processed(&loc(GONE), "r1").unwrap();

    // A non-empty directory where a file is expected defeats both the
    // artifact removal and the rename that persists processed.json.
    let artifact = settings.item.artifacts_dir.join(artifact_name(&loc(GONE)));
    std::fs::create_dir_all(artifact.join("nested")).unwrap();
    let processed = settings.state_dir.join(PROCESSED_FILE);
    std::fs::remove_file(&processed).unwrap();
    std::fs::create_dir_all(processed.join("nested")).unwrap();

    let report = saga(&world, &settings)
        .run(&mut store, &loc(GONE))
        .expect("cleanup");

    assert_eq!(report.status, CleanupStatus::Failed);
    assert!(report.steps.values().all(|ok| !*ok));
    assert!(store.pending_cleanup().contains_key(&loc(GONE)));
    let records = removal_records(&settings);
    assert_eq!(records.len(), 1);
    assert!(records[0].cleanup.values().all(|ok| !*ok));
}

#[test]
fn unwritable_cleanup_queue_fails_the_saga() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.mirror.fail_delete.set(true);
    let queue = settings.state_dir.join(PENDING_CLEANUP_FILE);
    std::fs::create_dir_all(queue.join("nested")).unwrap();
    let mut store = StateStore::open(&settings.state_dir);

    let err = saga(&world, &settings)
        .run(&mut store, &loc(GONE))
        .expect_err("queue write must fail");

    assert!(matches!(err, SyncError::Io { .. }));
}
