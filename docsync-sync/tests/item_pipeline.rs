mod common;

use docsync_core::TrackedItem;
use docsync_sync::{
    artifact::artifact_name, CancelFlag, ItemError, ItemOutcome, ItemPipeline, ItemStage,
    StateStore,
};
use tempfile::TempDir;

use common::{loc, scratch_is_empty, settings, StoredSource, World, LONG_TEXT};

const DOC: &str = "https://catalog.test/files/guide.pdf";

#[test]
fn successful_item_is_published_everywhere_and_recorded() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.fetcher.serve(DOC, LONG_TEXT);
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    let pipeline = ItemPipeline::new(world.item(), &settings.item, &cancel);
    let outcome = pipeline.process(&mut store, &loc(DOC), "2024-01-01").unwrap();

    assert!(matches!(outcome, ItemOutcome::Done));
    assert!(store.is_current(&loc(DOC), "2024-01-01"));

    let name = artifact_name(&loc(DOC));
    let local = std::fs::read_to_string(settings.item.artifacts_dir.join(&name)).unwrap();
    assert!(local.starts_with(LONG_TEXT));
    assert!(local.contains(&format!("**Source:** [{DOC}]({DOC})")));
    assert_eq!(
        world.mirror.objects.borrow().get(&name).map(Vec::as_slice),
        Some(local.as_bytes())
    );
    let sources = world.kb.named(&name);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].content, local);
    assert_eq!(sources[0].locator, loc(DOC));

    // Scratch download was handed to the converter and removed afterwards.
    let seen = world.converter.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].to_string_lossy().ends_with(".pdf"));
    assert!(!seen[0].exists());
    assert!(scratch_is_empty(&settings));
}

#[test]
fn republishing_replaces_the_knowledge_base_source() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    let name = artifact_name(&loc(DOC));
    world.kb.sources.borrow_mut().push(StoredSource {
        id: "old".to_string(),
        name: name.clone(),
        locator: loc(DOC),
        content: "stale".to_string(),
    });
    world.mirror.objects.borrow_mut().insert(name.clone(), b"stale".to_vec());
    world.fetcher.serve(DOC, LONG_TEXT);
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r2")
        .unwrap();

    let sources = world.kb.named(&name);
    assert_eq!(sources.len(), 1);
    assert_ne!(sources[0].id, "old");
    assert!(sources[0].content.starts_with(LONG_TEXT));
    assert_ne!(world.mirror.objects.borrow()[&name], b"stale".to_vec());
}

#[test]
fn tiny_download_is_a_content_failure() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.fetcher.serve(DOC, "<html>");
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r1")
        .unwrap();

    match outcome {
        ItemOutcome::Failed {
            stage,
            error: ItemError::Content(message),
            retry_count,
        } => {
            assert_eq!(stage, ItemStage::Downloading);
            assert!(message.contains("floor"), "{message}");
            assert_eq!(retry_count, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(world.converter.seen.borrow().is_empty());
    assert!(world.mirror.objects.borrow().is_empty());
    assert!(scratch_is_empty(&settings));
}

#[test]
fn short_extracted_text_is_a_content_failure() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.fetcher.serve(DOC, "0123456789");
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r1")
        .unwrap();

    assert!(matches!(
        outcome,
        ItemOutcome::Failed {
            stage: ItemStage::Converting,
            error: ItemError::Content(_),
            ..
        }
    ));
    match store.get(&loc(DOC)) {
        Some(TrackedItem::Failed(record)) => {
            assert!(record.last_error.starts_with("content: extracted 10 characters"));
        }
        other => panic!("expected failed record, got {other:?}"),
    }
    assert!(scratch_is_empty(&settings));
}

#[test]
fn missing_document_is_a_transport_failure() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r1")
        .unwrap();

    match outcome {
        ItemOutcome::Failed {
            error: ItemError::Transport(message),
            ..
        } => assert!(message.contains("404"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn failed_create_leaves_published_mirror_and_no_kb_entry() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    let name = artifact_name(&loc(DOC));
    world.kb.sources.borrow_mut().push(StoredSource {
        id: "old".to_string(),
        name: name.clone(),
        locator: loc(DOC),
        content: "previous revision".to_string(),
    });
    world.kb.fail_create.set(true);
    world.fetcher.serve(DOC, LONG_TEXT);
    let mut store = StateStore::open(&settings.state_dir);
    store.mark_processed(&loc(DOC), "r1").unwrap();
    let cancel = CancelFlag::new();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r2")
        .unwrap();

    assert!(matches!(
        outcome,
        ItemOutcome::Failed {
            stage: ItemStage::Publishing,
            error: ItemError::Publish(_),
            ..
        }
    ));
    assert!(world.kb.named(&name).is_empty());
    assert!(world.mirror.objects.borrow().contains_key(&name));
    assert!(!store.is_current(&loc(DOC), "r1"));
    assert!(matches!(store.get(&loc(DOC)), Some(TrackedItem::Failed(_))));
}

#[test]
fn mirror_failure_is_a_publish_failure() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.mirror.fail_put.set(true);
    world.fetcher.serve(DOC, LONG_TEXT);
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r1")
        .unwrap();

    match outcome {
        ItemOutcome::Failed {
            error: ItemError::Publish(message),
            ..
        } => assert!(message.starts_with("mirror:"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(world.kb.sources.borrow().is_empty());
}

#[test]
fn cancelled_item_records_nothing() {
    let home = TempDir::new().unwrap();
    let settings = settings(&home);
    let world = World::default();
    world.fetcher.serve(DOC, LONG_TEXT);
    let mut store = StateStore::open(&settings.state_dir);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let outcome = ItemPipeline::new(world.item(), &settings.item, &cancel)
        .process(&mut store, &loc(DOC), "r1")
        .unwrap();

    assert!(matches!(
        outcome,
        ItemOutcome::Interrupted {
            stage: ItemStage::Pending
        }
    ));
    assert!(store.get(&loc(DOC)).is_none());
    assert_eq!(world.fetcher.calls.get(), 0);
}
