use super::*;
use crate::testing::*;
use plexwatch_models::{MediaType, Provider, TrackingStatus};
use std::sync::Arc;
use tokio::sync::Notify;

fn inception_entry() -> WatchlistEntry {
    WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
        .with_external_id(Some(Provider::Imdb), "tt1375666")
}

fn library_with_inception() -> MockLibrary {
    MockLibrary::new().with_item(movie("1234", "Inception", 2010, "1").with_external_id(imdb("tt1375666")))
}

fn runner(feed: StaticFeed, library: MockLibrary, store: Arc<MemoryStore>) -> CycleRunner {
    CycleRunner::new(
        vec![Arc::new(feed) as Arc<dyn FeedSource>],
        Arc::new(library),
        store,
        MatchSettings::default(),
    )
}

#[tokio::test]
async fn test_new_title_in_library_is_announced() {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MockNotifier::default());
    let runner = runner(
        StaticFeed::new(vec![inception_entry()]),
        library_with_inception(),
        store.clone(),
    )
    .with_notifier(notifier.clone());

    let outcome = runner.run_cycle().await.unwrap().expect("cycle ran");

    assert_eq!(outcome.newly_available.len(), 1);
    let entry = &outcome.newly_available[0];
    assert_eq!(entry.title, "Inception");
    assert_eq!(entry.status, TrackingStatus::Added);
    assert!(entry.added_at.is_some());
    assert!(outcome.pending_snapshot.is_empty());
    assert!(outcome.notified);
    assert_eq!(outcome.stats.resolved_by_tier.get("index"), Some(&1));

    let saved = store.entries();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].is_added());

    let payloads = notifier.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].newly_available[0].external_id.as_deref(), Some("tt1375666"));
    assert!(payloads[0].pending_snapshot.is_empty());
}

#[tokio::test]
async fn test_second_cycle_does_not_reannounce() {
    let store = Arc::new(MemoryStore::default());
    let runner = runner(
        StaticFeed::new(vec![inception_entry(), WatchlistEntry::new("Heat", Some(1995), MediaType::Movie)]),
        library_with_inception(),
        store.clone(),
    );

    let first = runner.run_cycle().await.unwrap().expect("cycle ran");
    let second = runner.run_cycle().await.unwrap().expect("cycle ran");

    assert_eq!(first.newly_available.len(), 1);
    assert!(second.newly_available.is_empty());
    assert_eq!(second.pending_snapshot.len(), 1);
    assert_eq!(second.pending_snapshot[0].title, "Heat");
    assert_eq!(store.entries().len(), 2);
}

#[tokio::test]
async fn test_persist_failure_sends_nothing() {
    let store = Arc::new(MemoryStore::failing_save());
    let notifier = Arc::new(MockNotifier::default());
    let runner = runner(
        StaticFeed::new(vec![inception_entry()]),
        library_with_inception(),
        store.clone(),
    )
    .with_notifier(notifier.clone());

    let result = runner.run_cycle().await;

    assert!(result.is_err());
    assert_eq!(store.save_count(), 1);
    assert!(notifier.payloads().is_empty());
    // The failed cycle releases the guard so the next trigger can retry
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_dry_run_skips_persist_and_notify() {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MockNotifier::default());
    let runner = runner(
        StaticFeed::new(vec![inception_entry()]),
        library_with_inception(),
        store.clone(),
    )
    .with_notifier(notifier.clone())
    .with_dry_run(true);

    let outcome = runner.run_cycle().await.unwrap().expect("cycle ran");

    assert!(outcome.dry_run);
    assert_eq!(outcome.newly_available.len(), 1);
    assert_eq!(store.save_count(), 0);
    assert!(notifier.payloads().is_empty());
}

#[tokio::test]
async fn test_overlapping_cycle_is_dropped() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(MemoryStore::default());
    let runner = runner(
        StaticFeed::gated(vec![inception_entry()], gate.clone()),
        library_with_inception(),
        store.clone(),
    );

    let (first, second, _) = tokio::join!(runner.run_cycle(), runner.run_cycle(), async {
        gate.notify_one();
    });

    assert!(first.unwrap().is_some());
    assert!(second.unwrap().is_none());
    assert_eq!(store.save_count(), 1);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_removed_title_goes_back_to_pending_and_is_kept() {
    let store = Arc::new(MemoryStore::default());

    let first = runner(
        StaticFeed::new(vec![inception_entry()]),
        library_with_inception(),
        store.clone(),
    );
    first.run_cycle().await.unwrap().expect("cycle ran");
    assert!(store.entries()[0].is_added());

    // Inception left both the feed and the library
    let library = MockLibrary::new().with_item(movie("99", "Heat", 1995, "1"));
    let second = runner(StaticFeed::new(Vec::new()), library, store.clone());
    let outcome = second.run_cycle().await.unwrap().expect("cycle ran");

    let saved = store.entries();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status, TrackingStatus::Pending);
    assert_eq!(saved[0].added_at, None);
    assert_eq!(outcome.stats.regressed, 1);
    assert_eq!(outcome.pending_snapshot.len(), 1);
}

#[tokio::test]
async fn test_batches_resolve_every_entry() {
    let entries: Vec<WatchlistEntry> = (0..23)
        .map(|n| WatchlistEntry::new(format!("Missing Title {}", n), Some(2000), MediaType::Movie))
        .collect();
    let store = Arc::new(MemoryStore::default());
    let runner = runner(StaticFeed::new(entries), library_with_inception(), store.clone()).with_batch_size(50);

    let outcome = runner.run_cycle().await.unwrap().expect("cycle ran");

    assert_eq!(outcome.stats.entries, 23);
    assert_eq!(outcome.stats.unresolved, 23);
    assert_eq!(outcome.pending_snapshot.len(), 23);
    assert_eq!(store.entries().len(), 23);
}
