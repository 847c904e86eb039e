mod common;

use assert_matches::assert_matches;
use favsync_core::{Category, RunPhase, RunStatus};
use favsync_worker::{JobError, RunOutcome};

use common::{harness, settings, Behavior, FakeCatalog, FakeDownloader};

#[tokio::test(start_paused = true)]
async fn full_run_downloads_every_category_in_order() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 12)
        .with_favorites(Category::Artists, 3);
    let h = harness(catalog, FakeDownloader::new(), settings([2, 2, 1], 10));

    let outcome = h.controller.run_once().await;

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.favorites_count.tracks, 12);
    assert_eq!(summary.favorites_count.albums, 0);
    assert_eq!(summary.favorites_count.artists, 3);
    assert_eq!(summary.category(Category::Tracks).map(|r| r.chunks), Some(2));
    assert!(summary.category(Category::Albums).is_none());
    assert_eq!(summary.category(Category::Artists).map(|r| r.chunks), Some(1));

    let status = h.status.snapshot();
    assert_eq!(status.phase, RunPhase::Idle);
    assert!(status.last_run_at.is_some());
    assert!(status.current_item.is_none());
    assert_eq!(status.stats.tracks_downloaded, 12);
    assert_eq!(status.stats.artists_downloaded, 3);
    assert_eq!(status.stats.albums_downloaded, 0);
    assert!(status.stats.last_error.is_none());

    let phases = h.downloader.phases();
    assert!(!phases.contains(&RunPhase::DownloadingAlbums));
    let first_artist = phases
        .iter()
        .position(|p| *p == RunPhase::DownloadingArtists)
        .expect("artists were downloaded");
    assert!(phases[..first_artist]
        .iter()
        .all(|p| *p == RunPhase::DownloadingTracks));

    assert_eq!(h.catalog.removed().len(), 15);
    assert!(!h.lock.is_running());
}

#[tokio::test(start_paused = true)]
async fn collections_are_downloaded_as_collections() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 1)
        .with_favorites(Category::Albums, 1)
        .with_favorites(Category::Artists, 1);
    let h = harness(catalog, FakeDownloader::new(), settings([1, 1, 1], 10));

    h.controller.run_once().await;

    let calls = h.downloader.calls();
    assert_eq!(calls.len(), 3);
    for (item, is_collection) in calls {
        assert_eq!(is_collection, item.category != Category::Tracks, "{}", item.id);
    }
}

#[tokio::test(start_paused = true)]
async fn failed_downloads_stay_favorited() {
    let catalog = FakeCatalog::new().with_favorites(Category::Tracks, 5);
    let downloader = FakeDownloader::new().with("tracks-3", Behavior::Fail);
    let h = harness(catalog, downloader, settings([2, 1, 1], 10));

    h.controller.run_once().await;

    let stats = h.status.stats();
    assert_eq!(stats.tracks_downloaded, 4);
    assert_eq!(stats.tracks_failed, 1);
    // Ordinary download errors are counted but not surfaced as last_error.
    assert!(stats.last_error.is_none());

    assert!(h.catalog.removed().iter().all(|i| i.id != "tracks-3"));
    assert_eq!(h.catalog.remaining(Category::Tracks), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_item_is_reported_as_last_error() {
    let catalog = FakeCatalog::new().with_favorites(Category::Artists, 3);
    let downloader = FakeDownloader::new().with("artists-2", Behavior::Hang);
    let h = harness(catalog, downloader, settings([1, 1, 3], 10));

    let outcome = h.controller.run_once().await;

    assert_matches!(outcome, RunOutcome::Completed(_));
    let stats = h.status.stats();
    assert_eq!(stats.artists_downloaded, 2);
    assert_eq!(stats.artists_failed, 1);
    let last_error = stats.last_error.expect("timeout recorded");
    assert!(last_error.contains("artists-2"), "{last_error}");
    assert!(last_error.contains("timed out"), "{last_error}");
    assert_eq!(h.status.phase(), RunPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn panicking_download_does_not_abort_the_run() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 3)
        .with_favorites(Category::Albums, 2);
    let downloader = FakeDownloader::new().with("tracks-1", Behavior::Panic);
    let h = harness(catalog, downloader, settings([1, 1, 1], 10));

    let outcome = h.controller.run_once().await;

    assert_matches!(outcome, RunOutcome::Completed(_));
    let stats = h.status.stats();
    assert_eq!(stats.tracks_failed, 1);
    assert_eq!(stats.tracks_downloaded, 2);
    assert_eq!(stats.albums_downloaded, 2);
    assert!(stats.last_error.is_some_and(|e| e.contains("panicked")));
}

#[tokio::test]
async fn auth_failure_marks_error_and_releases_lock() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 4)
        .failing_auth();
    let h = harness(catalog, FakeDownloader::new(), settings([1, 1, 1], 10));

    let outcome = h.controller.run_once().await;

    assert_matches!(outcome, RunOutcome::Failed(JobError::Auth(_)));
    let status = h.status.snapshot();
    assert_eq!(status.phase, RunPhase::Error);
    assert!(status.last_run_at.is_none());
    assert!(status
        .stats
        .last_error
        .is_some_and(|e| e.contains("Catalog login failed")));
    assert!(h.downloader.calls().is_empty());
    assert!(!h.lock.is_running());
}

#[tokio::test]
async fn panic_outside_the_batch_is_contained() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 1)
        .panicking_listing();
    let h = harness(catalog, FakeDownloader::new(), settings([1, 1, 1], 10));

    let outcome = h.controller.run_once().await;

    assert_matches!(outcome, RunOutcome::Failed(JobError::Panicked(msg)) if msg.contains("catalog client bug"));
    assert_eq!(h.status.phase(), RunPhase::Error);
    assert!(!h.lock.is_running());

    // The lock is usable again.
    assert_matches!(h.controller.run_once().await, RunOutcome::Failed(_));
}

#[tokio::test]
async fn listing_failure_truncates_only_that_category() {
    let catalog = FakeCatalog::new()
        .with_favorites(Category::Tracks, 2)
        .with_favorites(Category::Albums, 2)
        .failing_listing(Category::Albums);
    let h = harness(catalog, FakeDownloader::new(), settings([1, 1, 1], 10));

    let outcome = h.controller.run_once().await;

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.favorites_count.tracks, 2);
    assert_eq!(summary.favorites_count.albums, 0);
    assert_eq!(h.status.stats().tracks_downloaded, 2);
}

#[tokio::test]
async fn busy_lock_skips_without_touching_status() {
    let catalog = FakeCatalog::new().with_favorites(Category::Tracks, 2);
    let h = harness(catalog, FakeDownloader::new(), settings([1, 1, 1], 10));

    let _held = h.lock.try_acquire().expect("lock is free");
    let outcome = h.controller.run_once().await;

    assert_matches!(outcome, RunOutcome::Skipped);
    assert!(h.controller.try_start().is_none());
    assert_eq!(h.status.snapshot(), RunStatus::default());
    assert_eq!(h.catalog.auth_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn stats_accumulate_across_runs() {
    let catalog = FakeCatalog::new().with_favorites(Category::Tracks, 3);
    let downloader = FakeDownloader::new().with("tracks-2", Behavior::Fail);
    let h = harness(catalog, downloader, settings([1, 1, 1], 10));

    h.controller.run_once().await;
    let first = h.status.snapshot();
    assert_eq!(first.stats.tracks_downloaded, 2);
    assert_eq!(first.stats.tracks_failed, 1);

    // Only the failed favorite is left for the second run.
    let outcome = h.controller.run_once().await;
    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.favorites_count.tracks, 1);

    let second = h.status.snapshot();
    assert_eq!(second.stats.tracks_downloaded, 2);
    assert_eq!(second.stats.tracks_failed, 2);
    assert!(second.last_run_at >= first.last_run_at);
    assert_eq!(h.catalog.auth_calls(), 2);
}
