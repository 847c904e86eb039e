#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use favsync_core::{
    CatalogAuth, CatalogError, CatalogUser, Category, Credentials, Downloader, FavoriteItem,
    JobLock, StatusStore,
};
use favsync_worker::{BatchConfig, JobController, JobSettings, Scheduler};
use http_body_util::BodyExt;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use favsync_api::router::build_app_router;
use favsync_api::state::AppState;

/// Number of favorite tracks the stub catalog reports.
pub const TRACK_COUNT: usize = 2;

/// Catalog with a fixed list of favorite tracks and nothing else.
struct StubCatalog;

#[async_trait]
impl CatalogAuth for StubCatalog {
    async fn authenticate(
        &self,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn CatalogUser>, CatalogError> {
        Ok(Arc::new(StubCatalog))
    }
}

#[async_trait]
impl CatalogUser for StubCatalog {
    async fn list_favorites(
        &self,
        category: Category,
        _limit: usize,
        offset: usize,
    ) -> Result<Vec<FavoriteItem>, CatalogError> {
        if category != Category::Tracks || offset > 0 {
            return Ok(Vec::new());
        }
        Ok((1..=TRACK_COUNT)
            .map(|i| FavoriteItem::new(i.to_string(), Category::Tracks))
            .collect())
    }

    async fn remove_favorite(&self, _item: &FavoriteItem) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Downloader that blocks every item until the test hands out a permit.
struct GatedDownloader(Arc<Semaphore>);

#[async_trait]
impl Downloader for GatedDownloader {
    async fn download(&self, _item: &FavoriteItem, _is_collection: bool) -> Result<(), CatalogError> {
        let permit = self
            .0
            .acquire()
            .await
            .map_err(|e| CatalogError::Download(e.to_string()))?;
        permit.forget();
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub scheduler: Scheduler,
    pub status: StatusStore,
    /// Add permits to let pending downloads finish.
    pub gate: Arc<Semaphore>,
}

/// Build the full application router over stub collaborators.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack (request ID, timeout, tracing, panic
/// recovery).
pub fn build_test_app() -> TestApp {
    let gate = Arc::new(Semaphore::new(0));
    let batch = BatchConfig {
        max_workers: 1,
        chunk_size: 10,
        unit_timeout: Duration::from_secs(30),
        cooldown: Duration::ZERO,
    };
    let settings = JobSettings {
        tracks: batch.clone(),
        albums: batch.clone(),
        artists: batch,
    };

    let status = StatusStore::new();
    let controller = Arc::new(JobController::new(
        Arc::new(StubCatalog),
        Arc::new(GatedDownloader(Arc::clone(&gate))),
        Credentials::new("listener@example.com", "secret"),
        settings,
        JobLock::new(),
        status.clone(),
    ));
    let scheduler = Scheduler::new(controller, Duration::from_secs(30 * 60));

    TestApp {
        router: build_app_router(AppState::new(scheduler.clone()), Duration::from_secs(30)),
        scheduler,
        status,
        gate,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri).await
}

pub async fn post(app: Router, uri: &str) -> Response {
    send(app, Method::POST, uri).await
}

async fn send(app: Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll until no run is active, failing the test after a few seconds.
pub async fn wait_until_idle(scheduler: &Scheduler) {
    for _ in 0..500 {
        if !scheduler.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not finish");
}
