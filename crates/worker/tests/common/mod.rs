#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use favsync_core::{
    CatalogAuth, CatalogError, CatalogUser, Category, Credentials, Downloader, FavoriteItem,
    JobLock, RunPhase, StatusStore,
};
use favsync_worker::{BatchConfig, JobController, JobSettings};
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Fake catalog
// ---------------------------------------------------------------------------

/// In-memory favorites store. Removing a favorite really removes it, so a
/// second run sees what the first one left behind.
#[derive(Default)]
pub struct FakeCatalog {
    favorites: Mutex<HashMap<Category, Vec<FavoriteItem>>>,
    fail_auth: bool,
    fail_listing: HashSet<Category>,
    panic_on_listing: bool,
    auth_calls: AtomicUsize,
    removed: Mutex<Vec<FavoriteItem>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` favorites with ids `<category>-1 ..= <category>-count`.
    pub fn with_favorites(self, category: Category, count: usize) -> Self {
        let items = (1..=count)
            .map(|i| FavoriteItem::new(format!("{category}-{i}"), category))
            .collect();
        self.favorites.lock().unwrap().insert(category, items);
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn failing_listing(mut self, category: Category) -> Self {
        self.fail_listing.insert(category);
        self
    }

    pub fn panicking_listing(mut self) -> Self {
        self.panic_on_listing = true;
        self
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<FavoriteItem> {
        self.removed.lock().unwrap().clone()
    }

    pub fn remaining(&self, category: Category) -> usize {
        self.favorites
            .lock()
            .unwrap()
            .get(&category)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl CatalogUser for FakeCatalog {
    async fn list_favorites(
        &self,
        category: Category,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FavoriteItem>, CatalogError> {
        if self.panic_on_listing {
            panic!("catalog client bug");
        }
        if self.fail_listing.contains(&category) {
            return Err(CatalogError::Api {
                status: 503,
                body: "maintenance".into(),
            });
        }
        let favorites = self.favorites.lock().unwrap();
        Ok(favorites
            .get(&category)
            .map(|items| items.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_favorite(&self, item: &FavoriteItem) -> Result<(), CatalogError> {
        if let Some(items) = self.favorites.lock().unwrap().get_mut(&item.category) {
            items.retain(|i| i.id != item.id);
        }
        self.removed.lock().unwrap().push(item.clone());
        Ok(())
    }
}

/// Auth front for a shared [`FakeCatalog`].
pub struct FakeAuth(pub Arc<FakeCatalog>);

#[async_trait]
impl CatalogAuth for FakeAuth {
    async fn authenticate(
        &self,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn CatalogUser>, CatalogError> {
        self.0.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_auth {
            return Err(CatalogError::Authentication("invalid credentials".into()));
        }
        Ok(Arc::clone(&self.0) as Arc<dyn CatalogUser>)
    }
}

// ---------------------------------------------------------------------------
// Fake downloader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Fail,
    Hang,
    Panic,
}

/// Records every call together with the run phase at call time.
#[derive(Default)]
pub struct FakeDownloader {
    behaviors: HashMap<String, Behavior>,
    gate: Option<Arc<Semaphore>>,
    status: OnceLock<StatusStore>,
    calls: Mutex<Vec<(FavoriteItem, bool)>>,
    phases: Mutex<Vec<RunPhase>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(id.to_string(), behavior);
        self
    }

    /// Every download waits for a permit on `gate` before completing.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(FavoriteItem, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<RunPhase> {
        self.phases.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, item: &FavoriteItem, is_collection: bool) -> Result<(), CatalogError> {
        self.calls
            .lock()
            .unwrap()
            .push((item.clone(), is_collection));
        if let Some(status) = self.status.get() {
            self.phases.lock().unwrap().push(status.phase());
        }

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        match self.behaviors.get(&item.id) {
            None => Ok(()),
            Some(Behavior::Fail) => Err(CatalogError::Download(format!("no stream for {}", item.id))),
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok(())
            }
            Some(Behavior::Panic) => panic!("decoder crashed on {}", item.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub downloader: Arc<FakeDownloader>,
    pub lock: JobLock,
    pub status: StatusStore,
    pub controller: Arc<JobController>,
}

/// Batch settings with the given per-category worker counts.
pub fn settings(workers: [usize; 3], chunk_size: usize) -> JobSettings {
    let batch = |max_workers| BatchConfig {
        max_workers,
        chunk_size,
        unit_timeout: Duration::from_secs(600),
        cooldown: Duration::from_secs(3),
    };
    JobSettings {
        tracks: batch(workers[0]),
        albums: batch(workers[1]),
        artists: batch(workers[2]),
    }
}

pub fn harness(catalog: FakeCatalog, downloader: FakeDownloader, settings: JobSettings) -> Harness {
    let catalog = Arc::new(catalog);
    let downloader = Arc::new(downloader);
    let lock = JobLock::new();
    let status = StatusStore::new();
    let _ = downloader.status.set(status.clone());

    let controller = JobController::new(
        Arc::new(FakeAuth(Arc::clone(&catalog))),
        Arc::clone(&downloader) as Arc<dyn Downloader>,
        Credentials::new("listener@example.com", "secret"),
        settings,
        lock.clone(),
        status.clone(),
    );

    Harness {
        catalog,
        downloader,
        lock,
        status,
        controller: Arc::new(controller),
    }
}
