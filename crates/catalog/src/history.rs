//! Ledger of items already downloaded.
//!
//! Stored as a sorted JSON array of `"<category>:<id>"` keys. Every
//! successful download rewrites the file through a temp file and a rename,
//! so a crash mid-write leaves the previous ledger intact.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use favsync_core::{CatalogError, Downloader, FavoriteItem};
use tokio::sync::Mutex;

/// File name of the ledger inside the config directory.
pub const HISTORY_FILE: &str = "download_history.json";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed history file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub struct DownloadHistory {
    path: PathBuf,
    keys: Mutex<BTreeSet<String>>,
}

impl DownloadHistory {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let keys = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| HistoryError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(HistoryError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), entries = keys.len(), "Loaded download history");
        Ok(Self {
            path,
            keys: Mutex::new(keys),
        })
    }

    /// Load `download_history.json` from `dir`.
    pub async fn load_from_dir(dir: &Path) -> Result<Self, HistoryError> {
        Self::load(dir.join(HISTORY_FILE)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn contains(&self, item: &FavoriteItem) -> bool {
        self.keys.lock().await.contains(&item.key())
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    /// Add `item` and persist. A no-op if it is already recorded.
    pub async fn record(&self, item: &FavoriteItem) -> Result<(), HistoryError> {
        let mut keys = self.keys.lock().await;
        if !keys.insert(item.key()) {
            return Ok(());
        }
        // Written under the lock so concurrent records never interleave.
        self.persist(&keys).await
    }

    async fn persist(&self, keys: &BTreeSet<String>) -> Result<(), HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(keys).map_err(|source| HistoryError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HistoryDownloader
// ---------------------------------------------------------------------------

/// [`Downloader`] decorator that skips items found in the ledger and
/// records the ones it downloads.
pub struct HistoryDownloader<D> {
    inner: D,
    history: Arc<DownloadHistory>,
}

impl<D> HistoryDownloader<D> {
    pub fn new(inner: D, history: Arc<DownloadHistory>) -> Self {
        Self { inner, history }
    }

    pub fn history(&self) -> &Arc<DownloadHistory> {
        &self.history
    }
}

#[async_trait]
impl<D: Downloader> Downloader for HistoryDownloader<D> {
    async fn download(&self, item: &FavoriteItem, is_collection: bool) -> Result<(), CatalogError> {
        if self.history.contains(item).await {
            tracing::info!(item_id = %item.id, category = %item.category, "Already downloaded, skipping");
            return Ok(());
        }

        self.inner.download(item, is_collection).await?;

        // The files are on disk at this point; a ledger write failure only
        // means the item may be downloaded again later.
        if let Err(e) = self.history.record(item).await {
            tracing::warn!(item_id = %item.id, error = %e, "Failed to update download history");
        }
        Ok(())
    }
}
