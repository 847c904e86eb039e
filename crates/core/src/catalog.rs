//! Collaborator interfaces consumed by the orchestration engine.
//!
//! The engine only ever talks to the remote catalog and to the media
//! downloader through these traits. Concrete implementations live in
//! `favsync-catalog`; tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::types::{Category, Credentials, FavoriteItem};

/// Logs into the catalog and hands back an authenticated user client.
#[async_trait]
pub trait CatalogAuth: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn CatalogUser>, CatalogError>;
}

impl std::fmt::Debug for dyn CatalogUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn CatalogUser")
    }
}

/// Per-session access to the user's favorites.
#[async_trait]
pub trait CatalogUser: Send + Sync {
    /// Fetch one page of favorites. An empty page means the list is exhausted.
    async fn list_favorites(
        &self,
        category: Category,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FavoriteItem>, CatalogError>;

    /// Remove a single item from the user's favorites.
    async fn remove_favorite(&self, item: &FavoriteItem) -> Result<(), CatalogError>;
}

/// Fetches the media for a favorite and writes it to disk.
///
/// Implementations own their download-history bookkeeping and must clean up
/// after themselves if the returned future is dropped before completion.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, item: &FavoriteItem, is_collection: bool)
        -> Result<(), CatalogError>;
}
