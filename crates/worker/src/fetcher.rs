//! Paginated retrieval of a user's favorites.

use favsync_core::{CatalogUser, Category, FavoriteItem};

/// Page size requested from the catalog.
pub const PAGE_SIZE: usize = 50;

/// Walks a favorites collection page by page until it is exhausted.
#[derive(Debug, Clone)]
pub struct FavoritesFetcher {
    page_size: usize,
}

impl Default for FavoritesFetcher {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

impl FavoritesFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Fetch every favorite of `category`, in catalog order.
    ///
    /// Stops at the first empty page. A failed request is logged and ends
    /// pagination early; whatever was collected so far is returned.
    pub async fn fetch_all(&self, user: &dyn CatalogUser, category: Category) -> Vec<FavoriteItem> {
        let mut favorites = Vec::new();
        let mut offset = 0;

        loop {
            match user.list_favorites(category, self.page_size, offset).await {
                Ok(page) if page.is_empty() => break,
                Ok(page) => {
                    favorites.extend(page);
                    offset += self.page_size;
                    tracing::debug!(
                        %category,
                        total = favorites.len(),
                        "Retrieved page of favorites",
                    );
                }
                Err(e) => {
                    tracing::error!(
                        %category,
                        offset,
                        error = %e,
                        "Error retrieving favorites; keeping partial list",
                    );
                    break;
                }
            }
        }

        favorites
    }
}
