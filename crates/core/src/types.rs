use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A favorites category on the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tracks,
    Albums,
    Artists,
}

impl Category {
    /// Categories in processing order.
    pub const ALL: [Category; 3] = [Category::Tracks, Category::Albums, Category::Artists];

    /// Plural name used by the catalog API and the dashboard.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tracks => "tracks",
            Category::Albums => "albums",
            Category::Artists => "artists",
        }
    }

    /// Singular name, as used in catalog URLs (`/track/{id}`).
    pub fn singular(self) -> &'static str {
        match self {
            Category::Tracks => "track",
            Category::Albums => "album",
            Category::Artists => "artist",
        }
    }

    /// Whether items of this category expand to more than one track when
    /// downloaded. Albums and artist discographies are collections.
    pub fn is_collection(self) -> bool {
        !matches!(self, Category::Tracks)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FavoriteItem
// ---------------------------------------------------------------------------

/// One entry of a user's favorites list.
///
/// The identifier is opaque: numeric catalog ids are stringified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl FavoriteItem {
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Stable key combining category and id, e.g. `albums:0060254735180`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.category, self.id)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Catalog account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
