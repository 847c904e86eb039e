//! REST client for the Qobuz catalog API.
//!
//! [`QobuzApi`] performs the login and hands back a [`QobuzSession`] bound
//! to the returned user token. All favorites calls go through the session.

use std::sync::Arc;

use async_trait::async_trait;
use favsync_core::{CatalogAuth, CatalogError, CatalogUser, Category, Credentials, FavoriteItem};
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::Value;

/// Default base URL of the catalog API.
pub const DEFAULT_API_URL: &str = "https://www.qobuz.com/api.json/0.2";

const APP_ID_HEADER: &str = "X-App-Id";
const TOKEN_HEADER: &str = "X-User-Auth-Token";

/// Unauthenticated API client. Implements [`CatalogAuth`].
#[derive(Clone)]
pub struct QobuzApi {
    client: reqwest::Client,
    api_url: String,
    app_id: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user_auth_token: String,
}

impl QobuzApi {
    pub fn new(api_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, app_id)
    }

    /// Reuse an existing [`reqwest::Client`] (timeouts, connection pool).
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }

    /// Log in and return the session token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, CatalogError> {
        let password = password_digest(&credentials.password);
        let response = self
            .client
            .get(format!("{}/user/login", self.api_url))
            .query(&[
                ("email", credentials.email.as_str()),
                ("password", password.as_str()),
                ("app_id", self.app_id.as_str()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            let body = read_body(response).await;
            return Err(CatalogError::Authentication(format!(
                "invalid credentials or app id ({status}): {body}"
            )));
        }

        let login: LoginResponse = parse_response(response).await?;
        Ok(login.user_auth_token)
    }
}

#[async_trait]
impl CatalogAuth for QobuzApi {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn CatalogUser>, CatalogError> {
        let token = self.login(credentials).await?;
        tracing::info!(email = %credentials.email, "Logged in to catalog");
        Ok(Arc::new(QobuzSession {
            api: self.clone(),
            token,
        }))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Authenticated session. Implements [`CatalogUser`].
pub struct QobuzSession {
    api: QobuzApi,
    token: String,
}

impl QobuzSession {
    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api
            .client
            .get(format!("{}/{}", self.api.api_url, path))
            .header(APP_ID_HEADER, &self.api.app_id)
            .header(TOKEN_HEADER, &self.token)
    }
}

#[async_trait]
impl CatalogUser for QobuzSession {
    async fn list_favorites(
        &self,
        category: Category,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FavoriteItem>, CatalogError> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let response = self
            .get("favorite/getUserFavorites")
            .query(&[
                ("type", category.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let body: Value = parse_response(response).await?;
        parse_favorites_page(&body, category)
    }

    async fn remove_favorite(&self, item: &FavoriteItem) -> Result<(), CatalogError> {
        let ids_param = format!("{}_ids", item.category.singular());
        let response = self
            .get("favorite/delete")
            .query(&[(ids_param.as_str(), item.id.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        check_status(response).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase hex MD5 of the password, as the login endpoint expects.
pub fn password_digest(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}

/// Extract the items of one favorites page.
///
/// A missing `<category>.items` is an empty page. Items without a usable
/// `id` are skipped.
pub fn parse_favorites_page(
    body: &Value,
    category: Category,
) -> Result<Vec<FavoriteItem>, CatalogError> {
    let Some(section) = body.get(category.as_str()) else {
        return Ok(Vec::new());
    };
    let items = match section.get("items") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(CatalogError::Decode(format!(
                "{category}.items is not an array: {other}"
            )))
        }
    };

    let mut favorites = Vec::with_capacity(items.len());
    for raw in items {
        let id = match raw.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                tracing::warn!(%category, item = %raw, "Favorite without id, skipping");
                continue;
            }
        };
        let title = raw
            .get("title")
            .or_else(|| raw.get("name"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let mut item = FavoriteItem::new(id, category);
        if let Some(title) = title {
            item = item.with_title(title);
        }
        favorites.push(item);
    }
    Ok(favorites)
}

fn request_error(e: reqwest::Error) -> CatalogError {
    CatalogError::Request(e.to_string())
}

async fn read_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}

/// Ensure a success status, otherwise turn the response into
/// [`CatalogError::Api`] carrying the body text.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Api {
            status: status.as_u16(),
            body: read_body(response).await,
        });
    }
    Ok(response)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CatalogError> {
    let response = ensure_success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| CatalogError::Decode(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> Result<(), CatalogError> {
    ensure_success(response).await?;
    Ok(())
}
