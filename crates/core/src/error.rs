/// Errors raised by the catalog and download collaborators.
///
/// Carries rendered messages rather than source errors so it stays `Clone`
/// and can be copied into the run status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The catalog rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never produced a response (network, DNS, TLS, etc.).
    #[error("Request failed: {0}")]
    Request(String),

    /// The catalog answered with a non-2xx status code.
    #[error("Catalog API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The media download itself failed.
    #[error("Download failed: {0}")]
    Download(String),
}
