use crate::models::{CatalogCollection, CatalogTrack};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Catalog error ({kind}): {message}")]
    Api { kind: String, message: String },
    #[error("Not logged in")]
    NotLoggedIn,
}

/// The account a session token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
}

/// Remote music service consumed by the pipeline.
///
/// Login is the only operation that changes client state; everything after
/// it works on a shared reference.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns `Ok(false)` when the service rejects the token.
    async fn login_via_arl(&mut self, arl: &str) -> Result<bool, ClientError>;

    fn user(&self) -> Option<&UserInfo>;

    async fn track(&self, id: &str) -> Result<CatalogTrack, ClientError>;

    async fn album(&self, id: &str) -> Result<CatalogCollection, ClientError>;

    async fn playlist(&self, id: &str) -> Result<CatalogCollection, ClientError>;

    /// Album ids of an artist's discography, newest first.
    async fn artist_albums(&self, id: &str) -> Result<Vec<u64>, ClientError>;

    async fn track_by_isrc(&self, isrc: &str) -> Result<CatalogTrack, ClientError>;

    async fn album_by_upc(&self, upc: &str) -> Result<CatalogCollection, ClientError>;
}
