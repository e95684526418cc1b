//! In-memory collaborators shared by the unit tests.

use crate::auth::{Authenticator, Session, TokenPrompt};
use crate::client::{CatalogClient, ClientError, UserInfo};
use crate::credentials::{CredentialStore, SessionCredential};
use crate::models::{CatalogCollection, CatalogTrack};
use async_trait::async_trait;
use std::collections::HashMap;
use tempfile::TempDir;

pub(crate) const VALID_ARL: &str = "valid-arl";

pub(crate) fn track(id: u64, title: &str) -> CatalogTrack {
    CatalogTrack {
        id,
        title: title.to_string(),
        artist: "Daft Punk".to_string(),
        album: None,
        isrc: Some(format!("ISRC{:08}", id)),
    }
}

pub(crate) fn album(id: u64, title: &str, track_ids: &[u64]) -> CatalogCollection {
    CatalogCollection {
        id,
        title: title.to_string(),
        artist: "Daft Punk".to_string(),
        tracks: track_ids
            .iter()
            .map(|t| track(*t, &format!("Track {}", t)))
            .collect(),
    }
}

fn no_data() -> ClientError {
    ClientError::Api {
        kind: "DataException".to_string(),
        message: "no data".to_string(),
    }
}

/// Catalog backed by hash maps; accepts only [`VALID_ARL`].
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeCatalog {
    tracks: HashMap<String, CatalogTrack>,
    albums: HashMap<String, CatalogCollection>,
    artists: HashMap<String, Vec<u64>>,
    user: Option<UserInfo>,
}

impl FakeCatalog {
    pub(crate) fn add_track(&mut self, track: CatalogTrack) {
        self.tracks.insert(track.id.to_string(), track);
    }

    pub(crate) fn add_album(&mut self, album: CatalogCollection) {
        self.albums.insert(album.id.to_string(), album);
    }

    pub(crate) fn add_artist(&mut self, id: &str, albums: Vec<u64>) {
        self.artists.insert(id.to_string(), albums);
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn login_via_arl(&mut self, arl: &str) -> Result<bool, ClientError> {
        if arl != VALID_ARL {
            return Ok(false);
        }
        self.user = Some(UserInfo {
            id: 1,
            name: "tester".to_string(),
        });
        Ok(true)
    }

    fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    async fn track(&self, id: &str) -> Result<CatalogTrack, ClientError> {
        self.tracks.get(id).cloned().ok_or_else(no_data)
    }

    async fn album(&self, id: &str) -> Result<CatalogCollection, ClientError> {
        self.albums.get(id).cloned().ok_or_else(no_data)
    }

    async fn playlist(&self, id: &str) -> Result<CatalogCollection, ClientError> {
        self.albums.get(id).cloned().ok_or_else(no_data)
    }

    async fn artist_albums(&self, id: &str) -> Result<Vec<u64>, ClientError> {
        self.artists.get(id).cloned().ok_or_else(no_data)
    }

    async fn track_by_isrc(&self, isrc: &str) -> Result<CatalogTrack, ClientError> {
        self.tracks
            .values()
            .find(|t| t.isrc.as_deref() == Some(isrc))
            .cloned()
            .ok_or_else(no_data)
    }

    async fn album_by_upc(&self, _upc: &str) -> Result<CatalogCollection, ClientError> {
        Err(no_data())
    }
}

struct NoPrompt;

#[async_trait]
impl TokenPrompt for NoPrompt {
    async fn request_token(&mut self) -> std::io::Result<Option<String>> {
        Ok(None)
    }
}

/// Authenticates `catalog` through the regular path with a pre-stored token.
pub(crate) async fn session_with(catalog: FakeCatalog) -> Session {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::in_folder(dir.path());
    store.save(&SessionCredential::new(VALID_ARL)).unwrap();
    Authenticator::new(store, NoPrompt)
        .ensure_session(catalog)
        .await
        .unwrap()
}
