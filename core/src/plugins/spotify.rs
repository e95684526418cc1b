use super::{Plugin, PluginError};
use crate::auth::Session;
use crate::listener::Listener;
use crate::models::{CatalogTrack, DownloadIntent, IntentSource, ItemType};
use crate::settings::Settings;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::{debug, info};
use rspotify::{
    model::{AlbumId, FullTrack, PlayableItem, PlaylistId, TrackId},
    prelude::*,
    ClientCredsSpotify, Credentials,
};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use url::Url;

pub const SPOTIFY_PLUGIN: &str = "spotify";

/// Extracts the item type and Spotify ID from an `open.spotify.com` URL or a
/// `spotify:type:id` URI.
pub fn parse_spotify_link(link: &str) -> Option<(ItemType, String)> {
    let (kind, id) = if let Some(uri) = link.strip_prefix("spotify:") {
        let mut parts = uri.split(':');
        (parts.next()?.to_string(), parts.next()?.to_string())
    } else {
        let url = Url::parse(link).ok()?;
        if url.host_str() != Some("open.spotify.com") {
            return None;
        }
        let mut segments = url
            .path_segments()?
            .filter(|s| !s.is_empty() && !s.starts_with("intl-"));
        (segments.next()?.to_string(), segments.next()?.to_string())
    };

    let item_type = match kind.as_str() {
        "track" => ItemType::Track,
        "album" => ItemType::Album,
        "playlist" => ItemType::Playlist,
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }
    Some((item_type, id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpotifyConfig {
    client_id: String,
    client_secret: String,
}

/// Reads `<config>/spotify/config.json`, if it holds usable credentials.
fn config_file_credentials(config_folder: &Path) -> Option<Credentials> {
    let path = config_folder.join("spotify").join("config.json");
    let content = std::fs::read_to_string(path).ok()?;
    let config: SpotifyConfig = serde_json::from_str(&content).ok()?;
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return None;
    }
    Some(Credentials::new(&config.client_id, &config.client_secret))
}

/// Converts Spotify tracks, albums and playlists by ISRC/UPC lookups.
pub struct SpotifyPlugin {
    config_folder: PathBuf,
    spotify: Option<ClientCredsSpotify>,
}

impl SpotifyPlugin {
    pub fn new(config_folder: impl Into<PathBuf>) -> Self {
        Self {
            config_folder: config_folder.into(),
            spotify: None,
        }
    }

    fn client(&self) -> Result<&ClientCredsSpotify, PluginError> {
        self.spotify
            .as_ref()
            .ok_or_else(|| PluginError::NotConfigured("setup was not run".to_string()))
    }

    /// Looks every track up by ISRC. Tracks without a match are reported and skipped.
    async fn match_tracks(
        &self,
        session: &Session,
        tracks: Vec<FullTrack>,
        listener: &dyn Listener,
    ) -> Vec<CatalogTrack> {
        let mut matched = Vec::new();
        for track in tracks {
            let Some(isrc) = track.external_ids.get("isrc") else {
                listener.send(
                    "conversionSkip",
                    Some(json!({"title": track.name, "reason": "no ISRC"})),
                );
                continue;
            };
            match session.client().track_by_isrc(isrc).await {
                Ok(found) => matched.push(found),
                Err(e) => {
                    debug!("No match for {} ({}): {}", track.name, isrc, e);
                    listener.send(
                        "conversionSkip",
                        Some(json!({"title": track.name, "reason": e.to_string()})),
                    );
                }
            }
        }
        matched
    }

    async fn convert_track(&self, session: &Session, foreign_id: &str) -> Result<CatalogTrack, PluginError> {
        let id = TrackId::from_id(foreign_id).map_err(|_| PluginError::InvalidId(foreign_id.to_string()))?;
        let track = self.client()?.track(id, None).await?;
        let isrc = track
            .external_ids
            .get("isrc")
            .ok_or_else(|| PluginError::NoMatch(track.name.clone()))?;
        Ok(session.client().track_by_isrc(isrc).await?)
    }

    async fn convert_album(
        &self,
        session: &Session,
        intent: &DownloadIntent,
        foreign_id: &str,
        listener: &dyn Listener,
    ) -> Result<DownloadIntent, PluginError> {
        let spotify = self.client()?;
        let id = AlbumId::from_id(foreign_id).map_err(|_| PluginError::InvalidId(foreign_id.to_string()))?;
        let album = spotify.album(id, None).await?;

        if let Some(upc) = album.external_ids.get("upc") {
            match session.client().album_by_upc(upc).await {
                Ok(found) => return Ok(DownloadIntent::collection(ItemType::Album, found, intent.bitrate)),
                Err(e) => debug!("UPC {} not found, matching tracks one by one: {}", upc, e),
            }
        }

        let ids: Vec<TrackId<'static>> = album.tracks.items.iter().filter_map(|t| t.id.clone()).collect();
        let mut full_tracks = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(50) {
            full_tracks.extend(spotify.tracks(chunk.iter().cloned(), None).await?);
        }

        let artist = album.artists.first().map(|a| a.name.clone()).unwrap_or_default();
        let tracks = self.match_tracks(session, full_tracks, listener).await;
        rebuilt(intent, album.name, artist, tracks)
    }

    async fn convert_playlist(
        &self,
        session: &Session,
        intent: &DownloadIntent,
        foreign_id: &str,
        listener: &dyn Listener,
    ) -> Result<DownloadIntent, PluginError> {
        let spotify = self.client()?;
        let id = PlaylistId::from_id(foreign_id).map_err(|_| PluginError::InvalidId(foreign_id.to_string()))?;
        let playlist = spotify.playlist(id.clone(), None, None).await?;

        let mut full_tracks = Vec::new();
        let mut stream = spotify.playlist_items(id, None, None);
        while let Some(item) = stream.try_next().await? {
            if let Some(PlayableItem::Track(track)) = item.track {
                full_tracks.push(track);
            }
        }

        let owner = playlist
            .owner
            .display_name
            .unwrap_or_else(|| playlist.owner.id.to_string());
        let tracks = self.match_tracks(session, full_tracks, listener).await;
        rebuilt(intent, playlist.name, owner, tracks)
    }
}

/// A collection assembled from individually matched tracks. It has no
/// primary-catalog ID of its own, so the foreign ID stays as `catalog_id`.
fn rebuilt(
    intent: &DownloadIntent,
    title: String,
    artist: String,
    tracks: Vec<CatalogTrack>,
) -> Result<DownloadIntent, PluginError> {
    if tracks.is_empty() {
        return Err(PluginError::NoMatch(title));
    }
    Ok(DownloadIntent {
        uuid: intent.uuid.clone(),
        item_type: intent.item_type,
        catalog_id: intent.catalog_id.clone(),
        title,
        artist,
        bitrate: intent.bitrate,
        tracks,
        source: IntentSource::Primary,
    })
}

#[async_trait]
impl Plugin for SpotifyPlugin {
    fn name(&self) -> &str {
        SPOTIFY_PLUGIN
    }

    async fn setup(&mut self) -> Result<(), PluginError> {
        let creds = Credentials::from_env()
            .or_else(|| config_file_credentials(&self.config_folder))
            .ok_or_else(|| {
                PluginError::NotConfigured(
                    "Missing RSPOTIFY_CLIENT_ID/RSPOTIFY_CLIENT_SECRET or spotify/config.json".to_string(),
                )
            })?;

        let spotify = ClientCredsSpotify::new(creds);
        spotify.request_token().await?;
        info!("Spotify client ready");
        self.spotify = Some(spotify);
        Ok(())
    }

    async fn convert(
        &self,
        session: &Session,
        intent: DownloadIntent,
        _settings: &Settings,
        listener: &dyn Listener,
    ) -> Result<DownloadIntent, PluginError> {
        let foreign_id = match &intent.source {
            IntentSource::Primary => return Ok(intent),
            IntentSource::Convertible { foreign_id, .. } => foreign_id.clone(),
        };

        match intent.item_type {
            ItemType::Track => {
                let track = self.convert_track(session, &foreign_id).await?;
                Ok(DownloadIntent::single(track, intent.bitrate))
            }
            ItemType::Album => self.convert_album(session, &intent, &foreign_id, listener).await,
            ItemType::Playlist => self.convert_playlist(session, &intent, &foreign_id, listener).await,
        }
    }
}
