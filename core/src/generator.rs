use crate::auth::Session;
use crate::client::ClientError;
use crate::listener::Listener;
use crate::models::{Bitrate, DownloadIntent, ItemType};
use crate::plugins::spotify::{parse_spotify_link, SPOTIFY_PLUGIN};
use crate::plugins::PluginRegistry;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::json;
use thiserror::Error;
use url::Url;

/// A single link that could not be turned into download intents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{link}: {message}")]
pub struct GenerationError {
    pub link: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(link: &str, message: impl Into<String>) -> Self {
        Self {
            link: link.to_string(),
            message: message.into(),
        }
    }
}

/// Maps one link to the download intents it stands for.
#[async_trait]
pub trait IntentGenerator: Send + Sync {
    async fn generate(
        &self,
        session: &Session,
        link: &str,
        bitrate: Bitrate,
        plugins: &PluginRegistry,
        listener: &dyn Listener,
    ) -> Result<Vec<DownloadIntent>, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Track(String),
    Album(String),
    Playlist(String),
    Artist(String),
    /// A link into a secondary catalog, handled by `plugin`.
    Foreign {
        plugin: &'static str,
        item_type: ItemType,
        id: String,
    },
}

/// Recognizes Deezer and Spotify links. The error is the user-facing reason.
pub fn parse_link(link: &str) -> Result<LinkTarget, &'static str> {
    if let Some((item_type, id)) = parse_spotify_link(link) {
        return Ok(LinkTarget::Foreign {
            plugin: SPOTIFY_PLUGIN,
            item_type,
            id,
        });
    }

    let url = Url::parse(link.trim()).map_err(|_| "Not a valid link")?;
    match url.host_str() {
        Some("www.deezer.com") | Some("deezer.com") => {}
        Some("link.deezer.com") | Some("deezer.page.link") => {
            return Err("Short links are not supported, use the full deezer.com link");
        }
        _ => return Err("Link not recognized"),
    }

    // Skip the optional locale segment (`/en/track/1`).
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let position = segments
        .iter()
        .position(|s| matches!(*s, "track" | "album" | "playlist" | "artist"))
        .ok_or("Link not recognized")?;
    let id = segments
        .get(position + 1)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .ok_or("Link not recognized")?
        .to_string();

    Ok(match segments[position] {
        "track" => LinkTarget::Track(id),
        "album" => LinkTarget::Album(id),
        "playlist" => LinkTarget::Playlist(id),
        _ => LinkTarget::Artist(id),
    })
}

/// Resolves links against the primary catalog. Foreign links become
/// convertible intents without any network call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkGenerator;

impl LinkGenerator {
    async fn artist_discography(
        &self,
        session: &Session,
        link: &str,
        id: &str,
        bitrate: Bitrate,
        listener: &dyn Listener,
    ) -> Result<Vec<DownloadIntent>, GenerationError> {
        let to_error = |e: ClientError| GenerationError::new(link, e.to_string());
        listener.send("startAddingArtist", Some(json!({ "id": id })));

        let album_ids = session.client().artist_albums(id).await.map_err(to_error)?;
        let mut intents = Vec::with_capacity(album_ids.len());
        for album_id in album_ids {
            match session.client().album(&album_id.to_string()).await {
                Ok(album) => intents.push(DownloadIntent::collection(ItemType::Album, album, bitrate)),
                Err(e) => {
                    warn!("Skipping album {} of artist {}: {}", album_id, id, e);
                    listener.send(
                        "albumSkip",
                        Some(json!({ "link": link, "id": album_id, "message": e.to_string() })),
                    );
                }
            }
        }

        listener.send(
            "finishAddingArtist",
            Some(json!({ "id": id, "albums": intents.len() })),
        );
        Ok(intents)
    }
}

#[async_trait]
impl IntentGenerator for LinkGenerator {
    async fn generate(
        &self,
        session: &Session,
        link: &str,
        bitrate: Bitrate,
        plugins: &PluginRegistry,
        listener: &dyn Listener,
    ) -> Result<Vec<DownloadIntent>, GenerationError> {
        let target = parse_link(link).map_err(|message| GenerationError::new(link, message))?;
        debug!("{} -> {:?}", link, target);
        let to_error = |e: ClientError| GenerationError::new(link, e.to_string());

        match target {
            LinkTarget::Track(id) => {
                let track = session.client().track(&id).await.map_err(to_error)?;
                Ok(vec![DownloadIntent::single(track, bitrate)])
            }
            LinkTarget::Album(id) => {
                let album = session.client().album(&id).await.map_err(to_error)?;
                Ok(vec![DownloadIntent::collection(ItemType::Album, album, bitrate)])
            }
            LinkTarget::Playlist(id) => {
                let playlist = session.client().playlist(&id).await.map_err(to_error)?;
                Ok(vec![DownloadIntent::collection(ItemType::Playlist, playlist, bitrate)])
            }
            LinkTarget::Artist(id) => {
                self.artist_discography(session, link, &id, bitrate, listener)
                    .await
            }
            LinkTarget::Foreign {
                plugin,
                item_type,
                id,
            } => {
                if !plugins.contains(plugin) {
                    debug!("Plugin '{}' is not registered, {} will fail to convert", plugin, link);
                }
                Ok(vec![DownloadIntent::convertible(plugin, item_type, &id, bitrate)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;
    use crate::models::IntentSource;
    use crate::test_support::{album, session_with, track, FakeCatalog};

    #[test]
    fn test_parse_deezer_links() {
        assert_eq!(
            parse_link("https://www.deezer.com/track/3135556"),
            Ok(LinkTarget::Track("3135556".to_string()))
        );
        assert_eq!(
            parse_link("https://www.deezer.com/en/album/302127?utm=x"),
            Ok(LinkTarget::Album("302127".to_string()))
        );
        assert_eq!(
            parse_link("https://deezer.com/us/playlist/908622995/"),
            Ok(LinkTarget::Playlist("908622995".to_string()))
        );
        assert_eq!(
            parse_link("https://www.deezer.com/fr/artist/27"),
            Ok(LinkTarget::Artist("27".to_string()))
        );
    }

    #[test]
    fn test_parse_foreign_and_invalid_links() {
        assert_eq!(
            parse_link("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            Ok(LinkTarget::Foreign {
                plugin: "spotify",
                item_type: ItemType::Track,
                id: "4uLU6hMCjMI75M1A2tKUQC".to_string(),
            })
        );
        assert_eq!(parse_link("trackA"), Err("Not a valid link"));
        assert_eq!(parse_link("https://example.com/track/1"), Err("Link not recognized"));
        assert_eq!(parse_link("https://www.deezer.com/track/abc"), Err("Link not recognized"));
        assert!(parse_link("https://deezer.page.link/abcd").is_err());
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::new("trackA", "Not a valid link");
        assert_eq!(err.to_string(), "trackA: Not a valid link");
    }

    #[tokio::test]
    async fn test_generate_album_and_missing_track() {
        let mut catalog = FakeCatalog::default();
        catalog.add_album(album(302127, "Discovery", &[3135553, 3135554]));
        let session = session_with(catalog).await;
        let plugins = PluginRegistry::new();
        let listener = RecordingListener::new();

        let intents = LinkGenerator
            .generate(&session, "https://www.deezer.com/album/302127", Bitrate::Flac, &plugins, &listener)
            .await
            .unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].uuid, "album_302127_9");
        assert_eq!(intents[0].tracks.len(), 2);

        let err = LinkGenerator
            .generate(&session, "https://www.deezer.com/track/1", Bitrate::Flac, &plugins, &listener)
            .await
            .unwrap_err();
        assert_eq!(err.link, "https://www.deezer.com/track/1");
        assert!(err.message.contains("no data"));
    }

    #[tokio::test]
    async fn test_generate_artist_expands_to_albums() {
        let mut catalog = FakeCatalog::default();
        catalog.add_album(album(10, "First", &[1, 2]));
        catalog.add_album(album(20, "Second", &[3]));
        catalog.add_artist("27", vec![20, 10, 99]);
        let session = session_with(catalog).await;
        let listener = RecordingListener::new();

        let intents = LinkGenerator
            .generate(
                &session,
                "https://www.deezer.com/artist/27",
                Bitrate::Mp3_320,
                &PluginRegistry::new(),
                &listener,
            )
            .await
            .unwrap();

        let ids: Vec<&str> = intents.iter().map(|i| i.catalog_id.as_str()).collect();
        assert_eq!(ids, vec!["20", "10"]);
        assert_eq!(
            listener.keys(),
            vec!["startAddingArtist", "albumSkip", "finishAddingArtist"]
        );
        let (_, skipped) = &listener.events()[1];
        let skipped = skipped.as_ref().unwrap();
        assert_eq!(skipped["id"], 99);
        assert_eq!(skipped["link"], "https://www.deezer.com/artist/27");
    }

    #[tokio::test]
    async fn test_generate_foreign_link_without_plugin() {
        let mut catalog = FakeCatalog::default();
        catalog.add_track(track(1, "unused"));
        let session = session_with(catalog).await;

        let intents = LinkGenerator
            .generate(
                &session,
                "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                Bitrate::Mp3_128,
                &PluginRegistry::new(),
                &RecordingListener::new(),
            )
            .await
            .unwrap();

        assert_eq!(intents.len(), 1);
        assert!(matches!(
            &intents[0].source,
            IntentSource::Convertible { plugin, .. } if plugin == "spotify"
        ));
    }
}
