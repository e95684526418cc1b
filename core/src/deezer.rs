use crate::client::{CatalogClient, ClientError, UserInfo};
use crate::models::{CatalogCollection, CatalogTrack};
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

const API_BASE: &str = "https://api.deezer.com";
const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
const USER_AGENT: &str = concat!("deezdl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbumRef {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: u64,
    title: String,
    #[serde(default)]
    isrc: Option<String>,
    artist: ApiArtist,
    #[serde(default)]
    album: Option<ApiAlbumRef>,
}

impl ApiTrack {
    fn into_track(self, album: Option<&str>) -> CatalogTrack {
        CatalogTrack {
            id: self.id,
            title: self.title,
            artist: self.artist.name,
            album: self.album.map(|a| a.title).or_else(|| album.map(str::to_string)),
            isrc: self.isrc,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiTrackList {
    data: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    id: u64,
    title: String,
    artist: ApiArtist,
    tracks: ApiTrackList,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: u64,
    title: String,
    creator: ApiArtist,
    tracks: ApiTrackList,
}

#[derive(Debug, Deserialize)]
struct ApiId {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    data: Vec<ApiId>,
    #[serde(default)]
    next: Option<String>,
}

/// Deezer catalog client: the gateway for ARL login, the public JSON API
/// for lookups.
pub struct DeezerClient {
    http: reqwest::Client,
    api_base: String,
    gateway_url: String,
    language: String,
    user: Option<UserInfo>,
}

impl DeezerClient {
    pub fn new(language: &str) -> Result<Self, ClientError> {
        Self::with_endpoints(language, API_BASE, GATEWAY_URL)
    }

    pub fn with_endpoints(language: &str, api_base: &str, gateway_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.to_string(),
            language: language.to_string(),
            user: None,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let mut request = self.http.get(url);
        if !self.language.is_empty() {
            request = request.header(reqwest::header::ACCEPT_LANGUAGE, &self.language);
        }
        let body: Value = request.send().await?.error_for_status()?.json().await?;
        if let Some(error) = body.get("error").filter(|e| e.is_object()) {
            return Err(ClientError::Api {
                kind: error["type"].as_str().unwrap_or("Exception").to_string(),
                message: error["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn get_track(&self, path: &str) -> Result<CatalogTrack, ClientError> {
        let track: ApiTrack = self.get_json(&format!("{}/track/{}", self.api_base, path)).await?;
        Ok(track.into_track(None))
    }

    async fn get_album(&self, path: &str) -> Result<CatalogCollection, ClientError> {
        let album: ApiAlbum = self.get_json(&format!("{}/album/{}", self.api_base, path)).await?;
        let title = album.title;
        let tracks = album
            .tracks
            .data
            .into_iter()
            .map(|t| t.into_track(Some(&title)))
            .collect();
        Ok(CatalogCollection {
            id: album.id,
            title,
            artist: album.artist.name,
            tracks,
        })
    }
}

fn parse_user_id(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}

#[async_trait]
impl CatalogClient for DeezerClient {
    async fn login_via_arl(&mut self, arl: &str) -> Result<bool, ClientError> {
        let arl = arl.trim();
        if arl.is_empty() {
            return Ok(false);
        }

        let body: Value = self
            .http
            .post(&self.gateway_url)
            .query(&[
                ("method", "deezer.getUserData"),
                ("input", "3"),
                ("api_version", "1.0"),
                ("api_token", ""),
            ])
            .header(reqwest::header::COOKIE, format!("arl={}", arl))
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let user = &body["results"]["USER"];
        let user_id = parse_user_id(&user["USER_ID"]);
        if user_id == 0 {
            warn!("Session token was rejected by the service");
            return Ok(false);
        }

        self.user = Some(UserInfo {
            id: user_id,
            name: user["BLOG_NAME"].as_str().unwrap_or_default().to_string(),
        });
        Ok(true)
    }

    fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    async fn track(&self, id: &str) -> Result<CatalogTrack, ClientError> {
        self.get_track(id).await
    }

    async fn album(&self, id: &str) -> Result<CatalogCollection, ClientError> {
        self.get_album(id).await
    }

    async fn playlist(&self, id: &str) -> Result<CatalogCollection, ClientError> {
        let playlist: ApiPlaylist = self
            .get_json(&format!("{}/playlist/{}", self.api_base, id))
            .await?;
        Ok(CatalogCollection {
            id: playlist.id,
            title: playlist.title,
            artist: playlist.creator.name,
            tracks: playlist
                .tracks
                .data
                .into_iter()
                .map(|t| t.into_track(None))
                .collect(),
        })
    }

    async fn artist_albums(&self, id: &str) -> Result<Vec<u64>, ClientError> {
        let mut ids = Vec::new();
        let mut next = Some(format!("{}/artist/{}/albums?limit=100", self.api_base, id));
        while let Some(url) = next {
            let page: ApiPage = self.get_json(&url).await?;
            ids.extend(page.data.into_iter().map(|a| a.id));
            next = page.next;
        }
        Ok(ids)
    }

    async fn track_by_isrc(&self, isrc: &str) -> Result<CatalogTrack, ClientError> {
        self.get_track(&format!("isrc:{}", isrc)).await
    }

    async fn album_by_upc(&self, upc: &str) -> Result<CatalogCollection, ClientError> {
        self.get_album(&format!("upc:{}", upc)).await
    }
}
