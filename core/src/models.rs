/*
    deezdl | Rust CLI tool to download music from Deezer and Spotify links.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio format codes understood by the Deezer media service.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Bitrate {
    Flac,
    #[default]
    Mp3_320,
    Mp3_128,
    Mp4Ra3,
    Mp4Ra2,
    Mp4Ra1,
    Default,
    Local,
}

impl Bitrate {
    pub fn code(self) -> u8 {
        match self {
            Bitrate::Flac => 9,
            Bitrate::Mp3_320 => 3,
            Bitrate::Mp3_128 => 1,
            Bitrate::Mp4Ra3 => 15,
            Bitrate::Mp4Ra2 => 14,
            Bitrate::Mp4Ra1 => 13,
            Bitrate::Default => 8,
            Bitrate::Local => 0,
        }
    }

    /// Parses the names users type on the command line (`flac`, `320`, `360_mq`, ...).
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "flac" | "lossless" | "9" => Some(Bitrate::Flac),
            "mp3" | "320" | "mp3_320" | "3" => Some(Bitrate::Mp3_320),
            "128" | "mp3_128" | "1" => Some(Bitrate::Mp3_128),
            "360" | "360_hq" | "15" => Some(Bitrate::Mp4Ra3),
            "360_mq" | "14" => Some(Bitrate::Mp4Ra2),
            "360_lq" | "13" => Some(Bitrate::Mp4Ra1),
            _ => None,
        }
    }
}

impl From<Bitrate> for u8 {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.code()
    }
}

impl TryFrom<u8> for Bitrate {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            9 => Ok(Bitrate::Flac),
            3 => Ok(Bitrate::Mp3_320),
            1 => Ok(Bitrate::Mp3_128),
            15 => Ok(Bitrate::Mp4Ra3),
            14 => Ok(Bitrate::Mp4Ra2),
            13 => Ok(Bitrate::Mp4Ra1),
            8 => Ok(Bitrate::Default),
            0 => Ok(Bitrate::Local),
            other => Err(format!("unknown format code {}", other)),
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bitrate::Flac => "FLAC",
            Bitrate::Mp3_320 => "MP3 320",
            Bitrate::Mp3_128 => "MP3 128",
            Bitrate::Mp4Ra3 => "360 HQ",
            Bitrate::Mp4Ra2 => "360 MQ",
            Bitrate::Mp4Ra1 => "360 LQ",
            Bitrate::Default => "MP3 128 (default)",
            Bitrate::Local => "Local",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Track,
    Album,
    Playlist,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Track => "track",
            ItemType::Album => "album",
            ItemType::Playlist => "playlist",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A track as known by the primary catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub isrc: Option<String>,
}

/// An album or playlist as known by the primary catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCollection {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub tracks: Vec<CatalogTrack>,
}

/// Where an intent's catalog identifier points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IntentSource {
    Primary,
    /// Comes from a secondary catalog and has to be re-matched by `plugin`
    /// before it can be downloaded.
    Convertible { plugin: String, foreign_id: String },
}

/// A resolved, not-yet-executed unit of download work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadIntent {
    pub uuid: String,
    pub item_type: ItemType,
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    pub bitrate: Bitrate,
    pub tracks: Vec<CatalogTrack>,
    pub source: IntentSource,
}

impl DownloadIntent {
    pub fn single(track: CatalogTrack, bitrate: Bitrate) -> Self {
        Self {
            uuid: format!("track_{}_{}", track.id, bitrate.code()),
            item_type: ItemType::Track,
            catalog_id: track.id.to_string(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            bitrate,
            tracks: vec![track],
            source: IntentSource::Primary,
        }
    }

    pub fn collection(item_type: ItemType, collection: CatalogCollection, bitrate: Bitrate) -> Self {
        Self {
            uuid: format!("{}_{}_{}", item_type, collection.id, bitrate.code()),
            item_type,
            catalog_id: collection.id.to_string(),
            title: collection.title,
            artist: collection.artist,
            bitrate,
            tracks: collection.tracks,
            source: IntentSource::Primary,
        }
    }

    pub fn convertible(plugin: &str, item_type: ItemType, foreign_id: &str, bitrate: Bitrate) -> Self {
        Self {
            uuid: format!("{}_{}_{}_{}", plugin, item_type, foreign_id, bitrate.code()),
            item_type,
            catalog_id: foreign_id.to_string(),
            title: String::new(),
            artist: String::new(),
            bitrate,
            tracks: Vec::new(),
            source: IntentSource::Convertible {
                plugin: plugin.to_string(),
                foreign_id: foreign_id.to_string(),
            },
        }
    }

    pub fn is_convertible(&self) -> bool {
        matches!(self.source, IntentSource::Convertible { .. })
    }
}

impl fmt::Display for DownloadIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            return write!(f, "[{}] {} {}", self.uuid, self.item_type, self.catalog_id);
        }
        write!(
            f,
            "[{}] {} - {} ({} tracks, {})",
            self.uuid,
            self.artist,
            self.title,
            self.tracks.len(),
            self.bitrate
        )
    }
}

/// A link or intent that could not be processed, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub item: String,
    pub message: String,
}

/// Outcome of one CLI run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_links: usize,
    pub failed_links: Vec<BatchFailure>,
    pub intents_resolved: usize,
    pub conversion_failures: Vec<BatchFailure>,
    pub dispatched: Vec<String>,
    pub download_failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn new(total_links: usize) -> Self {
        Self {
            total_links,
            ..Default::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !(self.failed_links.is_empty()
            && self.conversion_failures.is_empty()
            && self.download_failures.is_empty())
    }
}
