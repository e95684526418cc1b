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

pub mod auth;
pub mod batch;
pub mod client;
pub mod convert;
pub mod credentials;
pub mod deezer;
pub mod downloader;
pub mod generator;
pub mod links;
pub mod listener;
pub mod models;
pub mod plugins;
pub mod settings;
#[cfg(test)]
pub(crate) mod test_support;

// Re-export key items for convenience
pub use auth::{AuthError, Authenticator, Session, StdinPrompt, TokenPrompt};
pub use batch::BatchRunner;
pub use client::{CatalogClient, ClientError, UserInfo};
pub use convert::{convert_if_needed, ConversionError};
pub use credentials::{config_folder, CredentialError, CredentialStore, SessionCredential};
pub use deezer::DeezerClient;
pub use downloader::{CommandDownloader, DownloadError, Downloader, ManifestDownloader};
pub use generator::{GenerationError, IntentGenerator, LinkGenerator};
pub use links::{normalize, LinkBatch};
pub use listener::{Listener, RecordingListener};
pub use models::{
    BatchFailure, BatchReport, Bitrate, CatalogCollection, CatalogTrack, DownloadIntent,
    IntentSource, ItemType,
};
pub use plugins::{Plugin, PluginError, PluginRegistry, SpotifyPlugin};
pub use settings::{Settings, SettingsError};
