pub mod spotify;

use crate::auth::Session;
use crate::client::ClientError;
use crate::listener::Listener;
use crate::models::DownloadIntent;
use crate::settings::Settings;
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use thiserror::Error;

pub use spotify::SpotifyPlugin;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin is not configured: {0}")]
    NotConfigured(String),
    #[error("Spotify API error: {0}")]
    Spotify(#[from] rspotify::ClientError),
    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] ClientError),
    #[error("Invalid ID: {0}")]
    InvalidId(String),
    #[error("No match found in the primary catalog for {0}")]
    NoMatch(String),
}

/// An integration that can re-resolve foreign-catalog intents against the
/// primary catalog.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn setup(&mut self) -> Result<(), PluginError>;

    /// Returns a replacement intent tagged as primary.
    async fn convert(
        &self,
        session: &Session,
        intent: DownloadIntent,
        settings: &Settings,
        listener: &dyn Listener,
    ) -> Result<DownloadIntent, PluginError>;
}

/// Plugins that completed `setup`, keyed by name. Built once at startup.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the plugin's setup and keeps it only if setup succeeds.
    pub async fn register<P: Plugin + 'static>(&mut self, mut plugin: P) -> Result<(), PluginError> {
        plugin.setup().await?;
        let name = plugin.name().to_string();
        info!("Registered plugin '{}'", name);
        self.plugins.insert(name, Box::new(plugin));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
