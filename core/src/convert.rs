use crate::auth::Session;
use crate::listener::Listener;
use crate::models::{DownloadIntent, IntentSource};
use crate::plugins::{PluginError, PluginRegistry};
use crate::settings::Settings;
use log::info;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{uuid}: plugin '{plugin}' is not available, cannot convert this item")]
    MissingPlugin { uuid: String, plugin: String },
    #[error("{uuid}: conversion failed: {source}")]
    Plugin {
        uuid: String,
        #[source]
        source: PluginError,
    },
    #[error("{uuid}: plugin '{plugin}' returned an item that still needs conversion")]
    StillForeign { uuid: String, plugin: String },
}

impl ConversionError {
    pub fn uuid(&self) -> &str {
        match self {
            ConversionError::MissingPlugin { uuid, .. }
            | ConversionError::Plugin { uuid, .. }
            | ConversionError::StillForeign { uuid, .. } => uuid,
        }
    }
}

/// Hands convertible intents to their owning plugin. Primary intents are
/// returned untouched.
pub async fn convert_if_needed(
    intent: DownloadIntent,
    session: &Session,
    plugins: &PluginRegistry,
    settings: &Settings,
    listener: &dyn Listener,
) -> Result<DownloadIntent, ConversionError> {
    let plugin_name = match &intent.source {
        IntentSource::Primary => return Ok(intent),
        IntentSource::Convertible { plugin, .. } => plugin.clone(),
    };
    let uuid = intent.uuid.clone();

    let Some(plugin) = plugins.get(&plugin_name) else {
        return Err(ConversionError::MissingPlugin {
            uuid,
            plugin: plugin_name,
        });
    };

    listener.send("startConversion", Some(json!({ "uuid": uuid })));
    let converted = plugin
        .convert(session, intent, settings, listener)
        .await
        .map_err(|source| ConversionError::Plugin {
            uuid: uuid.clone(),
            source,
        })?;

    if converted.is_convertible() {
        return Err(ConversionError::StillForeign {
            uuid,
            plugin: plugin_name,
        });
    }

    info!("Converted {} into {}", uuid, converted);
    listener.send(
        "finishConversion",
        Some(json!({ "uuid": uuid, "converted": converted.uuid })),
    );
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;
    use crate::models::{Bitrate, ItemType};
    use crate::plugins::Plugin;
    use crate::test_support::{session_with, track, FakeCatalog};
    use async_trait::async_trait;

    /// Resolves foreign track IDs of the form `isrc-<ISRC>` by ISRC lookup.
    struct IsrcPlugin;

    #[async_trait]
    impl Plugin for IsrcPlugin {
        fn name(&self) -> &str {
            "isrc"
        }

        async fn setup(&mut self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn convert(
            &self,
            session: &Session,
            intent: DownloadIntent,
            _settings: &Settings,
            _listener: &dyn Listener,
        ) -> Result<DownloadIntent, PluginError> {
            let isrc = intent.catalog_id.trim_start_matches("isrc-");
            let found = session.client().track_by_isrc(isrc).await?;
            Ok(DownloadIntent::single(found, intent.bitrate))
        }
    }

    struct EchoPlugin;

    #[async_trait]
    impl Plugin for EchoPlugin {
        fn name(&self) -> &str {
            "echo"
        }

        async fn setup(&mut self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn convert(
            &self,
            _session: &Session,
            intent: DownloadIntent,
            _settings: &Settings,
            _listener: &dyn Listener,
        ) -> Result<DownloadIntent, PluginError> {
            Ok(intent)
        }
    }

    async fn fixture() -> (Session, PluginRegistry) {
        let mut catalog = FakeCatalog::default();
        catalog.add_track(track(42, "Digital Love"));
        let session = session_with(catalog).await;
        let mut plugins = PluginRegistry::new();
        plugins.register(IsrcPlugin).await.unwrap();
        plugins.register(EchoPlugin).await.unwrap();
        (session, plugins)
    }

    #[tokio::test]
    async fn test_primary_intent_passes_through() {
        let (session, plugins) = fixture().await;
        let listener = RecordingListener::new();
        let intent = DownloadIntent::single(track(7, "Voyager"), Bitrate::Flac);

        let result = convert_if_needed(intent.clone(), &session, &plugins, &Settings::default(), &listener)
            .await
            .unwrap();

        assert_eq!(result, intent);
        assert!(listener.events().is_empty());
    }

    #[tokio::test]
    async fn test_convertible_intent_is_rewritten_as_primary() {
        let (session, plugins) = fixture().await;
        let listener = RecordingListener::new();
        let intent = DownloadIntent::convertible("isrc", ItemType::Track, "isrc-ISRC00000042", Bitrate::Flac);

        let result = convert_if_needed(intent, &session, &plugins, &Settings::default(), &listener)
            .await
            .unwrap();

        assert_eq!(result.uuid, "track_42_9");
        assert_eq!(result.source, IntentSource::Primary);
        assert_eq!(listener.keys(), vec!["startConversion", "finishConversion"]);
    }

    #[tokio::test]
    async fn test_missing_plugin_fails_for_that_intent() {
        let (session, plugins) = fixture().await;
        let intent = DownloadIntent::convertible("spotify", ItemType::Album, "abc", Bitrate::Mp3_320);

        let err = convert_if_needed(intent, &session, &plugins, &Settings::default(), &RecordingListener::new())
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            ConversionError::MissingPlugin { plugin, .. } if plugin == "spotify"
        ));
        assert_eq!(err.uuid(), "spotify_album_abc_3");
    }

    #[tokio::test]
    async fn test_plugin_errors_are_wrapped() {
        let (session, plugins) = fixture().await;
        let intent = DownloadIntent::convertible("isrc", ItemType::Track, "isrc-UNKNOWN", Bitrate::Flac);

        let err = convert_if_needed(intent, &session, &plugins, &Settings::default(), &RecordingListener::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Plugin { .. }));
    }

    #[tokio::test]
    async fn test_plugin_returning_foreign_intent_is_rejected() {
        let (session, plugins) = fixture().await;
        let intent = DownloadIntent::convertible("echo", ItemType::Track, "x", Bitrate::Flac);

        let err = convert_if_needed(intent, &session, &plugins, &Settings::default(), &RecordingListener::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::StillForeign { .. }));
    }
}
