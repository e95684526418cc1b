use crate::models::Bitrate;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SETTINGS_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persisted user settings (`config.json` in the config folder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub download_location: PathBuf,
    pub max_bitrate: Bitrate,
    pub tags_language: String,
    /// External engine invoked once per intent. Without it intents are only
    /// written to the queue folder.
    pub download_command: Option<String>,
    pub command_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let music = dirs::audio_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            download_location: music.join("deezdl"),
            max_bitrate: Bitrate::Mp3_320,
            tags_language: String::new(),
            download_command: None,
            command_timeout_secs: 3600,
        }
    }
}

impl Settings {
    /// Loads `config.json` from `config_folder`, writing the defaults first
    /// when the file does not exist yet.
    pub fn load(config_folder: &Path) -> Result<Self, SettingsError> {
        let path = config_folder.join(SETTINGS_FILE_NAME);
        if !path.is_file() {
            let settings = Settings::default();
            settings.save(config_folder)?;
            info!("Created default settings at {}", path.display());
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn save(&self, config_folder: &Path) -> Result<(), SettingsError> {
        let path = config_folder.join(SETTINGS_FILE_NAME);
        let io_err = |source| SettingsError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_folder).map_err(io_err)?;
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(io_err)
    }

    /// Applies the `--path` override. An empty value means the current directory.
    pub fn override_download_location(&mut self, path: &str) {
        self.download_location = if path.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(path)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.max_bitrate, Bitrate::Mp3_320);
        assert!(dir.path().join("config.json").is_file());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"maxBitrate": 9, "downloadLocation": "/srv/music"}"#,
        )
        .unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.max_bitrate, Bitrate::Flac);
        assert_eq!(settings.download_location, PathBuf::from("/srv/music"));
        assert_eq!(settings.command_timeout_secs, 3600);
        assert!(settings.download_command.is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert!(matches!(
            Settings::load(dir.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_path_override_is_current_dir() {
        let mut settings = Settings::default();
        settings.override_download_location("");
        assert_eq!(settings.download_location, PathBuf::from("."));
        settings.override_download_location("/tmp/out");
        assert_eq!(settings.download_location, PathBuf::from("/tmp/out"));
    }
}
