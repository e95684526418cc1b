use crate::auth::Session;
use crate::listener::Listener;
use crate::models::{DownloadIntent, IntentSource};
use crate::settings::Settings;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize download manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Download command not found: {0}")]
    CommandNotFound(String),
    #[error("Download command {program} failed with exit code {code:?}")]
    CommandFailed { program: String, code: Option<i32> },
    #[error("Download command {0} timed out")]
    Timeout(String),
    #[error("{0} still points to a foreign catalog and cannot be downloaded")]
    NotPrimary(String),
}

/// Executes one resolved intent.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn start(
        &self,
        session: &Session,
        intent: DownloadIntent,
        settings: &Settings,
        listener: &dyn Listener,
    ) -> Result<(), DownloadError>;
}

/// What the download engine receives for one intent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    intent: &'a DownloadIntent,
    download_location: &'a Path,
    tags_language: &'a str,
}

fn ensure_primary(intent: &DownloadIntent) -> Result<(), DownloadError> {
    match intent.source {
        IntentSource::Primary => Ok(()),
        IntentSource::Convertible { .. } => Err(DownloadError::NotPrimary(intent.uuid.clone())),
    }
}

/// Writes `<downloadLocation>/queue/<uuid>.json` and returns its path.
async fn write_manifest(intent: &DownloadIntent, settings: &Settings) -> Result<PathBuf, DownloadError> {
    let queue_dir = settings.download_location.join("queue");
    tokio::fs::create_dir_all(&queue_dir).await?;

    let manifest = Manifest {
        intent,
        download_location: &settings.download_location,
        tags_language: &settings.tags_language,
    };
    let path = queue_dir.join(format!("{}.json", intent.uuid));
    tokio::fs::write(&path, serde_json::to_vec_pretty(&manifest)?).await?;
    debug!("Wrote manifest {}", path.display());
    Ok(path)
}

/// Queues intents as manifest files for an engine watching the queue folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestDownloader;

#[async_trait]
impl Downloader for ManifestDownloader {
    async fn start(
        &self,
        _session: &Session,
        intent: DownloadIntent,
        settings: &Settings,
        listener: &dyn Listener,
    ) -> Result<(), DownloadError> {
        ensure_primary(&intent)?;
        listener.send(
            "startDownload",
            Some(json!({ "uuid": intent.uuid, "title": intent.title })),
        );
        let path = write_manifest(&intent, settings).await?;
        listener.send(
            "finishDownload",
            Some(json!({ "uuid": intent.uuid, "manifest": path })),
        );
        Ok(())
    }
}

/// Runs an external engine once per intent with the manifest path as its
/// only argument. The session token is passed in `DEEZDL_ARL`.
#[derive(Debug, Clone)]
pub struct CommandDownloader {
    program: String,
    timeout: Duration,
}

impl CommandDownloader {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn check_available(&self) -> Result<(), DownloadError> {
        which::which(&self.program)
            .map(|path| debug!("Using download engine {}", path.display()))
            .map_err(|_| DownloadError::CommandNotFound(self.program.clone()))
    }
}

#[async_trait]
impl Downloader for CommandDownloader {
    async fn start(
        &self,
        session: &Session,
        intent: DownloadIntent,
        settings: &Settings,
        listener: &dyn Listener,
    ) -> Result<(), DownloadError> {
        ensure_primary(&intent)?;
        listener.send(
            "startDownload",
            Some(json!({ "uuid": intent.uuid, "title": intent.title })),
        );
        let manifest = write_manifest(&intent, settings).await?;

        info!("Running {} for {}", self.program, intent);
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .arg(&manifest)
                .env("DEEZDL_ARL", session.credential().as_str())
                .env("DEEZDL_UUID", &intent.uuid)
                .env("DEEZDL_BITRATE", intent.bitrate.code().to_string())
                .env("DEEZDL_DOWNLOAD_LOCATION", &settings.download_location)
                .kill_on_drop(true)
                .status(),
        )
        .await;

        let status = match result {
            Ok(status) => status?,
            Err(_) => {
                warn!("{} timed out after {:?}", self.program, self.timeout);
                return Err(DownloadError::Timeout(self.program.clone()));
            }
        };
        if !status.success() {
            return Err(DownloadError::CommandFailed {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        listener.send(
            "finishDownload",
            Some(json!({ "uuid": intent.uuid, "manifest": manifest })),
        );
        Ok(())
    }
}
