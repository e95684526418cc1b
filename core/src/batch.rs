use crate::auth::Session;
use crate::convert::convert_if_needed;
use crate::downloader::Downloader;
use crate::generator::IntentGenerator;
use crate::links::LinkBatch;
use crate::listener::Listener;
use crate::models::{BatchFailure, BatchReport, Bitrate, DownloadIntent};
use crate::plugins::PluginRegistry;
use crate::settings::Settings;
use log::{error, info};
use serde_json::json;
use std::sync::Arc;

/// Drives a batch of links through resolution, conversion and dispatch.
///
/// Every link is resolved (and converted) before the first intent is
/// dispatched. Failures are recorded per link or per intent and never stop
/// the batch.
pub struct BatchRunner {
    session: Session,
    plugins: PluginRegistry,
    generator: Box<dyn IntentGenerator>,
    downloader: Box<dyn Downloader>,
    settings: Settings,
    listener: Arc<dyn Listener>,
}

impl BatchRunner {
    pub fn new(
        session: Session,
        plugins: PluginRegistry,
        generator: Box<dyn IntentGenerator>,
        downloader: Box<dyn Downloader>,
        settings: Settings,
        listener: Arc<dyn Listener>,
    ) -> Self {
        Self {
            session,
            plugins,
            generator,
            downloader,
            settings,
            listener,
        }
    }

    /// Resolves then dispatches `batch`. `bitrate` falls back to the
    /// configured maximum.
    pub async fn run(&self, batch: &LinkBatch, bitrate: Option<Bitrate>) -> BatchReport {
        let mut report = BatchReport::new(batch.len());
        let intents = self.resolve_all(batch, bitrate, &mut report).await;
        self.dispatch_all(intents, &mut report).await;
        info!(
            "Batch finished: {} dispatched, {} failed links, {} failed conversions, {} failed downloads",
            report.dispatched.len(),
            report.failed_links.len(),
            report.conversion_failures.len(),
            report.download_failures.len()
        );
        report
    }

    /// Returns the final intents in resolution order.
    pub async fn resolve_all(
        &self,
        batch: &LinkBatch,
        bitrate: Option<Bitrate>,
        report: &mut BatchReport,
    ) -> Vec<DownloadIntent> {
        let bitrate = bitrate.unwrap_or(self.settings.max_bitrate);
        let listener = self.listener.as_ref();
        let mut resolved = Vec::new();

        for link in batch {
            let generated = match self
                .generator
                .generate(&self.session, link, bitrate, &self.plugins, listener)
                .await
            {
                Ok(intents) => intents,
                Err(e) => {
                    error!("{}", e);
                    listener.send(
                        "generationError",
                        Some(json!({ "link": e.link, "message": e.message })),
                    );
                    report.failed_links.push(BatchFailure {
                        item: e.link,
                        message: e.message,
                    });
                    continue;
                }
            };

            report.intents_resolved += generated.len();
            for intent in generated {
                match convert_if_needed(intent, &self.session, &self.plugins, &self.settings, listener).await {
                    Ok(intent) => resolved.push(intent),
                    Err(e) => {
                        error!("{}", e);
                        listener.send(
                            "conversionError",
                            Some(json!({ "uuid": e.uuid(), "message": e.to_string() })),
                        );
                        report.conversion_failures.push(BatchFailure {
                            item: e.uuid().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        resolved
    }

    /// Starts one download per intent, strictly in order.
    pub async fn dispatch_all(&self, intents: Vec<DownloadIntent>, report: &mut BatchReport) {
        let listener = self.listener.as_ref();
        for intent in intents {
            let uuid = intent.uuid.clone();
            match self
                .downloader
                .start(&self.session, intent, &self.settings, listener)
                .await
            {
                Ok(()) => report.dispatched.push(uuid),
                Err(e) => {
                    error!("{}: {}", uuid, e);
                    listener.send(
                        "downloadError",
                        Some(json!({ "uuid": uuid, "message": e.to_string() })),
                    );
                    report.download_failures.push(BatchFailure {
                        item: uuid,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
