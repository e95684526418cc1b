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

use anyhow::Context;
use clap::Parser;
use deezdl_core::{
    config_folder, normalize, Authenticator, BatchReport, BatchRunner, Bitrate, CommandDownloader,
    CredentialStore, DeezerClient, Downloader, LinkGenerator, Listener, ManifestDownloader,
    PluginRegistry, Settings, SpotifyPlugin, StdinPrompt,
};
use dotenvy::dotenv;
use log::{info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deezdl")]
#[command(about = "Download tracks, albums and playlists from Deezer and Spotify links", long_about = None)]
struct Cli {
    /// Creates the config folder in the same directory where deezdl is launched
    #[arg(long)]
    portable: bool,

    /// Overwrites the default bitrate selected (flac, 320, 128, 360_hq, 360_mq, 360_lq)
    #[arg(long, short = 'b', value_parser = parse_bitrate)]
    bitrate: Option<Bitrate>,

    /// Downloads in the given folder
    #[arg(long, short = 'p')]
    path: Option<String>,

    /// Gives up if no session token is pasted within this many seconds
    #[arg(long, value_name = "SECS")]
    arl_timeout: Option<u64>,

    /// Output the batch report to a JSON file (e.g., --json=report.json)
    #[arg(long)]
    json: Option<String>,

    /// Links to download (several can be joined with ';'), or a file with one link per line
    #[arg(value_name = "URL", required = true)]
    url: Vec<String>,
}

fn parse_bitrate(text: &str) -> Result<Bitrate, String> {
    Bitrate::from_text(text).ok_or_else(|| format!("unknown bitrate '{}'", text))
}

/// Prints every progress event as `key` or `key value`.
struct LogListener;

impl Listener for LogListener {
    fn send(&self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => println!("{} {}", key, value),
            None => println!("{}", key),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if dotenv().is_err() {
        // Silently ignore
    }

    let cli = Cli::parse();

    if let Err(e) = download(cli).await {
        eprintln!();
        eprintln!("[ERROR] {:#}", e);
        process::exit(1);
    }
}

async fn download(cli: Cli) -> anyhow::Result<()> {
    let config_folder = config_folder(cli.portable);
    let mut settings = Settings::load(&config_folder).context("Failed to load settings")?;
    if let Some(path) = cli.path.as_deref() {
        settings.override_download_location(path);
    }

    let client = DeezerClient::new(&settings.tags_language).context("Failed to create Deezer client")?;
    let mut authenticator = Authenticator::new(CredentialStore::in_folder(&config_folder), StdinPrompt::new());
    if let Some(secs) = cli.arl_timeout {
        authenticator = authenticator.with_prompt_timeout(Duration::from_secs(secs));
    }
    let session = authenticator
        .ensure_session(client)
        .await
        .context("Authentication failed")?;

    let mut plugins = PluginRegistry::new();
    match plugins.register(SpotifyPlugin::new(&config_folder)).await {
        Ok(()) => info!("Conversion plugins ready: {}", plugins.names().join(", ")),
        Err(e) => warn!("Spotify links will not be converted: {}", e),
    }

    let downloader: Box<dyn Downloader> = match settings.download_command.as_deref() {
        Some(program) => {
            let engine = CommandDownloader::new(program, Duration::from_secs(settings.command_timeout_secs));
            engine.check_available()?;
            Box::new(engine)
        }
        None => Box::new(ManifestDownloader),
    };

    let batch = normalize(&cli.url).context("Failed to read links")?;
    let runner = BatchRunner::new(
        session,
        plugins,
        Box::new(LinkGenerator),
        downloader,
        settings,
        Arc::new(LogListener),
    );
    let report = runner.run(&batch, cli.bitrate).await;

    print_report(&report);
    if let Some(path) = cli.json.as_deref() {
        save_report(&report, path);
    }

    println!("All done!");
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    println!("---------------------------------------------------");
    println!("BATCH REPORT");
    println!("---------------------------------------------------");
    println!("Links:               {}", report.total_links);
    println!("Items Resolved:      {}", report.intents_resolved);
    println!("Dispatched:          {}", report.dispatched.len());
    println!("Failed Links:        {}", report.failed_links.len());
    println!("Failed Conversions:  {}", report.conversion_failures.len());
    println!("Failed Downloads:    {}", report.download_failures.len());
    println!("---------------------------------------------------");

    if report.has_failures() {
        println!();
        println!("Problems:");
        let failures = report
            .failed_links
            .iter()
            .chain(&report.conversion_failures)
            .chain(&report.download_failures);
        for (i, failure) in failures.enumerate() {
            println!("{}. {}: {}", i + 1, failure.item, failure.message);
        }
    }
}

fn save_report(report: &BatchReport, path: &str) {
    match File::create(path) {
        Ok(mut file) => {
            let json_content = serde_json::to_string_pretty(report).unwrap_or_default();
            if let Err(e) = file.write_all(json_content.as_bytes()) {
                eprintln!();
                eprintln!("[ERROR] Failed to write report to file: {}", e);
            } else {
                println!();
                println!("[SAVED] Report saved to: {}", path);
            }
        }
        Err(e) => eprintln!("[ERROR] Failed to create file '{}': {}", path, e),
    }
}
