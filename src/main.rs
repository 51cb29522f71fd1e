use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use sounddeck::api::{HttpMetadataClient, QualityTier};
use sounddeck::commands::{self, AppState};
use sounddeck::config::AppConfig;
use sounddeck::downloader::fetcher::build_client;
use sounddeck::utils::parse_selection;

#[derive(Parser, Debug)]
#[command(name = "sounddeck", version, about = "Search, download and tag tracks")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Quality tier: 128, 192, 320, 740 or 999
    #[arg(long, global = true)]
    quality: Option<QualityTier>,

    /// Music source to query (netease, kuwo, ...)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Output folder
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the configured source
    Search {
        keyword: String,
        #[arg(long)]
        count: Option<u32>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search and download the chosen results
    Download {
        keyword: String,
        /// 1-based result numbers, e.g. "1,3-5"; all results when omitted
        #[arg(long)]
        select: Option<String>,
        #[arg(long)]
        count: Option<u32>,
    },
    /// Download every track listed in a CSV playlist
    Batch { csv: PathBuf },
    /// Report which FLAC tools were found
    Tools,
}

fn load_config(cli: &Cli) -> AppConfig {
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            AppConfig::default()
        }
    };

    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    if let Some(source) = &cli.source {
        config.source = source.trim().to_string();
    }
    if let Some(out) = &cli.out {
        config.download_path = out.clone();
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let config = load_config(&cli);
    let http = build_client(&config).context("building HTTP client")?;
    let client = Arc::new(HttpMetadataClient::new(http, &config.api_base));
    let state = AppState::new(config, client);

    match cli.command {
        Command::Search { keyword, count, page } => {
            let count = count.unwrap_or(state.config.search_count);
            let tracks = commands::search_tracks(&state, &keyword, count, page).await?;
            if tracks.is_empty() {
                println!("No results for '{}'", keyword);
            } else {
                println!("{}", commands::format_track_list(&tracks));
            }
        }
        Command::Download { keyword, select, count } => {
            let count = count.unwrap_or(state.config.search_count);
            let found = commands::search_tracks(&state, &keyword, count, 1).await?;
            if found.is_empty() {
                bail!("No results for '{}'", keyword);
            }
            let chosen: Vec<_> = match select {
                Some(selection) => parse_selection(&selection, found.len())
                    .into_iter()
                    .map(|i| found[i].clone())
                    .collect(),
                None => found,
            };
            if chosen.is_empty() {
                bail!("Selection matched none of the search results");
            }
            let result = commands::download_tracks(&state, &chosen).await?;
            if result.succeeded == 0 && result.requested > 0 {
                bail!("No tracks were saved");
            }
        }
        Command::Batch { csv } => {
            let tracks = commands::import_csv_playlist(&csv, &state.config.source).await?;
            let result = commands::download_tracks(&state, &tracks).await?;
            if result.succeeded == 0 && result.requested > 0 {
                bail!("No tracks were saved");
            }
        }
        Command::Tools => {
            println!("{}", commands::describe_codec_tools(&state.config).await);
        }
    }

    Ok(())
}
