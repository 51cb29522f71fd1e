use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use crate::api::{MetadataClient, Track, TrackKey};
use crate::config::AppConfig;
use crate::downloader::{
    BatchOrchestrator, BatchResult, FolderDestination, Progress, ProgressSink, Stage, TrackPipeline,
};
use crate::errors::{AppError, Result};
use crate::processing::codec_tool;
use crate::security::InputValidator;

// State shared by the command handlers
pub struct AppState {
    pub config: AppConfig,
    pub client: Arc<dyn MetadataClient>,
    pub validator: InputValidator,
}

impl AppState {
    pub fn new(config: AppConfig, client: Arc<dyn MetadataClient>) -> Self {
        Self {
            config,
            client,
            validator: InputValidator::new(),
        }
    }
}

pub async fn search_tracks(state: &AppState, keyword: &str, count: u32, page: u32) -> Result<Vec<Track>> {
    state.validator.validate_search_query(keyword)?;
    state.validator.validate_source(&state.config.source)?;

    log::info!("Searching {} for '{}'", state.config.source, keyword);
    state
        .client
        .search(&state.config.source, keyword.trim(), count.max(1), page.max(1))
        .await
}

pub fn format_track_list(tracks: &[Track]) -> String {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let album = if t.album.is_empty() {
                String::new()
            } else {
                format!(" [{}]", t.album)
            };
            format!("{:>3}. {} - {}{}  ({})", i + 1, t.artists.join(" / "), t.title, album, t.key())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Downloads `tracks` into the configured folder, one at a time. Ctrl-C stops
/// the batch once the current track finishes.
pub async fn download_tracks(state: &AppState, tracks: &[Track]) -> Result<BatchResult> {
    state.validator.validate_download_path(&state.config.download_path)?;

    let pipeline = TrackPipeline::from_config(&state.config, state.client.clone()).await?;
    let orchestrator = BatchOrchestrator::new(pipeline);
    let destination = FolderDestination::new(&state.config.download_path, state.config.collision_policy);
    let progress = ConsoleProgress::new(tracks.len());

    let cancel = orchestrator.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current track");
            cancel.cancel();
        }
    });

    let result = orchestrator.run(tracks, &destination, &progress).await;
    ctrl_c.abort();
    progress.finish(&result);
    Ok(result)
}

pub async fn describe_codec_tools(config: &AppConfig) -> String {
    codec_tool(config).await.describe()
}

#[derive(Debug, Deserialize)]
struct CsvTrack {
    #[serde(default)]
    source: Option<String>,
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    pic_id: Option<String>,
    #[serde(default)]
    lyric_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Reads a playlist CSV with a `source,id,name,artist,album,pic_id,lyric_id`
/// header. Artists are separated by `;`. Unreadable rows are skipped.
pub async fn import_csv_playlist(file_path: &Path, default_source: &str) -> Result<Vec<Track>> {
    log::info!("Importing CSV playlist from: {}", file_path.display());

    let content = tokio::fs::read_to_string(file_path).await?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut tracks = Vec::new();
    for (row, record) in csv_reader.deserialize::<CsvTrack>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to parse CSV record {}: {}", row + 1, e);
                continue;
            }
        };
        if record.id.trim().is_empty() {
            log::warn!("Skipping CSV record {}: missing id", row + 1);
            continue;
        }

        tracks.push(Track {
            id: record.id.trim().to_string(),
            title: non_empty(record.name).unwrap_or_default(),
            artists: record
                .artist
                .unwrap_or_default()
                .split(';')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            album: non_empty(record.album).unwrap_or_default(),
            pic_id: non_empty(record.pic_id),
            lyric_id: non_empty(record.lyric_id),
            source: non_empty(record.source).unwrap_or_else(|| default_source.to_string()),
        });
    }

    if tracks.is_empty() {
        return Err(AppError::Validation(format!(
            "No tracks found in {}",
            file_path.display()
        )));
    }
    Ok(tracks)
}

/// Renders batch and track progress on the terminal.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn finish(&self, result: &BatchResult) {
        self.bar.finish_and_clear();
        println!(
            "Done: {} saved, {} failed{}",
            result.succeeded,
            result.failed,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        for (key, note) in &result.failures {
            println!("  ✗ {}: {}", key, note);
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn track_progress(&self, key: &TrackKey, progress: &Progress) {
        match progress.stage {
            Stage::Fetching => self
                .bar
                .set_message(format!("{} fetching {}%", key, progress.percent.unwrap_or(0))),
            Stage::Tagging => self.bar.set_message(format!("{} tagging", key)),
            Stage::Saving => self.bar.set_message(format!("{} saving", key)),
            Stage::Done => self.bar.println(format!(
                "✓ {}",
                progress.note.as_deref().unwrap_or_default()
            )),
            Stage::Failed => self.bar.println(format!(
                "✗ {}: {}",
                key,
                progress.note.as_deref().unwrap_or_default()
            )),
        }
    }

    fn batch_progress(&self, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
    }
}
