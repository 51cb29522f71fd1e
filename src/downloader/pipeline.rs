use std::sync::Arc;

use crate::api::{MetadataClient, QualityTier, Track, TrackKey};
use crate::config::AppConfig;
use crate::downloader::fetcher::{percent_of, FetchedResource, MediaFetcher};
use crate::downloader::{Destination, PackagedTrack, Progress, ProgressSink, Stage};
use crate::errors::{AppError, Result};
use crate::metadata::{
    select_branch, sniff_branch, CoverArtData, MetadataAggregator, TagBranch, TaggingInput,
};
use crate::processing::{codec_tool, embed_id3, ContainerTagEmbedder};
use crate::security::InputValidator;
use crate::utils::{current_year, sanitize_filename, sanitize_track_filename};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Name the destination stored the file under.
    Done(String),
    /// Message of the error that stopped the track.
    Failed(String),
}

impl TrackOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, TrackOutcome::Done(_))
    }
}

/// Acquires one track, tags it and hands it to a destination.
pub struct TrackPipeline {
    aggregator: MetadataAggregator,
    fetcher: MediaFetcher,
    embedder: ContainerTagEmbedder,
    validator: InputValidator,
    quality: QualityTier,
}

impl TrackPipeline {
    pub fn new(
        aggregator: MetadataAggregator,
        fetcher: MediaFetcher,
        embedder: ContainerTagEmbedder,
        quality: QualityTier,
    ) -> Self {
        Self {
            aggregator,
            fetcher,
            embedder,
            validator: InputValidator::new(),
            quality,
        }
    }

    /// Wires the pipeline from config, probing the FLAC toolchain if this is
    /// the first pipeline in the process.
    pub async fn from_config(config: &AppConfig, client: Arc<dyn MetadataClient>) -> Result<Self> {
        let aggregator = MetadataAggregator::new(client, config.cover_size, config.prefer_translated_lyrics);
        let fetcher = MediaFetcher::from_config(config)?;
        let embedder = ContainerTagEmbedder::new(codec_tool(config).await);
        Ok(Self::new(aggregator, fetcher, embedder, config.quality))
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    /// Runs every stage for `track`. Errors never escape: they are reported
    /// to `sink` as `Failed` and returned as the outcome.
    pub async fn run(&self, track: &Track, destination: &dyn Destination, sink: &dyn ProgressSink) -> TrackOutcome {
        let key = track.key();
        match self.process(track, &key, destination, sink).await {
            Ok(name) => {
                log::info!("✅ [PIPELINE] {} saved as {}", key, name);
                sink.track_progress(&key, &Progress::done(&name));
                TrackOutcome::Done(name)
            }
            Err(e) => {
                let note = e.to_string();
                log::error!("❌ [PIPELINE] {} failed: {}", key, note);
                sink.track_progress(&key, &Progress::failed(note.clone()));
                TrackOutcome::Failed(note)
            }
        }
    }

    /// Fetches and tags `track` without saving it. Stage updates go to
    /// `sink`; errors are returned instead of reported.
    pub async fn prepare(&self, track: &Track, sink: &dyn ProgressSink) -> Result<PackagedTrack> {
        self.package(track, &track.key(), sink).await
    }

    async fn process(
        &self,
        track: &Track,
        key: &TrackKey,
        destination: &dyn Destination,
        sink: &dyn ProgressSink,
    ) -> Result<String> {
        let packaged = self.package(track, key, sink).await?;
        sink.track_progress(key, &Progress::stage(Stage::Saving));
        destination.write(packaged).await
    }

    async fn package(&self, track: &Track, key: &TrackKey, sink: &dyn ProgressSink) -> Result<PackagedTrack> {
        sink.track_progress(key, &Progress::fetching(0));

        let resolved = self.aggregator.resolve(track, self.quality).await?;
        self.validator
            .validate_url(&resolved.media_url)
            .map_err(|e| AppError::NoPlayableUrl(format!("{}: {}", key, e)))?;
        let selected = select_branch(&resolved.media_url, self.quality);

        let mut last_percent = 0u8;
        let media_fetch = self.fetcher.fetch(&resolved.media_url, |received, total| {
            let percent = percent_of(received, total);
            if percent != last_percent {
                last_percent = percent;
                sink.track_progress(key, &Progress::fetching(percent));
            }
        });
        let cover_fetch = self.fetch_cover(key, resolved.cover_url.as_deref());
        let (media, cover) = tokio::join!(media_fetch, cover_fetch);
        let FetchedResource { bytes, .. } = media?;
        if last_percent != 100 {
            sink.track_progress(key, &Progress::fetching(100));
        }

        let branch = match selected {
            Some(branch) => branch,
            None => sniff_branch(&bytes).ok_or_else(|| {
                AppError::UnsupportedContainer(format!(
                    "could not tell MP3 from FLAC for {}",
                    resolved.media_url
                ))
            })?,
        };

        let input = TaggingInput::from_track(track, resolved.lyrics, cover, current_year());
        let file_name = package_name(&input, branch);

        sink.track_progress(key, &Progress::stage(Stage::Tagging));
        let tagged = match branch {
            TagBranch::Id3 => tokio::task::spawn_blocking(move || embed_id3(&bytes, &input))
                .await
                .map_err(|e| AppError::TagWrite(format!("Tagging task failed: {}", e)))??,
            TagBranch::ContainerTag => self.embedder.embed(&bytes, &input).await?,
        };

        Ok(PackagedTrack {
            file_name,
            bytes: tagged,
            mime_type: branch.mime_type().to_string(),
            branch,
        })
    }

    async fn fetch_cover(&self, key: &TrackKey, cover_url: Option<&str>) -> Option<CoverArtData> {
        let url = cover_url?;
        match self.fetcher.fetch_resource(url).await {
            Ok(resource) => Some(CoverArtData::new(resource.bytes, resource.content_type.as_deref())),
            Err(e) => {
                log::warn!("⚠️ [PIPELINE] Cover for {} unavailable: {}", key, e);
                None
            }
        }
    }
}

/// `{artists} - {title}.{ext}`, or just the title when there are no artists.
pub fn package_name(input: &TaggingInput, branch: TagBranch) -> String {
    let base = if input.artist.is_empty() {
        sanitize_filename(&input.title)
    } else {
        sanitize_track_filename(&input.artist, &input.title)
    };
    format!("{}.{}", base, branch.extension())
}
