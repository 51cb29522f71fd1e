use std::sync::Arc;

use crate::api::{MetadataClient, QualityTier, Track};
use crate::errors::{AppError, Result};
use crate::metadata::lyrics::choose_lyrics;

/// Where to fetch a track's audio and cover, plus its cleaned lyrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub media_url: String,
    pub cover_url: Option<String>,
    pub lyrics: Option<String>,
}

pub struct MetadataAggregator {
    client: Arc<dyn MetadataClient>,
    cover_size: u32,
    prefer_translated: bool,
}

impl MetadataAggregator {
    pub fn new(client: Arc<dyn MetadataClient>, cover_size: u32, prefer_translated: bool) -> Self {
        Self {
            client,
            cover_size,
            prefer_translated,
        }
    }

    /// Runs the URL, cover and lyric lookups concurrently. Only the media URL
    /// is required; cover and lyric failures are logged and dropped.
    pub async fn resolve(&self, track: &Track, quality: QualityTier) -> Result<ResolvedMedia> {
        let source = track.source.as_str();
        let lyric_id = track
            .lyric_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&track.id);

        log::info!("🎼 [METADATA] Resolving {} at {}", track.key(), quality);

        let url_lookup = self.client.resolve_url(source, &track.id, quality);
        let cover_lookup = async {
            match track.pic_id.as_deref().filter(|id| !id.is_empty()) {
                Some(pic_id) => Some(self.client.resolve_cover(source, pic_id, self.cover_size).await),
                None => None,
            }
        };
        let lyric_lookup = self.client.resolve_lyrics(source, lyric_id);

        let (url_result, cover_result, lyric_result) = tokio::join!(url_lookup, cover_lookup, lyric_lookup);

        let media_url = match url_result {
            Ok(response) => response.url.ok_or_else(|| {
                AppError::NoPlayableUrl(format!("{} returned no media URL", track.key()))
            })?,
            Err(e) => {
                return Err(AppError::NoPlayableUrl(format!("{}: {}", track.key(), e)));
            }
        };

        let cover_url = match cover_result {
            Some(Ok(response)) => response.url,
            Some(Err(e)) => {
                log::warn!("⚠️ [METADATA] Cover lookup failed for {}: {}", track.key(), e);
                None
            }
            None => None,
        };

        let lyrics = match lyric_result {
            Ok(response) => choose_lyrics(&response, self.prefer_translated),
            Err(e) => {
                log::warn!("⚠️ [METADATA] Lyric lookup failed for {}: {}", track.key(), e);
                None
            }
        };

        Ok(ResolvedMedia {
            media_url,
            cover_url,
            lyrics,
        })
    }
}
