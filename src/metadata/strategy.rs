use std::io::Cursor;

use log::debug;
use symphonia::core::codecs::{CODEC_TYPE_FLAC, CODEC_TYPE_MP3};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use url::Url;

use crate::api::QualityTier;

/// Tagging route for one media buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagBranch {
    /// MPEG audio, tagged with ID3v2 frames.
    Id3,
    /// FLAC audio, tagged with Vorbis comments through the codec tools.
    ContainerTag,
}

impl TagBranch {
    pub fn extension(&self) -> &'static str {
        match self {
            TagBranch::Id3 => "mp3",
            TagBranch::ContainerTag => "flac",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TagBranch::Id3 => "audio/mpeg",
            TagBranch::ContainerTag => "audio/flac",
        }
    }
}

/// Chooses a branch from the media URL and the quality tier it was resolved at.
///
/// A file extension in the URL path decides first. Without one, a lossy tier
/// (or a lossy `br` query parameter) routes to ID3. `None` means the bytes must
/// be sniffed after download.
pub fn select_branch(media_url: &str, quality: QualityTier) -> Option<TagBranch> {
    let (path, lossy_hint) = match Url::parse(media_url) {
        Ok(url) => {
            let lossy = url
                .query_pairs()
                .any(|(k, v)| k == "br" && matches!(v.as_ref(), "128" | "192" | "320"));
            (url.path().to_ascii_lowercase(), lossy)
        }
        Err(_) => {
            let path = media_url.split(['?', '#']).next().unwrap_or_default();
            (path.to_ascii_lowercase(), false)
        }
    };

    if path.ends_with(".mp3") {
        return Some(TagBranch::Id3);
    }
    if path.ends_with(".flac") || path.ends_with(".alac") {
        return Some(TagBranch::ContainerTag);
    }
    if quality.is_lossy() || lossy_hint {
        return Some(TagBranch::Id3);
    }

    debug!("🔎 [STRATEGY] No container signal in {}", media_url);
    None
}

/// Probes fetched bytes for a supported codec.
pub fn sniff_branch(bytes: &[u8]) -> Option<TagBranch> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let codec = probed.format.default_track()?.codec_params.codec;
    if codec == CODEC_TYPE_MP3 {
        Some(TagBranch::Id3)
    } else if codec == CODEC_TYPE_FLAC {
        Some(TagBranch::ContainerTag)
    } else {
        debug!("🔎 [STRATEGY] Sniffed unsupported codec {:?}", codec);
        None
    }
}
