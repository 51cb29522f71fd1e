pub mod aggregator;
pub mod lyrics;
pub mod strategy;

pub use aggregator::{MetadataAggregator, ResolvedMedia};
pub use strategy::{select_branch, sniff_branch, TagBranch};

use crate::api::Track;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const ARTIST_SEPARATOR: &str = " / ";
pub const DEFAULT_COVER_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArtData {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CoverArtData {
    /// Wraps downloaded cover bytes, defaulting the MIME type when the server sent none.
    pub fn new(data: Vec<u8>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(|m| m.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|m| m.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_COVER_MIME.to_string());
        Self { data, mime_type }
    }

    pub fn is_png(&self) -> bool {
        self.mime_type.contains("png")
    }
}

/// Metadata ready to be written into an audio container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggingInput {
    pub title: String,
    pub artists: Vec<String>,
    /// All artists joined with `ARTIST_SEPARATOR`.
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub lyrics: Option<String>,
    pub cover: Option<CoverArtData>,
}

impl TaggingInput {
    pub fn from_track(track: &Track, lyrics: Option<String>, cover: Option<CoverArtData>, year: i32) -> Self {
        let title = match track.title.trim() {
            "" => UNKNOWN_TITLE.to_string(),
            t => t.to_string(),
        };
        let artists: Vec<String> = track
            .artists
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let artist = artists.join(ARTIST_SEPARATOR);

        Self {
            title,
            artists,
            artist,
            album: track.album.trim().to_string(),
            year,
            lyrics: lyrics.filter(|l| !l.trim().is_empty()),
            cover: cover.filter(|c| !c.data.is_empty()),
        }
    }

    pub fn copyright(&self) -> String {
        format!("© {} {}", self.year, self.artist)
    }

    /// Vorbis comment fields in write order.
    pub fn vorbis_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("TITLE", self.title.clone()),
            ("ARTIST", self.artist.clone()),
            ("ALBUM", self.album.clone()),
            ("DATE", self.year.to_string()),
        ];
        if let Some(lyrics) = &self.lyrics {
            fields.push(("LYRICS", lyrics.clone()));
        }
        fields
    }
}
