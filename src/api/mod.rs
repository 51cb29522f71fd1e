pub mod client;

pub use client::HttpMetadataClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::Result;

/// Catalogs the metadata service can search and resolve against.
pub const KNOWN_SOURCES: &[&str] = &[
    "netease", "tencent", "spotify", "ytmusic", "deezer", "migu", "kugou",
    "kuwo", "qobuz", "tidal", "joox", "ximalaya", "apple",
];

/// A track as known to one upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub pic_id: Option<String>,
    pub lyric_id: Option<String>,
    pub source: String,
}

impl Track {
    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.source, &self.id)
    }

    /// Builds a track from one search result, tolerating the field variations
    /// different catalogs return. Returns `None` when no id can be found.
    pub fn from_value(value: &Value, default_source: &str) -> Option<Self> {
        let id = value
            .get("id")
            .or_else(|| value.get("track_id"))
            .and_then(value_to_string)?;

        let title = value
            .get("name")
            .or_else(|| value.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let artists = value
            .get("artist")
            .or_else(|| value.get("artists"))
            .map(artist_list)
            .unwrap_or_default();

        let album = value
            .get("album")
            .and_then(|v| match v {
                Value::Object(map) => map.get("name").and_then(Value::as_str),
                other => other.as_str(),
            })
            .unwrap_or_default()
            .to_string();

        let pic_id = value.get("pic_id").and_then(value_to_string);
        let lyric_id = value.get("lyric_id").and_then(value_to_string);

        let source = value
            .get("source")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_source)
            .to_string();

        Some(Self {
            id,
            title,
            artists,
            album,
            pic_id,
            lyric_id,
            source,
        })
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn artist_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(map) => map.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect()
}

/// Stable identity of a track across progress updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackKey {
    pub source: String,
    pub id: String,
}

impl TrackKey {
    pub fn new(source: &str, id: &str) -> Self {
        Self {
            source: source.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "128")]
    Kbps128,
    #[serde(rename = "192")]
    Kbps192,
    #[default]
    #[serde(rename = "320")]
    Kbps320,
    #[serde(rename = "740")]
    Lossless740,
    #[serde(rename = "999")]
    Lossless999,
}

impl QualityTier {
    pub fn as_param(&self) -> &'static str {
        match self {
            QualityTier::Kbps128 => "128",
            QualityTier::Kbps192 => "192",
            QualityTier::Kbps320 => "320",
            QualityTier::Lossless740 => "740",
            QualityTier::Lossless999 => "999",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            QualityTier::Kbps128 | QualityTier::Kbps192 | QualityTier::Kbps320
        )
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "128" => Ok(QualityTier::Kbps128),
            "192" => Ok(QualityTier::Kbps192),
            "320" => Ok(QualityTier::Kbps320),
            "740" => Ok(QualityTier::Lossless740),
            "999" => Ok(QualityTier::Lossless999),
            other => Err(format!(
                "unknown quality '{}', expected one of 128, 192, 320, 740, 999",
                other
            )),
        }
    }
}

/// Answer to a URL lookup. The service may omit any field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlResponse {
    pub url: Option<String>,
}

impl UrlResponse {
    pub fn from_value(value: &Value) -> Self {
        Self {
            url: value
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricResponse {
    pub lyric: Option<String>,
    pub translated: Option<String>,
}

impl LyricResponse {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        Self {
            lyric: text("lyric"),
            translated: text("tlyric"),
        }
    }
}

/// Remote collaborator that searches catalogs and resolves track ids to URLs
/// and lyric text.
#[async_trait::async_trait]
pub trait MetadataClient: Send + Sync {
    async fn search(&self, source: &str, keyword: &str, count: u32, page: u32) -> Result<Vec<Track>>;
    async fn resolve_url(&self, source: &str, id: &str, quality: QualityTier) -> Result<UrlResponse>;
    async fn resolve_cover(&self, source: &str, cover_id: &str, size: u32) -> Result<UrlResponse>;
    async fn resolve_lyrics(&self, source: &str, lyric_id: &str) -> Result<LyricResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_track_with_artist_array_and_numeric_id() {
        let value = json!({
            "id": 1974443814,
            "name": " Song ",
            "artist": ["A", "B", ""],
            "album": "Record",
            "pic_id": "109951",
            "source": "netease"
        });
        let track = Track::from_value(&value, "tencent").unwrap();
        assert_eq!(track.id, "1974443814");
        assert_eq!(track.title, "Song");
        assert_eq!(track.artists, vec!["A", "B"]);
        assert_eq!(track.pic_id.as_deref(), Some("109951"));
        assert_eq!(track.lyric_id, None);
        assert_eq!(track.source, "netease");
    }

    #[test]
    fn parses_track_with_fallback_fields() {
        let value = json!({ "track_id": "abc", "artists": "Solo", "lyric_id": "L1" });
        let track = Track::from_value(&value, "kuwo").unwrap();
        assert_eq!(track.id, "abc");
        assert_eq!(track.artists, vec!["Solo"]);
        assert_eq!(track.album, "");
        assert_eq!(track.lyric_id.as_deref(), Some("L1"));
        assert_eq!(track.source, "kuwo");
    }

    #[test]
    fn track_without_id_is_rejected() {
        assert!(Track::from_value(&json!({ "name": "x" }), "netease").is_none());
    }

    #[test]
    fn key_displays_source_and_id() {
        assert_eq!(TrackKey::new("netease", "42").to_string(), "netease:42");
    }

    #[test]
    fn quality_tiers_parse_and_classify() {
        assert_eq!("320".parse::<QualityTier>().unwrap(), QualityTier::Kbps320);
        assert!("256".parse::<QualityTier>().is_err());
        assert!(QualityTier::Kbps128.is_lossy());
        assert!(!QualityTier::Lossless999.is_lossy());
        assert_eq!(QualityTier::Lossless740.as_param(), "740");
        assert_eq!(QualityTier::default(), QualityTier::Kbps320);
    }

    #[test]
    fn responses_treat_blank_fields_as_missing() {
        assert_eq!(UrlResponse::from_value(&json!({ "url": "" })).url, None);
        assert_eq!(UrlResponse::from_value(&json!([])).url, None);
        let lyrics = LyricResponse::from_value(&json!({ "lyric": "[00:01]hi", "tlyric": " " }));
        assert_eq!(lyrics.lyric.as_deref(), Some("[00:01]hi"));
        assert_eq!(lyrics.translated, None);
    }
}
