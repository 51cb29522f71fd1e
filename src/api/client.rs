use reqwest::Client;
use serde_json::Value;

use crate::api::{LyricResponse, MetadataClient, QualityTier, Track, UrlResponse};
use crate::errors::{AppError, Result};

/// Client for a GD-Studio style music API: one endpoint, switched by `types`.
pub struct HttpMetadataClient {
    client: Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().to_string(),
        }
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value> {
        log::debug!("🔍 [API] {} {:?}", self.base_url, params);

        let response = self.client.get(&self.base_url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Metadata(format!(
                "Metadata API returned HTTP {} for {:?}",
                status, params
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            log::warn!("⚠️ [API] Unparseable response: {}", text.chars().take(200).collect::<String>());
            AppError::Json(e)
        })
    }
}

#[async_trait::async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn search(&self, source: &str, keyword: &str, count: u32, page: u32) -> Result<Vec<Track>> {
        let count = count.to_string();
        let page = page.to_string();
        let json = self
            .get_json(&[
                ("types", "search"),
                ("source", source),
                ("name", keyword),
                ("count", count.as_str()),
                ("pages", page.as_str()),
            ])
            .await?;

        let tracks: Vec<Track> = json
            .as_array()
            .map(|items| items.iter().filter_map(|item| Track::from_value(item, source)).collect())
            .unwrap_or_default();

        log::info!("🔍 [API] {} results for '{}' on {}", tracks.len(), keyword, source);
        Ok(tracks)
    }

    async fn resolve_url(&self, source: &str, id: &str, quality: QualityTier) -> Result<UrlResponse> {
        let json = self
            .get_json(&[
                ("types", "url"),
                ("source", source),
                ("id", id),
                ("br", quality.as_param()),
            ])
            .await?;
        Ok(UrlResponse::from_value(&json))
    }

    async fn resolve_cover(&self, source: &str, cover_id: &str, size: u32) -> Result<UrlResponse> {
        let size = size.to_string();
        let json = self
            .get_json(&[
                ("types", "pic"),
                ("source", source),
                ("id", cover_id),
                ("size", size.as_str()),
            ])
            .await?;
        Ok(UrlResponse::from_value(&json))
    }

    async fn resolve_lyrics(&self, source: &str, lyric_id: &str) -> Result<LyricResponse> {
        let json = self
            .get_json(&[("types", "lyric"), ("source", source), ("id", lyric_id)])
            .await?;
        Ok(LyricResponse::from_value(&json))
    }
}
