use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder, Proxy};
use url::Url;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Response body plus the content type the server declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Builds the shared HTTP client from the network settings.
pub fn build_client(config: &AppConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(15))
        .user_agent(config.user_agent.as_str())
        .gzip(true)
        .brotli(true)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true);

    if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        log::info!("🌐 [HTTP] Using outbound proxy {}", proxy_url);
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Streams remote resources into memory, optionally through a byte proxy that
/// takes the real target as its `url` query parameter.
pub struct MediaFetcher {
    client: Client,
    media_proxy: Option<Url>,
}

impl MediaFetcher {
    pub fn new(client: Client, media_proxy: Option<&str>) -> Result<Self> {
        let media_proxy = match media_proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(proxy) => Some(
                Url::parse(proxy)
                    .map_err(|e| AppError::Validation(format!("Invalid media proxy '{}': {}", proxy, e)))?,
            ),
            None => None,
        };
        Ok(Self { client, media_proxy })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(build_client(config)?, config.media_proxy.as_deref())
    }

    fn request_url(&self, target: &str) -> Result<Url> {
        match &self.media_proxy {
            Some(proxy) => {
                let mut url = proxy.clone();
                url.query_pairs_mut().append_pair("url", target);
                Ok(url)
            }
            None => Url::parse(target)
                .map_err(|e| AppError::Transfer(format!("Invalid URL '{}': {}", target, e))),
        }
    }

    /// Downloads `url`, calling `on_progress(received, total)` after every
    /// chunk. `total` is `None` when the server sent no length. No retries.
    pub async fn fetch<F>(&self, url: &str, mut on_progress: F) -> Result<FetchedResource>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        let request_url = self.request_url(url)?;
        log::info!("🌐 [HTTP] GET {}", request_url);

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| AppError::Transfer(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transfer(format!("HTTP {} from {}", status, url)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let total = response.content_length().filter(|len| *len > 0);

        let mut received = 0u64;
        let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::Transfer(format!("Stream from {} interrupted: {}", url, e)))?;
            received += chunk.len() as u64;
            bytes.extend_from_slice(&chunk);
            on_progress(received, total);
        }

        if let Some(total) = total {
            if received < total {
                return Err(AppError::Transfer(format!(
                    "Stream from {} ended after {} of {} bytes",
                    url, received, total
                )));
            }
        }

        log::debug!("✅ [HTTP] {} bytes from {}", received, url);
        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }

    pub async fn fetch_resource(&self, url: &str) -> Result<FetchedResource> {
        self.fetch(url, |_, _| {}).await
    }
}

/// Fetch percentage for a byte count; unknown totals stay at 0 until the end.
pub fn percent_of(received: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => ((received.min(total) * 100) / total) as u8,
        _ => 0,
    }
}
