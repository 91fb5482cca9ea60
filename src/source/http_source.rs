use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::{debug, warn};

use super::traits::{FetchedMedia, MediaFetcher};
use crate::config::PreviewConfig;

/// reqwest-backed fetcher for remote preview URLs.
pub struct HttpSource {
    client: Client,
    max_bytes: u64,
}

impl HttpSource {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_fetch_bytes,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpSource {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let mut resp = self.client.get(url).send().await?;

        let status = resp.status();
        debug!("http fetch status={} url={}", status.as_u16(), url);
        if !status.is_success() {
            warn!("http fetch failed status={}", status.as_u16());
            return Err(anyhow!("fetch failed: HTTP {}", status.as_u16()));
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes {
                return Err(anyhow!(
                    "response too large: {} bytes (limit {})",
                    len,
                    self.max_bytes
                ));
            }
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(anyhow!("response exceeded {} bytes", self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedMedia {
            content_type,
            body: Bytes::from(body),
        })
    }
}
