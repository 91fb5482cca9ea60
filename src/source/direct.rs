// Direct element loading outside a browser: read the head of the resource and
// accept it when its signature matches the requested element kind.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::Client;
use tracing::debug;

use super::traits::{DirectLoader, LoadOutcome};
use crate::config::{PreviewConfig, DIRECT_PROBE_BYTES};
use crate::detect::container::{detect_container, detect_image, ContainerFormat};
use crate::detect::media_kind::MediaKind;

pub struct SniffingLoader {
    client: Client,
}

impl SniffingLoader {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    async fn read_head(&self, url: &str) -> Result<BytesMut> {
        let mut resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("HTTP {}", resp.status().as_u16()));
        }
        let mut head = BytesMut::with_capacity(DIRECT_PROBE_BYTES);
        while head.len() < DIRECT_PROBE_BYTES {
            match resp.chunk().await? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }
        head.truncate(DIRECT_PROBE_BYTES);
        Ok(head)
    }
}

pub fn head_matches(kind: MediaKind, head: &[u8]) -> bool {
    match kind {
        MediaKind::Image => detect_image(head).is_some(),
        MediaKind::Video => detect_container(head) != ContainerFormat::Unknown,
    }
}

#[async_trait]
impl DirectLoader for SniffingLoader {
    async fn load(&self, kind: MediaKind, url: &str) -> LoadOutcome {
        match self.read_head(url).await {
            Ok(head) if head_matches(kind, &head) => LoadOutcome::Loaded,
            Ok(_) => {
                debug!("direct {:?} load rejected: signature mismatch url={}", kind, url);
                LoadOutcome::Failed
            }
            Err(e) => {
                debug!("direct {:?} load failed url={}: {}", kind, url, e);
                LoadOutcome::Failed
            }
        }
    }
}
