use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use super::protocol::{ErrorBody, StartRequest, StartResponse, StartedStream, StopRequest};
use crate::config::PreviewConfig;
use crate::error::BridgeError;

/// Calls into the RTSP-to-HLS bridge service.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn start(&self, rtsp_url: &str) -> Result<StartedStream, BridgeError>;

    /// Awaited stop; callers treat failures as advisory.
    async fn stop(&self, session_id: &str) -> Result<()>;

    /// Best-effort stop: returns immediately, delivery is not guaranteed.
    fn notify_stop(&self, session_id: &str);
}

pub struct HttpBridgeClient {
    client: Client,
    start_url: Url,
    stop_url: Url,
}

impl HttpBridgeClient {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| anyhow!("invalid origin {}: {}", config.origin, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            start_url: origin.join("/start").context("cannot build /start url")?,
            stop_url: origin.join("/stop").context("cannot build /stop url")?,
        })
    }
}

async fn post_stop(client: &Client, url: Url, session_id: &str) -> Result<()> {
    let resp = client
        .post(url)
        .json(&StopRequest {
            id: session_id.to_string(),
        })
        .send()
        .await?;
    debug!("bridge stop id={} status={}", session_id, resp.status().as_u16());
    Ok(())
}

#[async_trait]
impl BridgeClient for HttpBridgeClient {
    async fn start(&self, rtsp_url: &str) -> Result<StartedStream, BridgeError> {
        let resp = self
            .client
            .post(self.start_url.clone())
            .json(&StartRequest {
                rtsp: rtsp_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("bridge start rejected status={}", status.as_u16());
            return match resp.json::<ErrorBody>().await {
                Ok(body) if !body.detail.is_empty() => Err(BridgeError::Rejected(body.detail)),
                _ => Err(BridgeError::StartFailed),
            };
        }

        let body: StartResponse = resp
            .json()
            .await
            .map_err(|_| BridgeError::InvalidResponse)?;
        let started = body.into_started().ok_or(BridgeError::InvalidResponse)?;
        info!("bridge session started id={} hls={}", started.id, started.hls_url);
        Ok(started)
    }

    async fn stop(&self, session_id: &str) -> Result<()> {
        post_stop(&self.client, self.stop_url.clone(), session_id).await
    }

    fn notify_stop(&self, session_id: &str) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no runtime for stop beacon id={}", session_id);
                return;
            }
        };
        let client = self.client.clone();
        let url = self.stop_url.clone();
        let id = session_id.to_string();
        handle.spawn(async move {
            if let Err(e) = post_stop(&client, url, &id).await {
                debug!("stop beacon for {} not delivered: {}", id, e);
            }
        });
    }
}
