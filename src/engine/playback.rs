// Adaptive playback: resolving bridge playlists and driving an HLS player.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{PreviewConfig, MANIFEST_REFRESH_MS, MANIFEST_RETRIES, MANIFEST_RETRY_DELAY_MS};

/// Errors a player raises after playback started, e.g. `mediaError: bufferAppendError`.
pub type PlayerErrors = mpsc::UnboundedReceiver<String>;

/// A live adaptive-stream player bound to the mounted stream element.
pub trait AdaptivePlayer: Send + Sync {
    fn play(&mut self) -> Result<()>;
    /// Runtime error stream. Returns `Some` at most once.
    fn take_errors(&mut self) -> Option<PlayerErrors>;
    /// Release decoders and stop network activity. Must be idempotent.
    fn destroy(&mut self);
}

/// What the media stack can do with an HLS playlist.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Whether the media element accepts [`crate::config::HLS_MIME_TYPE`] directly.
    fn supports_native_hls(&self) -> bool;

    /// Whether an adaptive-streaming library can be constructed.
    fn has_adaptive_library(&self) -> bool;

    /// Assign the playlist to the mounted element and start playback.
    async fn play_native(&self, playlist: &Url) -> Result<()>;

    /// Construct a player, load `playlist`, attach it to the mounted element
    /// and resolve once the manifest is parsed.
    async fn create_player(&self, playlist: &Url) -> Result<Box<dyn AdaptivePlayer>>;
}

/// Resolve a playlist path against the page origin.
pub fn resolve_playlist(origin: &Url, path: &str) -> Result<Url> {
    origin
        .join(path)
        .map_err(|e| anyhow!("cannot resolve playlist {}: {}", path, e))
}

async fn fetch_manifest(client: &Client, playlist: &Url) -> Result<String> {
    let resp = client
        .get(playlist.clone())
        .send()
        .await
        .map_err(|e| anyhow!("manifestLoadError: {}", e))?;
    if !resp.status().is_success() {
        return Err(anyhow!("manifestLoadError: HTTP {}", resp.status().as_u16()));
    }
    let text = resp.text().await?;
    if !text.trim_start_matches('\u{feff}').trim_start().starts_with("#EXTM3U") {
        return Err(anyhow!("manifestParsingError: missing #EXTM3U"));
    }
    Ok(text)
}

/// Library-style backend that fetches the playlist and treats a valid
/// `#EXTM3U` header as the manifest-parsed event. While playing it reloads
/// the live playlist and reports reload failures as runtime errors.
pub struct ManifestProbePlayback {
    client: Client,
    retries: u32,
    retry_delay: Duration,
    refresh: Duration,
}

impl ManifestProbePlayback {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            retries: MANIFEST_RETRIES,
            retry_delay: Duration::from_millis(MANIFEST_RETRY_DELAY_MS),
            refresh: Duration::from_millis(MANIFEST_REFRESH_MS),
        })
    }

    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }
}

#[async_trait]
impl PlaybackBackend for ManifestProbePlayback {
    fn supports_native_hls(&self) -> bool {
        false
    }

    fn has_adaptive_library(&self) -> bool {
        true
    }

    async fn play_native(&self, _playlist: &Url) -> Result<()> {
        Err(anyhow!("native HLS playback unsupported"))
    }

    async fn create_player(&self, playlist: &Url) -> Result<Box<dyn AdaptivePlayer>> {
        let mut attempt = 0;
        loop {
            match fetch_manifest(&self.client, playlist).await {
                Ok(text) => {
                    let segments = text.lines().filter(|l| l.starts_with("#EXTINF")).count();
                    info!("manifest parsed url={} segments={}", playlist, segments);
                    let (errors_tx, errors_rx) = mpsc::unbounded_channel();
                    return Ok(Box::new(ProbedPlayer {
                        client: self.client.clone(),
                        url: playlist.clone(),
                        refresh: self.refresh,
                        errors_tx,
                        errors_rx: Some(errors_rx),
                        reload_task: None,
                        active: true,
                    }));
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!("manifest not ready (attempt {}): {}", attempt, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

struct ProbedPlayer {
    client: Client,
    url: Url,
    refresh: Duration,
    errors_tx: mpsc::UnboundedSender<String>,
    errors_rx: Option<PlayerErrors>,
    reload_task: Option<JoinHandle<()>>,
    active: bool,
}

impl AdaptivePlayer for ProbedPlayer {
    fn play(&mut self) -> Result<()> {
        if !self.active {
            return Err(anyhow!("player destroyed"));
        }
        if self.reload_task.is_some() {
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| anyhow!("no runtime to drive playback"))?;
        let client = self.client.clone();
        let url = self.url.clone();
        let refresh = self.refresh;
        let errors = self.errors_tx.clone();
        self.reload_task = Some(handle.spawn(async move {
            loop {
                tokio::time::sleep(refresh).await;
                if let Err(e) = fetch_manifest(&client, &url).await {
                    if errors.send(e.to_string()).is_err() {
                        break;
                    }
                }
            }
        }));
        debug!("playing {}", self.url);
        Ok(())
    }

    fn take_errors(&mut self) -> Option<PlayerErrors> {
        self.errors_rx.take()
    }

    fn destroy(&mut self) {
        if let Some(task) = self.reload_task.take() {
            task.abort();
        }
        if self.active {
            self.active = false;
            debug!("player destroyed {}", self.url);
        }
    }
}

impl Drop for ProbedPlayer {
    fn drop(&mut self) {
        self.destroy();
    }
}
