use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// MIME type a media element must accept to play HLS playlists natively.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Maximum bytes buffered from a remote URL for a preview (64 MB).
pub const MAX_FETCH_BYTES: u64 = 64 * 1024 * 1024;

/// Bytes read by a direct load attempt before deciding image vs video (32 KB).
pub const DIRECT_PROBE_BYTES: usize = 32 * 1024;

/// Default timeout for remote preview fetches.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

/// Manifest reload attempts while the bridge worker has not written a playlist yet.
pub const MANIFEST_RETRIES: u32 = 6;

/// Delay between manifest reload attempts.
pub const MANIFEST_RETRY_DELAY_MS: u64 = 1000;

/// Live playlist reload interval once playback has started.
pub const MANIFEST_REFRESH_MS: u64 = 2000;

/// How often the bridge drops workers whose process has exited.
pub const WORKER_REAP_INTERVAL_MS: u64 = 5000;

/// Name of the playlist the bridge worker writes into each session directory.
pub const PLAYLIST_FILE_NAME: &str = "index.m3u8";

/// Client-side preview configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Page origin; bridge endpoints and relative playlist paths resolve against it.
    pub origin: String,
    /// Timeout applied to remote fetches and bridge calls.
    pub fetch_timeout_secs: u64,
    /// Upper bound for a fetched preview body.
    pub max_fetch_bytes: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_fetch_bytes: MAX_FETCH_BYTES,
        }
    }
}

/// Bridge service configuration. Defaults follow the low-latency ffmpeg profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bind_addr: String,
    /// Root directory holding one sub-directory of HLS output per session.
    pub output_dir: String,
    pub ffmpeg_path: String,
    /// `udp` or `tcp`, passed to ffmpeg as `-rtsp_transport`.
    pub rtsp_transport: String,
    pub scale_width: u32,
    pub segment_seconds: u32,
    pub playlist_size: u32,
    /// Interval for dropping workers whose process exited on its own.
    pub reap_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            output_dir: "/tmp/rtsp_hls_demo".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            rtsp_transport: "udp".to_string(),
            scale_width: 640,
            segment_seconds: 1,
            playlist_size: 3,
            reap_interval_ms: WORKER_REAP_INTERVAL_MS,
        }
    }
}

/// Top-level file layout: `[preview]` and `[bridge]` tables, both optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub preview: PreviewConfig,
    pub bridge: BridgeConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid configuration")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}
