// Bridge workers: one external ffmpeg process per RTSP session.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, PLAYLIST_FILE_NAME};

/// A running RTSP-to-HLS conversion.
pub trait StreamWorker: Send {
    fn is_running(&mut self) -> bool;
    /// Ask the worker to exit. Safe to call on an exited worker.
    fn terminate(&mut self);
}

/// Starts a worker writing `<out_dir>/index.m3u8` from `rtsp_url`.
#[async_trait]
pub trait StreamLauncher: Send + Sync {
    async fn launch(&self, rtsp_url: &str, out_dir: &Path) -> Result<Box<dyn StreamWorker>>;
}

pub struct FfmpegLauncher {
    config: BridgeConfig,
}

impl FfmpegLauncher {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// ffmpeg arguments for a low-latency, short-window HLS output.
    pub fn command_args(&self, rtsp_url: &str, out_dir: &Path) -> Vec<String> {
        let cfg = &self.config;
        let playlist = out_dir.join(PLAYLIST_FILE_NAME).to_string_lossy().into_owned();
        let scale = format!("scale=w={}:h=-2", cfg.scale_width);
        let segment = cfg.segment_seconds.to_string();
        let list_size = cfg.playlist_size.to_string();
        [
            "-rtsp_transport",
            cfg.rtsp_transport.as_str(),
            "-i",
            rtsp_url,
            "-vf",
            scale.as_str(),
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-tune",
            "zerolatency",
            "-g",
            "30",
            "-sc_threshold",
            "0",
            "-fflags",
            "nobuffer",
            "-flags",
            "low_delay",
            "-f",
            "hls",
            "-hls_time",
            segment.as_str(),
            "-hls_list_size",
            list_size.as_str(),
            "-hls_flags",
            "delete_segments+append_list",
            playlist.as_str(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[async_trait]
impl StreamLauncher for FfmpegLauncher {
    async fn launch(&self, rtsp_url: &str, out_dir: &Path) -> Result<Box<dyn StreamWorker>> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("cannot create {}", out_dir.display()))?;
        let args = self.command_args(rtsp_url, out_dir);
        debug!("spawning {} {}", self.config.ffmpeg_path, args.join(" "));
        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("cannot spawn {}", self.config.ffmpeg_path))?;
        info!("ffmpeg worker pid={:?} out={}", child.id(), out_dir.display());
        Ok(Box::new(FfmpegWorker { child }))
    }
}

struct FfmpegWorker {
    child: Child,
}

impl StreamWorker for FfmpegWorker {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(e) = self.child.start_kill() {
            warn!("failed to kill ffmpeg worker: {}", e);
        }
    }
}
