use std::fmt;

use serde::Serialize;

use super::blobs::BlobHandle;
use super::session::SessionState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    None,
    File,
    Url,
    Rtsp,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::None => "none",
            SourceKind::File => "file",
            SourceKind::Url => "url",
            SourceKind::Rtsp => "rtsp",
        };
        f.write_str(name)
    }
}

/// The single active source slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentSource {
    pub kind: SourceKind,
    /// File name, typed URL or RTSP URL.
    pub origin_value: Option<String>,
    pub blob: Option<BlobHandle>,
    pub embed_url: Option<String>,
    pub content_type: Option<String>,
}

impl CurrentSource {
    pub fn new(kind: SourceKind, origin_value: &str) -> Self {
        Self {
            kind,
            origin_value: Some(origin_value.to_string()),
            ..Self::default()
        }
    }
}

/// Serializable snapshot of everything the controller owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewState {
    pub current: CurrentSource,
    pub session: SessionState,
}

/// Text shown in the status region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    Idle,
    Loaded,
    LoadedEmbedded,
    LoadedDirect,
    ImageLoadFailed,
    VideoLoadFailed,
    UnsupportedFile,
    FetchingRemote,
    UnsupportedRemote(String),
    FetchFallback,
    UnableToPreview,
    UrlPending,
    Submitted(String),
    StartingRtsp,
    RtspRunning { session_id: String },
    RtspStartFailed(String),
    RtspStopped,
    HlsError(String),
    NoHlsPlayback,
}

impl fmt::Display for PreviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewStatus::Idle => f.write_str("Idle"),
            PreviewStatus::Loaded => f.write_str("Preview loaded"),
            PreviewStatus::LoadedEmbedded => f.write_str("Preview loaded (embedded)"),
            PreviewStatus::LoadedDirect => f.write_str("Preview loaded (direct URL)"),
            PreviewStatus::ImageLoadFailed => {
                f.write_str("Could not load image (CORS/invalid URL)")
            }
            PreviewStatus::VideoLoadFailed => {
                f.write_str("Could not load video (CORS/invalid URL)")
            }
            PreviewStatus::UnsupportedFile => f.write_str("Unsupported file type"),
            PreviewStatus::FetchingRemote => f.write_str("Fetching remote URL for preview..."),
            PreviewStatus::UnsupportedRemote(ct) => {
                write!(f, "Unsupported remote content-type: {}", ct)
            }
            PreviewStatus::FetchFallback => {
                f.write_str("Fetch blocked or failed; trying direct URL...")
            }
            PreviewStatus::UnableToPreview => {
                f.write_str("Unable to preview URL (CORS/unsupported)")
            }
            PreviewStatus::UrlPending => f.write_str("URL present - press Load to preview"),
            PreviewStatus::Submitted(source) => write!(f, "Submitted. Source: {}", source),
            PreviewStatus::StartingRtsp => f.write_str("Starting RTSP..."),
            PreviewStatus::RtspRunning { session_id } => {
                write!(f, "RTSP running, playing... id: {}", session_id)
            }
            PreviewStatus::RtspStartFailed(reason) => write!(f, "RTSP start failed: {}", reason),
            PreviewStatus::RtspStopped => f.write_str("RTSP stopped"),
            PreviewStatus::HlsError(detail) => write!(f, "HLS error: {}", detail),
            PreviewStatus::NoHlsPlayback => f.write_str("No HLS playback available"),
        }
    }
}
