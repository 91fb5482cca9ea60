use thiserror::Error;

/// Input errors: the operation is refused before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("Select one source first")]
    NoSourceSelected,
    #[error("Enter a URL")]
    EmptyUrl,
    #[error("Enter RTSP URL")]
    EmptyRtspUrl,
}

/// Why the bridge refused or failed to start a session. The Display text is
/// what the status region shows after `RTSP start failed: `.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Non-success status carrying a server-provided detail.
    #[error("{0}")]
    Rejected(String),
    /// Non-success status without a usable detail.
    #[error("start failed")]
    StartFailed,
    /// Success status but the body lacked an id or playlist URL.
    #[error("invalid response")]
    InvalidResponse,
    #[error("{0}")]
    Transport(String),
}
