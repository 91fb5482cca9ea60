use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub rtsp: String,
}

/// `/start` success body. Fields are optional on the wire so a malformed
/// reply can be told apart from a transport error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub hls_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub running: bool,
}

/// Error body returned with any non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// A session the bridge accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedStream {
    pub id: String,
    pub hls_url: String,
}

impl StartResponse {
    /// Both fields must be present and non-empty.
    pub fn into_started(self) -> Option<StartedStream> {
        match (self.id, self.hls_url) {
            (Some(id), Some(hls_url)) if !id.is_empty() && !hls_url.is_empty() => {
                Some(StartedStream { id, hls_url })
            }
            _ => None,
        }
    }
}
