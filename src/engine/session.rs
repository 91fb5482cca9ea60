// RTSP session state machine: mirrors the bridge service's view of one session.
//
// Idle -> Starting -> Running -> Stopping -> Idle, with Starting -> Idle on failure.

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtspSession {
    pub session_id: String,
    /// Playlist path as issued by the bridge, usually origin-relative.
    pub playback_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Starting {
        rtsp_url: String,
    },
    Running(RtspSession),
    Stopping(RtspSession),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// The session a stop request would target.
    pub fn active(&self) -> Option<&RtspSession> {
        match self {
            SessionState::Running(session) => Some(session),
            _ => None,
        }
    }

    /// Idle -> Starting. Refused from any other state.
    pub fn begin_start(&mut self, rtsp_url: &str) -> bool {
        if !self.is_idle() {
            debug!("start refused in state {:?}", self);
            return false;
        }
        *self = SessionState::Starting {
            rtsp_url: rtsp_url.to_string(),
        };
        true
    }

    /// Starting -> Running.
    pub fn finish_start(&mut self, session: RtspSession) -> bool {
        if !matches!(self, SessionState::Starting { .. }) {
            return false;
        }
        *self = SessionState::Running(session);
        true
    }

    /// Starting -> Idle.
    pub fn fail_start(&mut self) {
        if matches!(self, SessionState::Starting { .. }) {
            *self = SessionState::Idle;
        }
    }

    /// Running -> Stopping, yielding the session to stop.
    pub fn begin_stop(&mut self) -> Option<RtspSession> {
        let session = self.active()?.clone();
        *self = SessionState::Stopping(session.clone());
        Some(session)
    }

    /// Stopping -> Idle, only if `session_id` is still the one being stopped.
    pub fn finish_stop(&mut self, session_id: &str) {
        if let SessionState::Stopping(session) = self {
            if session.session_id == session_id {
                *self = SessionState::Idle;
            }
        }
    }

    /// Force Idle. Returns the running session that still needs a stop notification.
    pub fn reset(&mut self) -> Option<RtspSession> {
        match std::mem::take(self) {
            SessionState::Running(session) => Some(session),
            _ => None,
        }
    }
}
