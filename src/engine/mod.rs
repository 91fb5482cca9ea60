// Preview orchestration: source selection, RTSP session lifecycle and playback.

pub mod blobs;
pub mod controller;
pub mod playback;
pub mod session;
pub mod state;
pub mod surface;
