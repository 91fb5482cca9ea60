// RTSP-to-HLS bridge service: HTTP surface and worker supervision.

pub mod handler;
pub mod worker;
