// Integration test for the bridge service and its HTTP client.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;

use rtsp_preview::bridge::client::{BridgeClient, HttpBridgeClient};
use rtsp_preview::bridge::protocol::StatusResponse;
use rtsp_preview::config::{BridgeConfig, PreviewConfig};
use rtsp_preview::engine::playback::{ManifestProbePlayback, PlaybackBackend};
use rtsp_preview::error::BridgeError;
use rtsp_preview::server::handler::BridgeServer;
use rtsp_preview::server::worker::{StreamLauncher, StreamWorker};

const PLAYLIST: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:1\n#EXTINF:1.0,\nseg0.ts\n";

struct FakeWorker {
    running: Arc<AtomicBool>,
}

impl StreamWorker for FakeWorker {
    fn is_running(&mut self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn terminate(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Writes a playlist immediately instead of spawning ffmpeg.
#[derive(Default)]
struct FakeLauncher {
    fail: bool,
    launched: Mutex<Vec<(String, Arc<AtomicBool>)>>,
}

#[async_trait]
impl StreamLauncher for FakeLauncher {
    async fn launch(&self, rtsp_url: &str, out_dir: &Path) -> Result<Box<dyn StreamWorker>> {
        if self.fail {
            return Err(anyhow!("No such file or directory"));
        }
        tokio::fs::create_dir_all(out_dir).await?;
        tokio::fs::write(out_dir.join("index.m3u8"), PLAYLIST).await?;
        let running = Arc::new(AtomicBool::new(true));
        self.launched
            .lock()
            .push((rtsp_url.to_string(), running.clone()));
        Ok(Box::new(FakeWorker { running }))
    }
}

async fn start_bridge_with(
    launcher: Arc<FakeLauncher>,
    reap_interval_ms: u64,
) -> (BridgeServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        output_dir: dir.path().to_string_lossy().into_owned(),
        reap_interval_ms,
        ..BridgeConfig::default()
    };
    let server = BridgeServer::start(&config, launcher).await.unwrap();
    (server, dir)
}

async fn start_bridge(launcher: Arc<FakeLauncher>) -> (BridgeServer, tempfile::TempDir) {
    start_bridge_with(launcher, 60_000).await
}

/// Poll `check` until it holds or a few seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

fn probe_playback(refresh: Duration) -> ManifestProbePlayback {
    ManifestProbePlayback::new(&PreviewConfig::default())
        .unwrap()
        .with_retries(1, Duration::ZERO)
        .with_refresh(refresh)
}

fn client_for(server: &BridgeServer) -> HttpBridgeClient {
    HttpBridgeClient::new(&PreviewConfig {
        origin: server.origin(),
        ..PreviewConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_bridge_session_lifecycle() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher.clone()).await;
    let bridge = client_for(&server);
    let http = reqwest::Client::new();

    // 1. Start a session.
    let started = bridge.start("rtsp://camera.local/1").await.unwrap();
    assert_eq!(started.hls_url, format!("/hls/{}/index.m3u8", started.id));
    assert_eq!(started.id.len(), 32);
    assert_eq!(launcher.launched.lock()[0].0, "rtsp://camera.local/1");

    // 2. The playlist is served under /hls.
    let playlist = http
        .get(format!("{}{}", server.origin(), started.hls_url))
        .send()
        .await
        .unwrap();
    assert_eq!(playlist.status(), 200);
    assert!(playlist.text().await.unwrap().starts_with("#EXTM3U"));

    // 3. Status reports the worker as running.
    let status: StatusResponse = http
        .get(format!("{}/status/{}", server.origin(), started.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.running);

    // 4. Stop terminates and forgets the worker.
    bridge.stop(&started.id).await.unwrap();
    assert!(!launcher.launched.lock()[0].1.load(Ordering::SeqCst));
    assert!(server.workers().lock().is_empty());

    let resp = http
        .post(format!("{}/stop", server.origin()))
        .json(&serde_json::json!({ "id": started.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Stream id not found");

    server.shutdown();
}

#[tokio::test]
async fn test_bridge_rejects_non_rtsp_url() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher.clone()).await;
    let bridge = client_for(&server);

    let err = bridge.start("http://camera.local/1").await.unwrap_err();
    assert_eq!(err, BridgeError::Rejected("Invalid RTSP URL".to_string()));
    assert!(launcher.launched.lock().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn test_bridge_reports_launch_failure() {
    let launcher = Arc::new(FakeLauncher {
        fail: true,
        ..FakeLauncher::default()
    });
    let (server, _dir) = start_bridge(launcher).await;
    let bridge = client_for(&server);

    let err = bridge.start("rtsp://camera.local/1").await.unwrap_err();
    match err {
        BridgeError::Rejected(detail) => assert!(detail.starts_with("ffmpeg start failed: ")),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(server.workers().lock().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_terminates_workers() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher.clone()).await;
    let bridge = client_for(&server);

    bridge.start("rtsp://camera.local/1").await.unwrap();
    bridge.start("rtsp://camera.local/2").await.unwrap();
    server.shutdown();

    for (_, running) in launcher.launched.lock().iter() {
        assert!(!running.load(Ordering::SeqCst));
    }
}

#[tokio::test]
async fn test_client_maps_missing_fields_to_invalid_response() {
    use axum::routing::post;
    use axum::{Json, Router};

    let app = Router::new().route(
        "/start",
        post(|| async { Json(serde_json::json!({ "id": "s1" })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let bridge = HttpBridgeClient::new(&PreviewConfig {
        origin: format!("http://{}", addr),
        ..PreviewConfig::default()
    })
    .unwrap();
    let err = bridge.start("rtsp://camera.local/1").await.unwrap_err();
    assert_eq!(err, BridgeError::InvalidResponse);
}

#[tokio::test]
async fn test_stop_beacon_reaches_bridge() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher.clone()).await;
    let bridge = client_for(&server);

    let started = bridge.start("rtsp://camera.local/1").await.unwrap();
    assert_eq!(server.workers().lock().len(), 1);

    bridge.notify_stop(&started.id);

    assert!(eventually(|| server.workers().lock().is_empty()).await);
    assert!(!launcher.launched.lock()[0].1.load(Ordering::SeqCst));

    server.shutdown();
}

#[test]
fn test_stop_beacon_without_runtime_is_dropped() {
    let bridge = HttpBridgeClient::new(&PreviewConfig::default()).unwrap();
    // Must return without panicking.
    bridge.notify_stop("s1");
}

#[tokio::test]
async fn test_status_prunes_exited_worker() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher.clone()).await;
    let bridge = client_for(&server);
    let http = reqwest::Client::new();

    let started = bridge.start("rtsp://camera.local/1").await.unwrap();
    // The worker process dies without anyone calling /stop.
    launcher.launched.lock()[0].1.store(false, Ordering::SeqCst);

    let status: StatusResponse = http
        .get(format!("{}/status/{}", server.origin(), started.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.running);
    assert!(server.workers().lock().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn test_reaper_drops_exited_workers() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge_with(launcher.clone(), 10).await;
    let bridge = client_for(&server);

    bridge.start("rtsp://camera.local/1").await.unwrap();
    bridge.start("rtsp://camera.local/2").await.unwrap();
    launcher.launched.lock()[0].1.store(false, Ordering::SeqCst);

    assert!(eventually(|| server.workers().lock().len() == 1).await);

    server.shutdown();
}

#[tokio::test]
async fn test_manifest_playback_parses_bridge_playlist() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher).await;
    let bridge = client_for(&server);
    let started = bridge.start("rtsp://camera.local/1").await.unwrap();

    let playlist = Url::parse(&format!("{}{}", server.origin(), started.hls_url)).unwrap();
    let playback = probe_playback(Duration::from_secs(60));
    assert!(playback.has_adaptive_library());
    assert!(!playback.supports_native_hls());

    let mut player = playback.create_player(&playlist).await.unwrap();
    player.play().unwrap();
    player.destroy();
    player.destroy();
    assert!(player.play().is_err());

    server.shutdown();
}

#[tokio::test]
async fn test_manifest_playback_gives_up_on_missing_playlist() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, _dir) = start_bridge(launcher).await;

    let playlist = Url::parse(&format!("{}/hls/unknown/index.m3u8", server.origin())).unwrap();
    let err = probe_playback(Duration::from_secs(60))
        .create_player(&playlist)
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "manifestLoadError: HTTP 404");

    server.shutdown();
}

#[tokio::test]
async fn test_manifest_playback_rejects_non_playlist_body() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, dir) = start_bridge(launcher).await;
    let bogus = dir.path().join("bogus");
    tokio::fs::create_dir_all(&bogus).await.unwrap();
    tokio::fs::write(bogus.join("index.m3u8"), "<html>not a playlist</html>")
        .await
        .unwrap();

    let playlist = Url::parse(&format!("{}/hls/bogus/index.m3u8", server.origin())).unwrap();
    let err = probe_playback(Duration::from_secs(60))
        .create_player(&playlist)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().starts_with("manifestParsingError"));

    server.shutdown();
}

#[tokio::test]
async fn test_manifest_playback_reports_reload_errors() {
    let launcher = Arc::new(FakeLauncher::default());
    let (server, dir) = start_bridge(launcher).await;
    let bridge = client_for(&server);
    let started = bridge.start("rtsp://camera.local/1").await.unwrap();

    let playlist = Url::parse(&format!("{}{}", server.origin(), started.hls_url)).unwrap();
    let mut player = probe_playback(Duration::from_millis(10))
        .create_player(&playlist)
        .await
        .unwrap();
    let mut errors = player.take_errors().unwrap();
    assert!(player.take_errors().is_none());
    player.play().unwrap();

    // The worker's output disappears while playing.
    tokio::fs::remove_file(dir.path().join(&started.id).join("index.m3u8"))
        .await
        .unwrap();

    let detail = tokio::time::timeout(Duration::from_secs(5), errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail, "manifestLoadError: HTTP 404");

    player.destroy();
    server.shutdown();
}
