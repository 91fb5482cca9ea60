// Axum bridge service: starts, stops and reports RTSP-to-HLS workers and
// serves their playlists under /hls.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::worker::{StreamLauncher, StreamWorker};
use crate::bridge::protocol::{
    ErrorBody, StartRequest, StartResponse, StatusResponse, StopRequest, StopResponse,
};
use crate::config::{BridgeConfig, PLAYLIST_FILE_NAME};

pub type WorkerMap = Arc<Mutex<HashMap<String, Box<dyn StreamWorker>>>>;

#[derive(Clone)]
struct BridgeState {
    workers: WorkerMap,
    launcher: Arc<dyn StreamLauncher>,
    output_dir: PathBuf,
}

pub struct BridgeServer {
    addr: SocketAddr,
    workers: WorkerMap,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    reaper: JoinHandle<()>,
}

impl BridgeServer {
    /// Bind `config.bind_addr` and serve in the background, returning a handle.
    pub async fn start(config: &BridgeConfig, launcher: Arc<dyn StreamLauncher>) -> Result<Self> {
        let output_dir = PathBuf::from(&config.output_dir);
        tokio::fs::create_dir_all(&output_dir).await?;

        let listener = TcpListener::bind(&config.bind_addr).await?;
        let addr = listener.local_addr()?;

        let workers: WorkerMap = Arc::new(Mutex::new(HashMap::new()));
        let app = router(BridgeState {
            workers: workers.clone(),
            launcher,
            output_dir: output_dir.clone(),
        });

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });
        let reaper = tokio::spawn(reap_workers(
            workers.clone(),
            Duration::from_millis(config.reap_interval_ms.max(1)),
        ));
        info!("bridge listening on {} output={}", addr, output_dir.display());

        Ok(Self {
            addr,
            workers,
            shutdown_tx: Some(shutdown_tx),
            reaper,
        })
    }

    /// Origin clients should use, e.g. `http://127.0.0.1:8000`.
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn workers(&self) -> &WorkerMap {
        &self.workers
    }

    /// Terminate every worker and stop serving.
    pub fn shutdown(mut self) {
        self.reaper.abort();
        for (id, mut worker) in self.workers.lock().drain() {
            info!("terminating worker {} on shutdown", id);
            worker.terminate();
        }
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Drop workers whose process exited; returns how many were removed.
pub fn prune_exited(workers: &WorkerMap) -> usize {
    let mut map = workers.lock();
    let before = map.len();
    map.retain(|id, worker| {
        let running = worker.is_running();
        if !running {
            info!("worker {} exited on its own", id);
        }
        running
    });
    before - map.len()
}

async fn reap_workers(workers: WorkerMap, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        prune_exited(&workers);
    }
}

fn router(state: BridgeState) -> Router {
    let hls = ServeDir::new(&state.output_dir);
    Router::new()
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/status/{id}", get(status_handler))
        .nest_service("/hls", hls)
        .with_state(state)
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// POST /start: `{rtsp}` -> `{id, hls_url}`.
async fn start_handler(
    State(state): State<BridgeState>,
    Json(req): Json<StartRequest>,
) -> Response {
    if !req.rtsp.starts_with("rtsp://") {
        warn!("rejecting start for non-rtsp url {}", req.rtsp);
        return error_response(StatusCode::BAD_REQUEST, "Invalid RTSP URL");
    }

    let id = Uuid::new_v4().simple().to_string();
    let out_dir = state.output_dir.join(&id);
    let worker = match state.launcher.launch(&req.rtsp, &out_dir).await {
        Ok(worker) => worker,
        Err(e) => {
            error!("worker launch failed for {}: {:#}", req.rtsp, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("ffmpeg start failed: {:#}", e),
            );
        }
    };
    state.workers.lock().insert(id.clone(), worker);
    info!("session {} started for {}", id, req.rtsp);

    let hls_url = format!("/hls/{}/{}", id, PLAYLIST_FILE_NAME);
    Json(StartResponse {
        id: Some(id),
        hls_url: Some(hls_url),
    })
    .into_response()
}

/// POST /stop: `{id}` -> `{stopped}`.
async fn stop_handler(State(state): State<BridgeState>, Json(req): Json<StopRequest>) -> Response {
    let worker = state.workers.lock().remove(&req.id);
    let Some(mut worker) = worker else {
        return error_response(StatusCode::NOT_FOUND, "Stream id not found");
    };
    worker.terminate();
    info!("session {} stopped", req.id);
    Json(StopResponse { stopped: req.id }).into_response()
}

/// GET /status/{id}: unknown or exited ids report `running: false`.
async fn status_handler(State(state): State<BridgeState>, Path(id): Path<String>) -> Response {
    prune_exited(&state.workers);
    let running = state.workers.lock().contains_key(&id);
    Json(StatusResponse { id, running }).into_response()
}
