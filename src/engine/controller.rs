// Preview session controller: owns the single active source and the RTSP session.
//
// Every user action bumps the generation counter. Async continuations carry the
// generation they were issued under and only touch shared state while it is
// still current; stale results are dropped.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::blobs::BlobStore;
use super::playback::{resolve_playlist, AdaptivePlayer, PlaybackBackend, PlayerErrors};
use super::session::RtspSession;
use super::state::{CurrentSource, PreviewState, PreviewStatus, SourceKind};
use super::surface::{MediaElement, PreviewSurface};
use crate::bridge::client::BridgeClient;
use crate::config::PreviewConfig;
use crate::detect::embed::parse_embed_target;
use crate::detect::media_kind::{kind_from_extension, kind_from_mime, MediaKind};
use crate::error::PreviewError;
use crate::source::local_file::LocalFile;
use crate::source::traits::{DirectLoader, FetchedMedia, MediaFetcher};

/// External collaborators of the controller.
pub struct Backends {
    pub surface: Arc<dyn PreviewSurface>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub loader: Arc<dyn DirectLoader>,
    pub bridge: Arc<dyn BridgeClient>,
    pub playback: Arc<dyn PlaybackBackend>,
    pub blobs: Arc<BlobStore>,
}

struct Inner {
    state: PreviewState,
    generation: u64,
    /// Generation of the start request currently in flight.
    pending_start: Option<u64>,
    player: Option<Box<dyn AdaptivePlayer>>,
}

pub struct PreviewSessionController {
    inner: Arc<Mutex<Inner>>,
    origin: Url,
    surface: Arc<dyn PreviewSurface>,
    fetcher: Arc<dyn MediaFetcher>,
    loader: Arc<dyn DirectLoader>,
    bridge: Arc<dyn BridgeClient>,
    playback: Arc<dyn PlaybackBackend>,
    blobs: Arc<BlobStore>,
}

/// Synthetic content type recorded when the kind came from sniffing.
fn wildcard_mime(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image/*",
        MediaKind::Video => "video/*",
    }
}

fn load_failure(element: &MediaElement) -> PreviewStatus {
    match element {
        MediaElement::Image { .. } => PreviewStatus::ImageLoadFailed,
        MediaElement::Video { .. } => PreviewStatus::VideoLoadFailed,
        MediaElement::Embed { .. } | MediaElement::Stream { .. } => {
            PreviewStatus::UnableToPreview
        }
    }
}

impl PreviewSessionController {
    pub fn new(config: &PreviewConfig, backends: Backends) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| anyhow!("invalid origin {}: {}", config.origin, e))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                state: PreviewState::default(),
                generation: 0,
                pending_start: None,
                player: None,
            })),
            origin,
            surface: backends.surface,
            fetcher: backends.fetcher,
            loader: backends.loader,
            bridge: backends.bridge,
            playback: backends.playback,
            blobs: backends.blobs,
        })
    }

    pub fn state(&self) -> PreviewState {
        self.inner.lock().state.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn status_if_current(&self, generation: u64, status: PreviewStatus) {
        let inner = self.inner.lock();
        if inner.generation == generation {
            self.surface.set_status(&status);
        }
    }

    fn teardown_playback(&self, inner: &mut Inner) {
        if let Some(mut player) = inner.player.take() {
            player.destroy();
        }
        self.surface.unmount_stream();
    }

    fn clear_locked(&self, inner: &mut Inner) {
        if let Some(handle) = inner.state.current.blob.take() {
            self.blobs.revoke(&handle);
        }
        if let Some(session) = inner.state.session.reset() {
            info!("ending bridge session {} with source", session.session_id);
            self.bridge.notify_stop(&session.session_id);
        }
        inner.pending_start = None;
        inner.state.current = CurrentSource::default();
        self.teardown_playback(inner);
        self.surface.show_placeholder();
        self.surface.set_status(&PreviewStatus::Idle);
        inner.generation += 1;
    }

    /// Start a new selection of `kind`: a different-kind source is torn down
    /// completely and any superseded handle released.
    fn begin_selection(&self, inner: &mut Inner, kind: SourceKind) -> u64 {
        let previous = inner.state.current.kind;
        if previous != SourceKind::None && previous != kind {
            debug!("switching source {} -> {}", previous, kind);
            self.clear_locked(inner);
        }
        if let Some(handle) = inner.state.current.blob.take() {
            self.blobs.revoke(&handle);
        }
        inner.generation += 1;
        inner.generation
    }

    /// Reset to the initial empty state.
    pub fn clear_preview(&self) {
        let mut inner = self.inner.lock();
        self.clear_locked(&mut inner);
        info!("preview cleared");
    }

    /// Mount `element` unless superseded, then report its load outcome.
    async fn render(&self, generation: u64, element: MediaElement, success: PreviewStatus) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            self.teardown_playback(&mut inner);
        }
        let failure = load_failure(&element);
        let outcome = self.surface.mount(element).await;
        let status = if outcome.is_loaded() { success } else { failure };
        self.status_if_current(generation, status);
    }

    pub async fn select_file(&self, file: LocalFile) {
        let (generation, element) = {
            let mut inner = self.inner.lock();
            let generation = self.begin_selection(&mut inner, SourceKind::File);
            let declared = file.declared_type.trim().to_ascii_lowercase();
            let handle = self.blobs.create(file.data.clone(), &declared);
            let element = kind_from_mime(&declared).map(|k| MediaElement::for_kind(k, handle.url()));

            inner.state.current = CurrentSource {
                kind: SourceKind::File,
                origin_value: Some(file.name.clone()),
                blob: Some(handle),
                embed_url: None,
                content_type: (!declared.is_empty()).then_some(declared),
            };
            info!("file selected name={} generation={}", file.name, generation);

            match element {
                Some(element) => (generation, element),
                None => {
                    self.teardown_playback(&mut inner);
                    self.surface.show_placeholder();
                    self.surface.set_status(&PreviewStatus::UnsupportedFile);
                    return;
                }
            }
        };
        self.render(generation, element, PreviewStatus::Loaded).await;
    }

    /// Resolve a remote URL: embeddable link, then fetch, then direct loading.
    pub async fn load_url(&self, raw: &str) -> Result<(), PreviewError> {
        let url = raw.trim();
        if url.is_empty() {
            return Err(PreviewError::EmptyUrl);
        }

        let embed = parse_embed_target(url);
        let generation = {
            let mut inner = self.inner.lock();
            let generation = self.begin_selection(&mut inner, SourceKind::Url);
            inner.state.current = CurrentSource::new(SourceKind::Url, url);
            inner.state.current.embed_url = embed.as_ref().map(|t| t.embed_url());
            self.surface.set_status(&PreviewStatus::FetchingRemote);
            generation
        };
        info!("url selected {} generation={}", url, generation);

        if let Some(target) = embed {
            let element = MediaElement::Embed {
                src: target.embed_url(),
            };
            self.render(generation, element, PreviewStatus::LoadedEmbedded)
                .await;
            return Ok(());
        }

        match self.fetcher.fetch(url).await {
            Ok(media) => self.apply_fetched(generation, url, media).await,
            Err(e) => {
                debug!("fetch failed for {}: {}", url, e);
                self.load_direct(generation, url).await;
            }
        }
        Ok(())
    }

    async fn apply_fetched(&self, generation: u64, url: &str, media: FetchedMedia) {
        let element = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!("discarding stale fetch of {}", url);
                return;
            }
            let kind = kind_from_mime(&media.content_type).or_else(|| kind_from_extension(url));
            let Some(kind) = kind else {
                // Dropping the body releases the fetched payload.
                warn!("unsupported content-type {:?} for {}", media.content_type, url);
                self.surface
                    .set_status(&PreviewStatus::UnsupportedRemote(media.content_type));
                return;
            };
            let content_type = if kind_from_mime(&media.content_type).is_some() {
                media.content_type.clone()
            } else {
                wildcard_mime(kind).to_string()
            };
            let handle = self.blobs.create(media.body, &content_type);
            let element = MediaElement::for_kind(kind, handle.url());
            inner.state.current.blob = Some(handle);
            inner.state.current.content_type = Some(content_type);
            element
        };
        self.render(generation, element, PreviewStatus::Loaded).await;
    }

    async fn load_direct(&self, generation: u64, url: &str) {
        self.status_if_current(generation, PreviewStatus::FetchFallback);

        for kind in [MediaKind::Image, MediaKind::Video] {
            if !self.is_current(generation) {
                return;
            }
            if self.loader.load(kind, url).await.is_loaded() {
                self.adopt_direct(generation, url, kind).await;
                return;
            }
        }
        self.status_if_current(generation, PreviewStatus::UnableToPreview);
    }

    async fn adopt_direct(&self, generation: u64, url: &str, kind: MediaKind) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.state.current.content_type = Some(wildcard_mime(kind).to_string());
            self.teardown_playback(&mut inner);
        }
        let element = match kind {
            MediaKind::Image => MediaElement::for_kind(kind, url),
            MediaKind::Video => MediaElement::Video {
                src: url.to_string(),
                autoplay: false,
                muted: false,
            },
        };
        let outcome = self.surface.mount(element).await;
        let status = if outcome.is_loaded() {
            PreviewStatus::LoadedDirect
        } else {
            PreviewStatus::UnableToPreview
        };
        self.status_if_current(generation, status);
    }

    /// Select an RTSP source and start a bridge session for it.
    pub async fn connect_rtsp(&self, raw: &str) -> Result<(), PreviewError> {
        let rtsp = raw.trim();
        if rtsp.is_empty() {
            return Err(PreviewError::EmptyRtspUrl);
        }
        {
            let mut inner = self.inner.lock();
            self.begin_selection(&mut inner, SourceKind::Rtsp);
            if let Some(old) = inner.state.session.reset() {
                info!("replacing bridge session {}", old.session_id);
                self.bridge.notify_stop(&old.session_id);
            }
            inner.pending_start = None;
            self.teardown_playback(&mut inner);
            inner.state.current = CurrentSource::new(SourceKind::Rtsp, rtsp);
        }
        self.start_session(rtsp).await;
        Ok(())
    }

    async fn start_session(&self, rtsp: &str) {
        let generation = {
            let mut inner = self.inner.lock();
            if !inner.state.session.begin_start(rtsp) {
                return;
            }
            inner.generation += 1;
            inner.pending_start = Some(inner.generation);
            self.surface.set_status(&PreviewStatus::StartingRtsp);
            inner.generation
        };
        info!("starting bridge session for {}", rtsp);

        let result = self.bridge.start(rtsp).await;

        let started = {
            let mut inner = self.inner.lock();
            let owns_start = inner.pending_start == Some(generation);
            if owns_start {
                inner.pending_start = None;
            }
            if inner.generation != generation {
                if owns_start {
                    inner.state.session.fail_start();
                }
                if let Ok(orphan) = &result {
                    warn!("start for {} superseded; stopping orphan {}", rtsp, orphan.id);
                    self.bridge.notify_stop(&orphan.id);
                }
                return;
            }
            match result {
                Ok(started) => {
                    inner.state.session.finish_start(RtspSession {
                        session_id: started.id.clone(),
                        playback_url: started.hls_url.clone(),
                    });
                    self.surface.set_status(&PreviewStatus::RtspRunning {
                        session_id: started.id.clone(),
                    });
                    started
                }
                Err(e) => {
                    warn!("bridge start failed for {}: {}", rtsp, e);
                    inner.state.session.fail_start();
                    self.surface
                        .set_status(&PreviewStatus::RtspStartFailed(e.to_string()));
                    return;
                }
            }
        };
        self.play_stream(generation, &started.hls_url).await;
    }

    async fn play_stream(&self, generation: u64, playlist_path: &str) {
        let playlist = match resolve_playlist(&self.origin, playlist_path) {
            Ok(url) => url,
            Err(e) => {
                self.status_if_current(generation, PreviewStatus::HlsError(e.to_string()));
                return;
            }
        };
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            self.teardown_playback(&mut inner);
        }
        self.surface
            .mount(MediaElement::Stream {
                src: playlist.to_string(),
            })
            .await;
        if !self.is_current(generation) {
            return;
        }

        if self.playback.supports_native_hls() {
            if let Err(e) = self.playback.play_native(&playlist).await {
                debug!("native play rejected: {}", e);
            }
            return;
        }
        if !self.playback.has_adaptive_library() {
            self.status_if_current(generation, PreviewStatus::NoHlsPlayback);
            return;
        }

        match self.playback.create_player(&playlist).await {
            Ok(mut player) => {
                let errors = player.take_errors();
                let played = {
                    let mut inner = self.inner.lock();
                    if inner.generation != generation {
                        player.destroy();
                        return;
                    }
                    let played = player.play();
                    inner.player = Some(player);
                    played
                };
                if let Err(e) = played {
                    warn!("HLS player refused to play {}: {}", playlist, e);
                    self.status_if_current(generation, PreviewStatus::HlsError(e.to_string()));
                }
                if let Some(errors) = errors {
                    self.watch_player_errors(generation, errors);
                }
            }
            Err(e) => {
                warn!("HLS player error for {}: {}", playlist, e);
                self.status_if_current(generation, PreviewStatus::HlsError(e.to_string()));
            }
        }
    }

    /// Forward runtime player errors to the status region until superseded.
    fn watch_player_errors(&self, generation: u64, mut errors: PlayerErrors) {
        let inner = self.inner.clone();
        let surface = self.surface.clone();
        tokio::spawn(async move {
            while let Some(detail) = errors.recv().await {
                let superseded = {
                    let guard = inner.lock();
                    if guard.generation == generation {
                        warn!("HLS runtime error: {}", detail);
                        surface.set_status(&PreviewStatus::HlsError(detail));
                        false
                    } else {
                        true
                    }
                };
                if superseded {
                    break;
                }
            }
        });
    }

    /// Stop the running bridge session. No-op without one.
    pub async fn stop(&self) {
        let (generation, session) = {
            let mut inner = self.inner.lock();
            let Some(session) = inner.state.session.begin_stop() else {
                debug!("stop ignored: no active session");
                return;
            };
            inner.generation += 1;
            (inner.generation, session)
        };

        if let Err(e) = self.bridge.stop(&session.session_id).await {
            warn!("stop request for {} failed: {}", session.session_id, e);
        }

        let mut inner = self.inner.lock();
        inner.state.session.finish_stop(&session.session_id);
        if inner.generation == generation {
            self.teardown_playback(&mut inner);
            self.surface.show_placeholder();
            self.surface.set_status(&PreviewStatus::RtspStopped);
        }
        info!("bridge session {} stopped", session.session_id);
    }

    /// Confirm the current source; an RTSP source without a session gets one.
    pub async fn submit(&self) -> Result<(), PreviewError> {
        let rtsp = {
            let inner = self.inner.lock();
            let current = &inner.state.current;
            if current.kind == SourceKind::None {
                return Err(PreviewError::NoSourceSelected);
            }
            let label = current
                .origin_value
                .clone()
                .unwrap_or_else(|| current.kind.to_string());
            self.surface.set_status(&PreviewStatus::Submitted(label));
            if current.kind == SourceKind::Rtsp && inner.state.session.is_idle() {
                current.origin_value.clone()
            } else {
                None
            }
        };
        if let Some(rtsp) = rtsp {
            self.start_session(&rtsp).await;
        }
        Ok(())
    }

    /// Re-render the current source. Returns the value to restore into the
    /// input field for URL and RTSP sources.
    pub async fn restore(&self) -> Option<String> {
        enum Plan {
            Render(u64, MediaElement, PreviewStatus),
            Stream(u64, String),
            Nothing,
        }

        let (plan, value) = {
            let mut inner = self.inner.lock();
            let current = inner.state.current.clone();
            // Revoked handles cannot be re-rendered.
            let blob_element = current.blob.as_ref().and_then(|handle| {
                let (_, content_type) = self.blobs.get(handle)?;
                let kind = kind_from_mime(&content_type)?;
                Some(MediaElement::for_kind(kind, handle.url()))
            });

            match current.kind {
                SourceKind::None => {
                    self.surface.set_status(&PreviewStatus::Idle);
                    (Plan::Nothing, None)
                }
                SourceKind::File => match blob_element {
                    Some(element) => {
                        inner.generation += 1;
                        (Plan::Render(inner.generation, element, PreviewStatus::Loaded), None)
                    }
                    None => (Plan::Nothing, None),
                },
                SourceKind::Url => {
                    if let Some(embed) = current.embed_url.clone() {
                        inner.generation += 1;
                        let element = MediaElement::Embed { src: embed };
                        let plan =
                            Plan::Render(inner.generation, element, PreviewStatus::LoadedEmbedded);
                        (plan, None)
                    } else if let Some(element) = blob_element {
                        inner.generation += 1;
                        (Plan::Render(inner.generation, element, PreviewStatus::Loaded), None)
                    } else {
                        self.surface.set_status(&PreviewStatus::UrlPending);
                        (Plan::Nothing, current.origin_value)
                    }
                }
                SourceKind::Rtsp => match inner.state.session.active().cloned() {
                    Some(session) => {
                        inner.generation += 1;
                        (
                            Plan::Stream(inner.generation, session.playback_url),
                            current.origin_value,
                        )
                    }
                    None => (Plan::Nothing, current.origin_value),
                },
            }
        };

        match plan {
            Plan::Render(generation, element, success) => {
                self.render(generation, element, success).await
            }
            Plan::Stream(generation, playlist) => self.play_stream(generation, &playlist).await,
            Plan::Nothing => {}
        }
        value
    }

    /// Page teardown: best-effort stop notification, never blocks.
    pub fn on_unload(&self) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.state.session.reset() {
            info!("unload: notifying bridge to stop {}", session.session_id);
            self.bridge.notify_stop(&session.session_id);
        }
        inner.pending_start = None;
        inner.generation += 1;
        self.teardown_playback(&mut inner);
    }
}
