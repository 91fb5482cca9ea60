// Rendering surface: the preview container plus the status region.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

use super::state::PreviewStatus;
use crate::detect::media_kind::MediaKind;
use crate::source::traits::LoadOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaElement {
    Image { src: String },
    Video { src: String, autoplay: bool, muted: bool },
    Embed { src: String },
    /// Adaptive-stream video element: muted, autoplay, with controls.
    Stream { src: String },
}

impl MediaElement {
    /// Element for a previewed blob or remote resource.
    pub fn for_kind(kind: MediaKind, src: &str) -> Self {
        match kind {
            MediaKind::Image => MediaElement::Image {
                src: src.to_string(),
            },
            MediaKind::Video => MediaElement::Video {
                src: src.to_string(),
                autoplay: true,
                muted: true,
            },
        }
    }

    pub fn src(&self) -> &str {
        match self {
            MediaElement::Image { src }
            | MediaElement::Video { src, .. }
            | MediaElement::Embed { src }
            | MediaElement::Stream { src } => src,
        }
    }
}

/// Exactly one element is mounted at a time; mounting replaces the previous one.
#[async_trait]
pub trait PreviewSurface: Send + Sync {
    /// Mount `element` and resolve once it loaded or failed.
    async fn mount(&self, element: MediaElement) -> LoadOutcome;

    /// Pause and remove the adaptive-stream element, if mounted.
    fn unmount_stream(&self);

    /// Empty the container and show the "No preview" placeholder.
    fn show_placeholder(&self);

    fn set_status(&self, status: &PreviewStatus);
}

#[derive(Debug, Default)]
struct SurfaceInner {
    mounted: Option<MediaElement>,
    placeholder: bool,
    status: String,
    mounts: Vec<MediaElement>,
    failing: HashSet<String>,
}

/// Headless surface that records what would be on screen.
#[derive(Debug)]
pub struct MemorySurface {
    inner: Mutex<SurfaceInner>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SurfaceInner {
                placeholder: true,
                status: PreviewStatus::Idle.to_string(),
                ..SurfaceInner::default()
            }),
        }
    }

    /// Make every future mount of `src` report a load failure.
    pub fn fail_src(&self, src: &str) {
        self.inner.lock().failing.insert(src.to_string());
    }

    pub fn mounted(&self) -> Option<MediaElement> {
        self.inner.lock().mounted.clone()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.inner.lock().placeholder
    }

    pub fn status(&self) -> String {
        self.inner.lock().status.clone()
    }

    /// Every element mounted so far, oldest first.
    pub fn mounts(&self) -> Vec<MediaElement> {
        self.inner.lock().mounts.clone()
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewSurface for MemorySurface {
    async fn mount(&self, element: MediaElement) -> LoadOutcome {
        let mut inner = self.inner.lock();
        let failed = inner.failing.contains(element.src());
        inner.mounts.push(element.clone());
        inner.mounted = Some(element);
        inner.placeholder = false;
        if failed {
            LoadOutcome::Failed
        } else {
            LoadOutcome::Loaded
        }
    }

    fn unmount_stream(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.mounted, Some(MediaElement::Stream { .. })) {
            inner.mounted = None;
        }
    }

    fn show_placeholder(&self) {
        let mut inner = self.inner.lock();
        inner.mounted = None;
        inner.placeholder = true;
    }

    fn set_status(&self, status: &PreviewStatus) {
        self.inner.lock().status = status.to_string();
    }
}
