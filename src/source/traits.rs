use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::detect::media_kind::MediaKind;

/// A successfully fetched remote resource.
pub struct FetchedMedia {
    /// Lowercased `content-type` header, empty when the server sent none.
    pub content_type: String,
    pub body: Bytes,
}

/// Whether a media element managed to load its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

impl LoadOutcome {
    pub fn is_loaded(self) -> bool {
        self == LoadOutcome::Loaded
    }
}

/// Cross-origin style fetch: any transport failure, policy block or
/// non-success status is an `Err`.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// Element-native load attempt used when a fetch is refused.
#[async_trait]
pub trait DirectLoader: Send + Sync {
    async fn load(&self, kind: MediaKind, url: &str) -> LoadOutcome;
}
