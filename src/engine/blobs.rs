// Transient handle store: in-memory payloads referenced by revocable `blob:` URLs.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Revocable reference to a payload held by a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct StoredBlob {
    data: Bytes,
    content_type: String,
}

pub struct BlobStore {
    entries: Mutex<HashMap<BlobHandle, StoredBlob>>,
    next_id: AtomicU64,
    revoked: AtomicU64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            revoked: AtomicU64::new(0),
        }
    }

    pub fn create(&self, data: Bytes, content_type: &str) -> BlobHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = BlobHandle(format!("blob:preview/{}", id));
        debug!("blob created {} bytes={} type={}", handle, data.len(), content_type);
        self.entries.lock().insert(
            handle.clone(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        handle
    }

    /// Payload and content type, or `None` once revoked.
    pub fn get(&self, handle: &BlobHandle) -> Option<(Bytes, String)> {
        self.entries
            .lock()
            .get(handle)
            .map(|b| (b.data.clone(), b.content_type.clone()))
    }

    /// Release a handle. Revoking an unknown or already revoked handle is a no-op.
    pub fn revoke(&self, handle: &BlobHandle) -> bool {
        let removed = self.entries.lock().remove(handle).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            debug!("blob revoked {}", handle);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_is_idempotent() {
        let store = BlobStore::new();
        let handle = store.create(Bytes::from_static(b"abc"), "image/png");
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.get(&handle).unwrap().1, "image/png");

        assert!(store.revoke(&handle));
        assert!(!store.revoke(&handle));
        assert_eq!(store.revoked_count(), 1);
        assert_eq!(store.live_count(), 0);
        assert!(store.get(&handle).is_none());
    }

    #[test]
    fn test_handles_are_unique() {
        let store = BlobStore::new();
        let a = store.create(Bytes::new(), "");
        let b = store.create(Bytes::new(), "");
        assert_ne!(a, b);
        assert!(a.url().starts_with("blob:"));
    }
}
