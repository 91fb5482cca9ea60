use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::detect::media_kind::mime_from_extension;

/// A user-selected local file with its declared media type.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    /// Declared MIME type; empty when the platform could not tell.
    pub declared_type: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            data,
        }
    }

    /// Read a file from disk, declaring its type from the extension.
    pub async fn open(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let declared_type = mime_from_extension(&name).unwrap_or("").to_string();
        Ok(Self::new(name, declared_type, Bytes::from(data)))
    }
}
