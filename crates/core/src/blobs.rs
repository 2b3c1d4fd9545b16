//! Session-scoped file contents behind ephemeral `blob:` handles.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const BLOB_URL_PREFIX: &str = "blob:docvault/";

pub fn is_ephemeral_url(url: &str) -> bool {
    url.starts_with("blob:")
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub url: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

/// Owns the bytes behind every live ephemeral handle, keyed by document id.
///
/// Handles are never serialized; once released (or once the process exits)
/// they cannot be resolved again.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    by_document: HashMap<String, Blob>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers file contents for `document_id` and returns a fresh handle.
    /// An existing handle for the same document is released first.
    pub fn register(&mut self, document_id: &str, mime: &str, bytes: Vec<u8>) -> String {
        let url = format!("{}{}", BLOB_URL_PREFIX, uuid::Uuid::new_v4());
        let blob = Blob {
            url: url.clone(),
            mime: mime.to_string(),
            bytes: bytes.into(),
        };
        if let Some(old) = self.by_document.insert(document_id.to_string(), blob) {
            debug!(document_id, url = %old.url, "replaced blob handle");
        }
        url
    }

    pub fn url_for(&self, document_id: &str) -> Option<&str> {
        self.by_document.get(document_id).map(|b| b.url.as_str())
    }

    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.by_document.values().find(|b| b.url == url)
    }

    pub fn release(&mut self, document_id: &str) -> bool {
        let released = self.by_document.remove(document_id).is_some();
        if released {
            debug!(document_id, "released blob handle");
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.by_document.len();
        self.by_document.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.by_document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }
}
