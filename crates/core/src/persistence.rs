//! Mirrors the document list into a single key of the key/value store.

use crate::blobs::BlobRegistry;
use crate::models::Document;
use crate::sample::sample_document;
use storage::{KvStore, StorageError};
use tracing::{debug, warn};

/// Writes the full list under `key`, replacing what was there.
///
/// Ephemeral file handles are not written. A list holding only the sample
/// (or nothing) clears the key instead.
pub async fn save(kv: &KvStore, key: &str, documents: &[Document]) -> Result<(), StorageError> {
    let sample_only = documents.len() == 1 && documents[0].is_sample();
    if documents.is_empty() || sample_only {
        kv.remove(key).await?;
        debug!(key, "cleared stored documents");
        return Ok(());
    }

    let durable: Vec<Document> = documents.iter().map(durable_copy).collect();
    let json = serde_json::to_string(&durable)?;
    kv.set(key, &json).await?;
    debug!(key, count = durable.len(), "saved documents");
    Ok(())
}

fn durable_copy(doc: &Document) -> Document {
    let mut copy = doc.clone();
    if copy.has_ephemeral_file() {
        copy.file_url.clear();
    }
    copy
}

/// Reads the list under `key`. Missing, empty and unreadable data all yield
/// the sample document. Documents with a live blob get their handle back.
pub async fn load(kv: &KvStore, key: &str, blobs: &BlobRegistry) -> Vec<Document> {
    let raw = match kv.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return vec![sample_document()],
        Err(e) => {
            warn!("failed to read stored documents: {}", e);
            return vec![sample_document()];
        }
    };

    let mut documents: Vec<Document> = match serde_json::from_str(&raw) {
        Ok(docs) => docs,
        Err(e) => {
            warn!("failed to parse stored documents: {}", e);
            return vec![sample_document()];
        }
    };
    if documents.is_empty() {
        return vec![sample_document()];
    }

    for doc in &mut documents {
        if let Some(url) = blobs.url_for(&doc.id) {
            doc.file_url = url.to_string();
        }
    }
    documents
}
