//! The application shell: owns the documents, the blob registry and the
//! persisted mirror, and runs every user action.
//!
//! Each action logs its outcome and queues exactly one [`Notice`]. Failures
//! leave the document list untouched.

use crate::blobs::{Blob, BlobRegistry};
use crate::config::AppConfig;
use crate::error::VaultError;
use crate::flows;
use crate::models::{Document, DocumentCategory, SearchResult};
use crate::notice::Notice;
use crate::persistence;
use crate::pipeline::{ProcessedUpload, UploadError, UploadPipeline, UploadSource, UploadState};
use crate::search::{visible_documents, SearchDebouncer, SearchState};
use crate::store::DocumentStore;
use crate::upload;
use anyhow::Context;
use chrono::Utc;
use providers::LlmProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage::KvStore;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct Vault {
    config: AppConfig,
    kv: KvStore,
    llm: Arc<dyn LlmProvider>,
    store: DocumentStore,
    blobs: BlobRegistry,
    pipeline: UploadPipeline,
    debouncer: SearchDebouncer,
    notices: Vec<Notice>,
}

impl Vault {
    /// Opens the database named in the config and loads the stored documents.
    pub async fn open(config: AppConfig, llm: Arc<dyn LlmProvider>) -> anyhow::Result<Self> {
        let pool = storage::open(&config.storage.path)
            .await
            .with_context(|| format!("open storage at {}", config.storage.path))?;
        let kv = KvStore::new(pool).with_quota(config.storage.quota_bytes);
        Ok(Self::with_store(config, kv, llm).await)
    }

    pub async fn with_store(config: AppConfig, kv: KvStore, llm: Arc<dyn LlmProvider>) -> Self {
        let blobs = BlobRegistry::new();
        let documents = persistence::load(&kv, &config.storage.key, &blobs).await;
        info!(count = documents.len(), "loaded documents");
        let pipeline = UploadPipeline::new(llm.clone(), config.upload.max_file_size_bytes);
        let debouncer =
            SearchDebouncer::new(llm.clone(), Duration::from_millis(config.search.debounce_ms));
        Self {
            config,
            kv,
            llm,
            store: DocumentStore::from_documents(documents),
            blobs,
            pipeline,
            debouncer,
            notices: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn documents(&self) -> &[Document] {
        self.store.documents()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.store.get(id)
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Bytes behind a document's ephemeral handle, while it is still live.
    pub fn file_contents(&self, document: &Document) -> Option<&Blob> {
        self.blobs.resolve(&document.file_url)
    }

    /// MIME type and bytes of a document's file, from its live handle or a
    /// `data:` URI stored in `fileUrl`.
    pub fn file_data(&self, document: &Document) -> Option<(String, Vec<u8>)> {
        if let Some(blob) = self.file_contents(document) {
            return Some((blob.mime.clone(), blob.bytes.to_vec()));
        }
        upload::decode_data_uri(&document.file_url)
    }

    /// Writes the file behind document `id` to `dest`. A directory gets the
    /// document's original file name appended. Returns the path written.
    pub async fn export(&self, id: &str, dest: &Path) -> Result<PathBuf, VaultError> {
        let document = self
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        let (_, bytes) = self
            .file_data(document)
            .ok_or_else(|| VaultError::FileUnavailable(id.to_string()))?;
        let target = if dest.is_dir() {
            dest.join(&document.file_name)
        } else {
            dest.to_path_buf()
        };
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|source| VaultError::FileWrite {
                path: target.display().to_string(),
                source,
            })?;
        info!(id, path = %target.display(), bytes = bytes.len(), "document exported");
        Ok(target)
    }

    /// Drains queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn upload_state(&self) -> watch::Receiver<UploadState> {
        self.pipeline.subscribe()
    }

    /// Runs the full pipeline for one file and commits the result.
    ///
    /// Taking `&mut self` keeps a second upload from starting while one is in
    /// flight.
    pub async fn upload(&mut self, source: impl Into<UploadSource>) -> Result<Document, UploadError> {
        let source = source.into();
        let name = source.display_name();
        match self.pipeline.run(source).await {
            Ok(processed) => {
                let document = self.commit(processed);
                self.pipeline.mark_committed(&document.id);
                info!(id = %document.id, file = %document.file_name, category = %document.category, "document committed");
                self.notices.push(Notice::info(
                    "Upload Successful",
                    format!("{} has been processed and saved.", name),
                ));
                self.persist().await;
                Ok(document)
            }
            Err(err) => {
                error!("processing {} failed: {}", name, err);
                self.notices.push(Notice::error(
                    "Upload failed",
                    format!(
                        "{} could not be processed while {}. Please try again.",
                        name, err.stage
                    ),
                ));
                Err(err)
            }
        }
    }

    fn commit(&mut self, processed: ProcessedUpload) -> Document {
        let ProcessedUpload {
            file,
            data_uri,
            metadata,
            category,
            key_info,
        } = processed;
        let id = uuid::Uuid::new_v4().to_string();
        let file_url = if self.config.upload.embed_file_data {
            data_uri
        } else {
            self.blobs.register(&id, &file.mime, file.bytes)
        };
        let document = Document {
            id,
            file_name: file.name,
            file_url,
            file_type: file.mime,
            category: category.category,
            metadata,
            key_info,
            created_at: Utc::now(),
        };
        self.store.commit(document.clone());
        document
    }

    /// Deletes one document and releases its file handle.
    pub async fn delete(&mut self, id: &str) -> Result<Document, VaultError> {
        let Some(removed) = self.store.remove(id) else {
            warn!(id, "delete of unknown document");
            self.notices
                .push(Notice::error("Document not found", format!("No document with id {}.", id)));
            return Err(VaultError::NotFound(id.to_string()));
        };
        self.blobs.release(id);
        info!(id, file = %removed.file_name, "document deleted");
        self.notices.push(Notice::info(
            "Document Deleted",
            "The document has been successfully deleted.",
        ));
        self.persist().await;
        Ok(removed)
    }

    /// Drops every document and file handle and restores the sample.
    pub async fn reset(&mut self) {
        let released = self.blobs.release_all();
        if let Err(e) = self.kv.remove(&self.config.storage.key).await {
            warn!("failed to clear stored documents: {}", e);
        }
        self.store.reset();
        self.pipeline.reset();
        self.debouncer.submit("", Vec::new());
        info!(released, "vault reset");
        self.notices.push(Notice::info(
            "Data Cleared",
            "All local documents have been removed.",
        ));
    }

    /// One-shot ranked search over every held document. An empty query
    /// returns nothing without calling the model.
    pub async fn search(&mut self, query: &str) -> Result<Vec<SearchResult>, VaultError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let summaries = self.store.summaries();
        match flows::document_search(self.llm.as_ref(), query, &summaries).await {
            Ok(results) => Ok(results),
            Err(e) => {
                error!("search for {:?} failed: {}", query, e);
                self.notices.push(Notice::error(
                    "Search failed",
                    "The search could not be completed. Please try again.",
                ));
                Err(VaultError::Search(e))
            }
        }
    }

    /// Feeds the debounced search with the latest query text.
    pub fn submit_query(&mut self, query: &str) {
        let summaries = self.store.summaries();
        self.debouncer.submit(query, summaries);
    }

    /// Waits for the latest debounced query to settle. A failed search
    /// queues a notice.
    pub async fn settle_search(&mut self) -> SearchState {
        let state = self.debouncer.settled().await;
        if state.error.is_some() {
            self.notices.push(Notice::error(
                "Search failed",
                "The search could not be completed. Please try again.",
            ));
        }
        state
    }

    /// Documents for `category` under the current debounced search.
    pub fn visible_documents(&self, category: Option<DocumentCategory>) -> Vec<&Document> {
        let state = self.debouncer.state();
        visible_documents(self.store.documents(), category, &state)
    }

    /// Best effort: storage failures are logged and reported but the
    /// in-memory list stays authoritative.
    async fn persist(&mut self) {
        let key = self.config.storage.key.clone();
        if let Err(e) = persistence::save(&self.kv, &key, self.store.documents()).await {
            error!("failed to save documents: {}", e);
            self.notices.push(Notice::error(
                "Saving failed",
                "Your documents could not be saved and will be lost on restart.",
            ));
        }
    }
}
