//! Upload pipeline: read the file, then summarize, categorize and extract key
//! facts, one stage after another.
//!
//! Progress is published as an [`UploadState`] on a watch channel. A failure
//! in any stage ends the run with that stage attached; nothing is committed
//! by the pipeline itself.

use crate::error::VaultError;
use crate::flows::{self, CategoryPrediction};
use crate::models::{DocumentMetadata, KeyInfo};
use crate::upload::UploadFile;
use providers::LlmProvider;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Reading,
    Summarizing,
    Categorizing,
    ExtractingKeyInfo,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Reading => "reading",
            Stage::Summarizing => "summarizing",
            Stage::Categorizing => "categorizing",
            Stage::ExtractingKeyInfo => "extracting key info",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Reading { file_name: String },
    Summarizing,
    Categorizing,
    ExtractingKeyInfo,
    Committed { document_id: String },
    Failed { stage: Stage, message: String },
}

impl UploadState {
    fn entering(stage: Stage, file_name: &str) -> Self {
        match stage {
            Stage::Reading => UploadState::Reading {
                file_name: file_name.to_string(),
            },
            Stage::Summarizing => UploadState::Summarizing,
            Stage::Categorizing => UploadState::Categorizing,
            Stage::ExtractingKeyInfo => UploadState::ExtractingKeyInfo,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Committed { .. } | UploadState::Failed { .. }
        )
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self, UploadState::Idle) && !self.is_terminal()
    }
}

#[derive(Debug, Error)]
#[error("upload failed while {stage}: {source}")]
pub struct UploadError {
    pub stage: Stage,
    #[source]
    pub source: VaultError,
}

/// What to upload: a path still to be read, or a file already in memory.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Path(PathBuf),
    File(UploadFile),
}

impl UploadSource {
    pub fn display_name(&self) -> String {
        match self {
            UploadSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            UploadSource::File(f) => f.name.clone(),
        }
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<UploadFile> for UploadSource {
    fn from(file: UploadFile) -> Self {
        UploadSource::File(file)
    }
}

/// Output of a successful run, ready to be turned into a document.
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    pub file: UploadFile,
    pub data_uri: String,
    pub metadata: DocumentMetadata,
    pub category: CategoryPrediction,
    pub key_info: Vec<KeyInfo>,
}

pub struct UploadPipeline {
    llm: Arc<dyn LlmProvider>,
    max_file_size_bytes: u64,
    state: watch::Sender<UploadState>,
}

impl UploadPipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, max_file_size_bytes: u64) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            llm,
            max_file_size_bytes,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    fn set_state(&self, state: UploadState) {
        self.state.send_replace(state);
    }

    /// Announces `stage`, then drives its future. The future is lazy, so no
    /// work starts before the state change is visible.
    async fn stage<T, F>(&self, stage: Stage, file_name: &str, work: F) -> Result<T, UploadError>
    where
        F: Future<Output = Result<T, VaultError>>,
    {
        self.set_state(UploadState::entering(stage, file_name));
        info!(file = file_name, "upload stage: {}", stage);
        work.await.map_err(|source| {
            warn!(file = file_name, "upload failed while {}: {}", stage, source);
            self.set_state(UploadState::Failed {
                stage,
                message: source.to_string(),
            });
            UploadError { stage, source }
        })
    }

    pub async fn run(&self, source: UploadSource) -> Result<ProcessedUpload, UploadError> {
        let name = source.display_name();
        let llm = self.llm.as_ref();

        let file = self
            .stage(Stage::Reading, &name, async {
                let file = match source {
                    UploadSource::Path(path) => UploadFile::read(&path).await?,
                    UploadSource::File(file) => file,
                };
                file.ensure_within(self.max_file_size_bytes)?;
                Ok::<_, VaultError>(file)
            })
            .await?;
        let data_uri = file.to_data_uri();

        let metadata = self
            .stage(Stage::Summarizing, &name, async {
                Ok::<_, VaultError>(flows::summarize_and_extract_metadata(llm, &data_uri).await?)
            })
            .await?;

        let category = self
            .stage(Stage::Categorizing, &name, async {
                Ok::<_, VaultError>(flows::auto_categorize_documents(llm, &metadata.summary).await?)
            })
            .await?;

        let key_info = self
            .stage(Stage::ExtractingKeyInfo, &name, async {
                Ok::<_, VaultError>(flows::extract_key_info(llm, &metadata.summary).await?)
            })
            .await?;

        Ok(ProcessedUpload {
            file,
            data_uri,
            metadata,
            category,
            key_info,
        })
    }

    pub fn mark_committed(&self, document_id: &str) {
        self.set_state(UploadState::Committed {
            document_id: document_id.to_string(),
        });
    }

    pub fn reset(&self) {
        self.set_state(UploadState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::{categorize, key_info, summarize};
    use providers::scripted::ScriptedProvider;
    use serde_json::json;

    fn happy_provider() -> ScriptedProvider {
        ScriptedProvider::new()
            .reply_json(
                summarize::PROMPT_NAME,
                json!({ "summary": "Bachelor's diploma for Jane Roe", "documentType": "Diploma", "name": "Jane Roe" }),
            )
            .reply_json(
                categorize::PROMPT_NAME,
                json!({ "category": "Education", "confidence": 0.9 }),
            )
            .reply_json(
                key_info::PROMPT_NAME,
                json!({ "keyInfo": [{ "label": "Degree", "value": "BSc" }] }),
            )
    }

    fn file() -> UploadSource {
        UploadFile::with_mime("diploma.png", "image/png", vec![7; 32]).into()
    }

    #[tokio::test]
    async fn stages_run_in_order_and_feed_the_summary_forward() {
        let llm = Arc::new(happy_provider());
        let pipeline = UploadPipeline::new(llm.clone(), 1024);
        let out = pipeline.run(file()).await.unwrap();

        assert_eq!(out.category.category, crate::models::DocumentCategory::Education);
        assert_eq!(out.key_info, vec![KeyInfo::new("Degree", "BSc")]);

        let names: Vec<String> = llm.calls().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                summarize::PROMPT_NAME,
                categorize::PROMPT_NAME,
                key_info::PROMPT_NAME
            ]
        );
        for call in &llm.calls()[1..] {
            assert!(call.prompt.contains("Bachelor's diploma for Jane Roe"));
        }
        assert_eq!(pipeline.state(), UploadState::ExtractingKeyInfo);
    }

    #[tokio::test]
    async fn failure_is_tagged_with_its_stage() {
        let llm = Arc::new(
            ScriptedProvider::new()
                .reply_json(
                    summarize::PROMPT_NAME,
                    json!({ "summary": "s", "documentType": "t", "name": "n" }),
                )
                .fail(categorize::PROMPT_NAME, "model down"),
        );
        let pipeline = UploadPipeline::new(llm.clone(), 0);
        let err = pipeline.run(file()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Categorizing);
        assert!(matches!(
            pipeline.state(),
            UploadState::Failed { stage: Stage::Categorizing, .. }
        ));
        assert_eq!(llm.call_count(key_info::PROMPT_NAME), 0);
    }

    #[tokio::test]
    async fn oversized_files_fail_while_reading() {
        let llm = Arc::new(happy_provider());
        let pipeline = UploadPipeline::new(llm.clone(), 8);
        let err = pipeline.run(file()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Reading);
        assert!(matches!(err.source, VaultError::FileTooLarge { .. }));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_the_terminal_state() {
        let pipeline = UploadPipeline::new(Arc::new(happy_provider()), 0);
        let rx = pipeline.subscribe();
        assert_eq!(*rx.borrow(), UploadState::Idle);
        pipeline.run(file()).await.unwrap();
        pipeline.mark_committed("doc-1");
        assert!(rx.borrow().is_terminal());
        pipeline.reset();
        assert!(!rx.borrow().is_busy());
    }
}
