use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("search failed: {0}")]
    Search(#[source] ProviderError),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("the file for document {0} is no longer available")]
    FileUnavailable(String),
    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
