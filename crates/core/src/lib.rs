//! Core library: document model, AI flows, upload pipeline, search and the
//! vault shell that ties them to persistent storage.

pub mod blobs;
pub mod config;
pub mod error;
pub mod flows;
pub mod models;
pub mod notice;
pub mod persistence;
pub mod pipeline;
pub mod registry;
pub mod sample;
pub mod search;
pub mod store;
pub mod upload;
pub mod vault;

pub use error::VaultError;
pub use models::{Document, DocumentCategory, DocumentMetadata, KeyInfo, SearchResult};
pub use vault::Vault;
