//! Reading user-selected files and turning them into `data:` URIs.

use crate::error::VaultError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// A file picked for upload, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        let mime = detect_mime(name, &bytes);
        Self {
            name: name.to_string(),
            mime,
            bytes,
        }
    }

    pub fn with_mime(name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> Result<Self, VaultError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| VaultError::FileRead {
                path: path.display().to_string(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(&name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `limit` of zero disables the check.
    pub fn ensure_within(&self, limit: u64) -> Result<(), VaultError> {
        if limit > 0 && self.size() > limit {
            return Err(VaultError::FileTooLarge {
                name: self.name.clone(),
                size: self.size(),
                limit,
            });
        }
        Ok(())
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Sniffs content first, then falls back to the file extension.
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    guess_mime(name).to_string()
}

fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "txt" | "md" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and payload.
pub fn parse_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    if mime.is_empty() {
        return None;
    }
    Some((mime, payload))
}

/// Decodes a base64 `data:` URI back into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let (mime, payload) = parse_data_uri(uri)?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}
