//! Plain-text rendering of documents for the terminal.

use docvault_core::notice::{Notice, NoticeLevel};
use docvault_core::pipeline::UploadState;
use docvault_core::{Document, SearchResult};
use std::fmt::Write;

/// Turns a camelCase metadata key into a Title Case label:
/// `dateOfIssue` becomes `Date Of Issue`.
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else {
            if ch.is_uppercase() {
                out.push(' ');
            }
            out.push(ch);
        }
    }
    out
}

/// One line per document: id, category, file name and upload date.
pub fn document_row(doc: &Document) -> String {
    format!(
        "{:<36}  {:<13} {}  ({})",
        doc.id,
        doc.category.as_str(),
        doc.file_name,
        doc.created_at.format("%Y-%m-%d")
    )
}

pub fn search_row(doc: &Document, result: Option<&SearchResult>) -> String {
    match result {
        Some(r) => format!("{:>5.2}  {}", r.relevance_score, document_row(doc)),
        None => format!("{:>5}  {}", "-", document_row(doc)),
    }
}

pub fn notice_line(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{}] {}: {}", tag, notice.title, notice.description)
}

/// Progress line for an upload state; `None` while idle.
pub fn upload_state_line(state: &UploadState) -> Option<String> {
    let line = match state {
        UploadState::Idle => return None,
        UploadState::Reading { file_name } => format!("reading {}...", file_name),
        UploadState::Summarizing => "summarizing...".to_string(),
        UploadState::Categorizing => "categorizing...".to_string(),
        UploadState::ExtractingKeyInfo => "extracting key info...".to_string(),
        UploadState::Committed { document_id } => format!("saved as {}", document_id),
        UploadState::Failed { stage, message } => format!("failed while {}: {}", stage, message),
    };
    Some(line)
}

/// Full view of one document. Empty metadata fields are skipped.
pub fn document_detail(doc: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.file_name);
    let _ = writeln!(out, "  Id: {}", doc.id);
    let _ = writeln!(out, "  Category: {}", doc.category);
    let _ = writeln!(out, "  File Type: {}", doc.file_type);
    let _ = writeln!(out, "  Uploaded: {}", doc.created_at.format("%Y-%m-%d %H:%M"));
    if doc.file_url.is_empty() {
        let _ = writeln!(out, "  File: unavailable");
    }

    let _ = writeln!(out, "Metadata");
    for (key, value) in doc.metadata.fields() {
        let _ = writeln!(out, "  {}: {}", title_case(&key), value);
    }

    if !doc.key_info.is_empty() {
        let _ = writeln!(out, "Key Information");
        for info in &doc.key_info {
            let _ = writeln!(out, "  {}: {}", info.label, info.value);
        }
    }
    out
}
