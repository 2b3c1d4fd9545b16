use crate::models::{Document, DocumentCategory, DocumentMetadata, KeyInfo};
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

pub const SAMPLE_DOCUMENT_ID: &str = "sample-resume-1";

/// Placeholder shown while the vault holds no real documents. Fully
/// deterministic so resetting twice yields identical state.
pub fn sample_document() -> Document {
    Document {
        id: SAMPLE_DOCUMENT_ID.to_string(),
        file_name: "John_Doe_Resume.png".to_string(),
        file_url: "https://placehold.co/850x1100.png".to_string(),
        file_type: "image/png".to_string(),
        category: DocumentCategory::Employment,
        metadata: DocumentMetadata {
            summary: "A software engineer and project lead with a record of shipping \
                      products on schedule, looking for a role that combines technical \
                      depth with team leadership."
                .to_string(),
            document_type: "Resume".to_string(),
            name: "John Doe".to_string(),
            date_of_issue: None,
            expiry_date: None,
            location: Some("San Francisco, CA".to_string()),
            issuing_authority: Some("Self-published".to_string()),
            extra: BTreeMap::new(),
        },
        key_info: vec![
            KeyInfo::new("Email", "john.doe@example.com"),
            KeyInfo::new("Phone", "123-456-7890"),
            KeyInfo::new("Website", "johndoe.dev"),
            KeyInfo::new("LinkedIn", "linkedin.com/in/johndoe"),
            KeyInfo::new(
                "Primary Skills",
                "React, Node.js, TypeScript, Project Management",
            ),
        ],
        // 2024-01-01T00:00:00Z
        created_at: Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default(),
    }
}
