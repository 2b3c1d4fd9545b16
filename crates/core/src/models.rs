use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    Education,
    #[serde(rename = "ID")]
    Id,
    Medical,
    Employment,
    Legal,
    Financial,
    Personal,
    Other,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 8] = [
        DocumentCategory::Education,
        DocumentCategory::Id,
        DocumentCategory::Medical,
        DocumentCategory::Employment,
        DocumentCategory::Legal,
        DocumentCategory::Financial,
        DocumentCategory::Personal,
        DocumentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Education => "Education",
            DocumentCategory::Id => "ID",
            DocumentCategory::Medical => "Medical",
            DocumentCategory::Employment => "Employment",
            DocumentCategory::Legal => "Legal",
            DocumentCategory::Financial => "Financial",
            DocumentCategory::Personal => "Personal",
            DocumentCategory::Other => "Other",
        }
    }

    /// Maps free-form model output onto the closed set. Anything unrecognised
    /// lands in `Other`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(DocumentCategory::Other)
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DocumentCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Fields extracted from a document by the model. Only `summary` is
/// guaranteed; providers may add fields of their own, kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub summary: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DocumentMetadata {
    /// Non-empty fields as `(camelCaseKey, value)` pairs, summary first.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut out = vec![("summary".to_string(), self.summary.clone())];
        let known = [
            ("documentType", Some(&self.document_type)),
            ("name", Some(&self.name)),
            ("dateOfIssue", self.date_of_issue.as_ref()),
            ("expiryDate", self.expiry_date.as_ref()),
            ("location", self.location.as_ref()),
            ("issuingAuthority", self.issuing_authority.as_ref()),
        ];
        for (key, value) in known {
            if let Some(v) = value {
                out.push((key.to_string(), v.clone()));
            }
        }
        for (key, value) in &self.extra {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            out.push((key.clone(), text));
        }
        out.retain(|(_, v)| !v.trim().is_empty());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub label: String,
    pub value: String,
}

impl KeyInfo {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_name: String,
    /// Durable URL, `data:` URI, or an ephemeral `blob:` handle. Empty once an
    /// ephemeral handle has been dropped by persistence.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_url: String,
    pub file_type: String,
    pub category: DocumentCategory,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub key_info: Vec<KeyInfo>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn has_ephemeral_file(&self) -> bool {
        crate::blobs::is_ephemeral_url(&self.file_url)
    }

    pub fn is_sample(&self) -> bool {
        self.id == crate::sample::SAMPLE_DOCUMENT_ID
    }

    pub fn summary(&self) -> &str {
        &self.metadata.summary
    }
}

/// `{documentId, summary}` pair handed to the search flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document_id: String,
    pub summary: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            document_id: doc.id.clone(),
            summary: doc.metadata.summary.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub document_id: String,
    pub relevance_score: f32,
}
