use super::run_flow;
use crate::models::DocumentMetadata;
use crate::upload::parse_data_uri;
use providers::{GenerateRequest, LlmProvider, Media, ProviderError};
use serde_json::{json, Value};

pub const PROMPT_NAME: &str = "summarizeAndExtractMetadata";

const TEMPLATE: &str = r#"You are an assistant that summarizes documents and pulls out their key metadata.

Read the attached document and report:
- summary: a short summary of what the document contains
- documentType: the kind of document (for example Diploma, Passport, Prescription)
- name: the person or organisation the document belongs to
- dateOfIssue: when the document was issued, if shown
- expiryDate: when the document expires, if it does
- issuingAuthority: the organisation or authority that issued it

Reply with a single JSON object using exactly those keys."#;

pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string", "description": "Short summary of the document content." },
            "documentType": { "type": "string", "description": "Kind of document, e.g. Diploma, Passport." },
            "name": { "type": "string", "description": "Person or entity the document belongs to." },
            "dateOfIssue": { "type": "string", "description": "Date the document was issued." },
            "expiryDate": { "type": "string", "description": "Expiry date, if applicable." },
            "issuingAuthority": { "type": "string", "description": "Organisation that issued the document." }
        },
        "required": ["summary", "documentType", "name"]
    })
}

/// Summarizes the document behind `document_data_uri` and extracts its
/// metadata. The URI must be `data:<mime>;base64,<payload>`.
pub async fn summarize_and_extract_metadata(
    llm: &dyn LlmProvider,
    document_data_uri: &str,
) -> Result<DocumentMetadata, ProviderError> {
    let (mime, _) = parse_data_uri(document_data_uri).ok_or_else(|| {
        ProviderError::InvalidRequest("document must be a base64 data URI with a MIME type".into())
    })?;

    let request = GenerateRequest::new(PROMPT_NAME, TEMPLATE.to_string())
        .with_schema(output_schema())
        .with_media(Media {
            url: document_data_uri.to_string(),
            content_type: Some(mime.to_string()),
        });

    let metadata: DocumentMetadata = run_flow(llm, request).await?;
    if metadata.summary.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(format!(
            "{}: summary is empty",
            PROMPT_NAME
        )));
    }
    Ok(metadata)
}
