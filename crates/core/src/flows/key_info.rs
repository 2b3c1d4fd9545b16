use super::run_flow;
use crate::models::KeyInfo;
use providers::{GenerateRequest, LlmProvider, ProviderError};
use serde::Deserialize;
use serde_json::{json, Value};

pub const PROMPT_NAME: &str = "extractKeyInfo";

const TEMPLATE: &str = r#"You are an assistant that extracts key facts from documents.

Go through the document text below and pick out contact details, identifiers and other critical data points. Give each one a short, clear label and its value, for example:
- Email Address
- Phone Number
- Website or Portfolio URL
- Account Number
- Member ID
- Policy Number

Document text:
{document_text}

Reply with a JSON object: {"keyInfo": [{"label": "...", "value": "..."}]}"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    key_info: Vec<KeyInfo>,
}

pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keyInfo": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "value": { "type": "string" }
                    },
                    "required": ["label", "value"]
                }
            }
        },
        "required": ["keyInfo"]
    })
}

/// Extracts labelled facts, in the order the model lists them.
pub async fn extract_key_info(
    llm: &dyn LlmProvider,
    document_text: &str,
) -> Result<Vec<KeyInfo>, ProviderError> {
    let request = GenerateRequest::new(
        PROMPT_NAME,
        TEMPLATE.replace("{document_text}", document_text),
    )
    .with_schema(output_schema());
    let output: Output = run_flow(llm, request).await?;
    Ok(output.key_info)
}
