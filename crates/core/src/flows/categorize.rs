use super::run_flow;
use crate::models::DocumentCategory;
use providers::{GenerateRequest, LlmProvider, ProviderError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const PROMPT_NAME: &str = "autoCategorizeDocuments";

const TEMPLATE: &str = r#"You are an expert at sorting personal documents into categories.

Given the text of a document, predict its category and say how confident you are, from 0 to 1.

Allowed categories: {categories}.

Document text: {document_text}

Reply with a JSON object: {"category": "...", "confidence": 0.0}"#;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryPrediction {
    pub category: DocumentCategory,
    pub confidence: f32,
}

#[derive(Deserialize)]
struct RawPrediction {
    category: String,
    #[serde(default)]
    confidence: f32,
}

pub fn output_schema() -> Value {
    let names: Vec<&str> = DocumentCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "enum": names },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
        },
        "required": ["category", "confidence"]
    })
}

fn render(document_text: &str) -> String {
    let categories = DocumentCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    TEMPLATE
        .replace("{categories}", &categories)
        .replace("{document_text}", document_text)
}

/// Predicts the category of a document from its text (in practice, its
/// summary). Labels outside the closed set become `Other`.
pub async fn auto_categorize_documents(
    llm: &dyn LlmProvider,
    document_text: &str,
) -> Result<CategoryPrediction, ProviderError> {
    let request =
        GenerateRequest::new(PROMPT_NAME, render(document_text)).with_schema(output_schema());
    let raw: RawPrediction = run_flow(llm, request).await?;
    let confidence = if raw.confidence.is_finite() {
        raw.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(CategoryPrediction {
        category: DocumentCategory::from_label(&raw.category),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::scripted::ScriptedProvider;

    #[tokio::test]
    async fn maps_labels_and_clamps_confidence() {
        let llm = ScriptedProvider::new()
            .reply_json(PROMPT_NAME, json!({ "category": "Education", "confidence": 0.93 }))
            .reply_json(PROMPT_NAME, json!({ "category": "Recipes", "confidence": 7 }));

        let first = auto_categorize_documents(&llm, "Bachelor's diploma").await.unwrap();
        assert_eq!(first.category, DocumentCategory::Education);
        assert!((first.confidence - 0.93).abs() < f32::EPSILON);

        let second = auto_categorize_documents(&llm, "Lasagne").await.unwrap();
        assert_eq!(second.category, DocumentCategory::Other);
        assert_eq!(second.confidence, 1.0);
    }

    #[tokio::test]
    async fn prompt_carries_text_and_category_list() {
        let llm = ScriptedProvider::new()
            .reply_json(PROMPT_NAME, json!({ "category": "Medical", "confidence": 0.5 }));
        auto_categorize_documents(&llm, "Prescription for amoxicillin")
            .await
            .unwrap();
        let prompt = &llm.calls()[0].prompt;
        assert!(prompt.contains("Prescription for amoxicillin"));
        assert!(prompt.contains("Education, ID, Medical, Employment, Legal, Financial, Personal, Other"));
    }
}
