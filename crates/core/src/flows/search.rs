use super::run_flow;
use crate::models::{DocumentSummary, SearchResult};
use providers::{GenerateRequest, LlmProvider, ProviderError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

pub const PROMPT_NAME: &str = "documentSearch";

const TEMPLATE: &str = r#"You are a document search assistant. Given a question and a list of document summaries, find the documents most relevant to the question.

Question: {query}

Document summaries:
{summaries}

Score every relevant document between 0 (unrelated) and 1 (exactly what was asked for) and list them from most to least relevant.
Reply with a JSON object: {"results": [{"documentId": "...", "relevanceScore": 0.0}]}"#;

#[derive(Deserialize)]
struct Output {
    results: Vec<SearchResult>,
}

pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "documentId": { "type": "string" },
                        "relevanceScore": { "type": "number" }
                    },
                    "required": ["documentId", "relevanceScore"]
                }
            }
        },
        "required": ["results"]
    })
}

fn render(query: &str, summaries: &[DocumentSummary]) -> String {
    let listing = summaries
        .iter()
        .map(|s| format!("- Document ID: {}, Summary: {}", s.document_id, s.summary))
        .collect::<Vec<_>>()
        .join("\n");
    TEMPLATE
        .replace("{query}", query)
        .replace("{summaries}", &listing)
}

/// Asks the model to rank `summaries` against `query`.
///
/// Results are sorted by descending score; equal scores keep the model's
/// order. Ids the model invented, and repeats of an id, are dropped.
pub async fn document_search(
    llm: &dyn LlmProvider,
    query: &str,
    summaries: &[DocumentSummary],
) -> Result<Vec<SearchResult>, ProviderError> {
    if summaries.is_empty() {
        return Ok(Vec::new());
    }
    let request =
        GenerateRequest::new(PROMPT_NAME, render(query, summaries)).with_schema(output_schema());
    let output: Output = run_flow(llm, request).await?;

    let known: HashSet<&str> = summaries.iter().map(|s| s.document_id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut results: Vec<SearchResult> = output
        .results
        .into_iter()
        .filter(|r| known.contains(r.document_id.as_str()))
        .filter(|r| seen.insert(r.document_id.clone()))
        .collect();
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    Ok(results)
}
