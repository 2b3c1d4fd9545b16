use crate::models::{Document, DocumentSummary};
use crate::sample::sample_document;

/// The in-memory document list, newest first.
///
/// Never empty: when there is nothing else to show it holds the sample
/// document, which the first real commit replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::with_sample()
    }
}

impl DocumentStore {
    pub fn with_sample() -> Self {
        Self {
            documents: vec![sample_document()],
        }
    }

    pub fn from_documents(documents: Vec<Document>) -> Self {
        if documents.is_empty() {
            Self::with_sample()
        } else {
            Self { documents }
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_sample_only(&self) -> bool {
        self.documents.len() == 1 && self.documents[0].is_sample()
    }

    /// Prepends `document`, replacing a lone sample.
    pub fn commit(&mut self, document: Document) {
        if self.is_sample_only() {
            self.documents.clear();
        }
        self.documents.insert(0, document);
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let idx = self.documents.iter().position(|d| d.id == id)?;
        let removed = self.documents.remove(idx);
        if self.documents.is_empty() {
            self.documents.push(sample_document());
        }
        Some(removed)
    }

    pub fn reset(&mut self) {
        self.documents = vec![sample_document()];
    }

    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents.iter().map(DocumentSummary::from).collect()
    }
}
