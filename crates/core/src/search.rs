//! Debounced model-ranked search and the filtered document view.

use crate::flows;
use crate::models::{Document, DocumentCategory, DocumentSummary, SearchResult};
use providers::LlmProvider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Latest search outcome as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    /// Generation of the submission this state belongs to.
    pub generation: u64,
    pub searching: bool,
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

impl SearchState {
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

/// Documents to show for the current category and search.
///
/// Without a query this is every document in the category. With a query it
/// is the ranked hits only (empty while a search is still running), in rank
/// order, then filtered by category.
pub fn visible_documents<'a>(
    documents: &'a [Document],
    category: Option<DocumentCategory>,
    search: &SearchState,
) -> Vec<&'a Document> {
    let in_category = |d: &&Document| category.map_or(true, |c| d.category == c);

    if !search.is_active() {
        return documents.iter().filter(in_category).collect();
    }
    if search.searching || search.results.is_empty() {
        return Vec::new();
    }

    let rank: HashMap<&str, usize> = search
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| (r.document_id.as_str(), i))
        .collect();
    let mut ranked: Vec<&Document> = documents
        .iter()
        .filter(|d| rank.contains_key(d.id.as_str()))
        .collect();
    ranked.sort_by_key(|d| rank[d.id.as_str()]);
    ranked.into_iter().filter(in_category).collect()
}

/// Runs a search only after `quiet` has passed with no newer submission.
///
/// Every submission bumps a generation counter; a sleeping or in-flight task
/// whose generation is no longer current drops its result, so the most
/// recent query always wins.
pub struct SearchDebouncer {
    quiet: Duration,
    llm: Arc<dyn LlmProvider>,
    generation: Arc<AtomicU64>,
    state: watch::Sender<SearchState>,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(llm: Arc<dyn LlmProvider>, quiet: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            quiet,
            llm,
            generation: Arc::new(AtomicU64::new(0)),
            state,
            pending: None,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Submits the current query text. An empty query clears results at once
    /// and never reaches the model.
    pub fn submit(&mut self, query: &str, summaries: Vec<DocumentSummary>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!(generation, "superseding pending search");
                handle.abort();
            }
        }

        if query.trim().is_empty() {
            self.state.send_replace(SearchState {
                generation,
                ..SearchState::default()
            });
            return;
        }

        let query = query.to_string();
        let quiet = self.quiet;
        let llm = self.llm.clone();
        let current = self.generation.clone();
        let state = self.state.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let started = SearchState {
                query: query.clone(),
                generation,
                searching: true,
                results: Vec::new(),
                error: None,
            };
            if !publish_if_current(&state, &current, generation, started) {
                return;
            }

            let outcome = flows::document_search(llm.as_ref(), &query, &summaries).await;
            let next = match outcome {
                Ok(results) => SearchState {
                    query,
                    generation,
                    searching: false,
                    results,
                    error: None,
                },
                Err(e) => {
                    warn!("search failed: {}", e);
                    SearchState {
                        query,
                        generation,
                        searching: false,
                        results: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            if !publish_if_current(&state, &current, generation, next) {
                debug!(generation, "discarding stale search result");
            }
        }));
    }

    /// Waits until the latest submission has produced a settled state.
    pub async fn settled(&self) -> SearchState {
        let mut rx = self.state.subscribe();
        loop {
            {
                let current = rx.borrow_and_update();
                let latest = self.generation.load(Ordering::SeqCst);
                if current.generation == latest && !current.searching {
                    return current.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

/// Replaces the state only while `generation` is still the latest
/// submission. The check runs under the channel lock, so a newer submission
/// can never be overwritten by an older task.
fn publish_if_current(
    state: &watch::Sender<SearchState>,
    current: &AtomicU64,
    generation: u64,
    next: SearchState,
) -> bool {
    state.send_if_modified(|slot| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        *slot = next;
        true
    })
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
