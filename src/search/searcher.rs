use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use crate::core::cancel::Cancellation;
use crate::core::error::{Error, Result};
use crate::mvcc::snapshot::Snapshot;
use crate::query::ast::Query;
use crate::scoring::scorer::Scorer;
use crate::search::evaluator::Evaluator;
use crate::search::results::{ScoredDocument, SearchHit, SearchResults, TopKCollector};
use crate::search::snippet::SnippetExtractor;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Query,
    pub limit: usize,
    /// Raw query text, tried first when looking for a snippet
    pub snippet_text: Option<String>,
    pub cancel: Option<Cancellation>,
}

impl SearchRequest {
    pub fn new(query: Query, limit: usize) -> Self {
        SearchRequest {
            query,
            limit,
            snippet_text: None,
            cancel: None,
        }
    }

    pub fn with_snippet_text(mut self, text: impl Into<String>) -> Self {
        self.snippet_text = Some(text.into());
        self
    }

    pub fn with_cancel(mut self, cancel: Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Ranked retrieval over one snapshot. Cheap to build; a searcher sees
/// exactly the commits published before it was created.
pub struct Searcher {
    snapshot: Arc<Snapshot>,
    scorer: Arc<dyn Scorer>,
    snippets: SnippetExtractor,
}

impl Searcher {
    pub fn new(snapshot: Arc<Snapshot>, scorer: Arc<dyn Scorer>, snippets: SnippetExtractor) -> Self {
        Searcher { snapshot, scorer, snippets }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn search(&self, query: &Query, k: usize) -> Result<SearchResults> {
        self.execute(&SearchRequest::new(query.clone(), k))
    }

    pub fn execute(&self, request: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        if request.limit == 0 {
            return Err(Error::invalid_argument("result limit must be at least 1"));
        }
        if self.snapshot.is_empty() {
            return Ok(SearchResults::empty());
        }

        let evaluator = Evaluator::new(&self.snapshot, self.scorer.as_ref(), request.cancel.as_ref());
        let matches = evaluator.evaluate(&request.query)?;

        let mut collector = TopKCollector::with_candidates(request.limit, matches.len());
        for (doc_id, score) in matches {
            collector.collect(ScoredDocument { doc_id, score });
        }
        let total_hits = collector.total_collected;

        let mut candidates: Vec<String> = request.snippet_text.iter().cloned().collect();
        candidates.extend(request.query.positive_terms(&self.snippets.field));

        let mut hits = Vec::new();
        for scored in collector.into_sorted() {
            let fields = self.snapshot.stored_fields(scored.doc_id)?;
            let snippet = self.snippets.extract(&fields, &candidates);
            hits.push(SearchHit {
                doc_id: scored.doc_id,
                score: scored.score,
                fields,
                snippet,
            });
        }

        let results = SearchResults {
            max_score: hits.first().map(|h| h.score).unwrap_or(0.0),
            hits,
            total_hits,
            took_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            query = %request.query,
            total_hits,
            returned = results.len(),
            took_ms = results.took_ms,
            "search executed"
        );
        Ok(results)
    }
}
