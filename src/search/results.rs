use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use crate::core::types::{DocId, StoredFields};
use crate::search::snippet::Snippet;

/// Search results container
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,     // Score descending, doc id ascending on ties
    pub total_hits: usize,        // Matches before truncation to the limit
    pub max_score: f32,
    pub took_ms: u64,
}

impl SearchResults {
    pub fn empty() -> Self {
        SearchResults {
            hits: Vec::new(),
            total_hits: 0,
            max_score: 0.0,
            took_ms: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.hits.iter().map(|hit| hit.doc_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub fields: StoredFields,
    pub snippet: Snippet,
}

impl SearchHit {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Document with relevance score. Ordered by rank: a greater value ranks
/// higher (larger score, then smaller doc id).
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
}

impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<Reverse<ScoredDocument>>,   // Min-heap of the current best k
    k: usize,
    pub total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        Self::with_candidates(k, 0)
    }

    /// Pre-size for at most `candidates` documents. `k` is caller input and
    /// may be far larger than anything that will ever be collected.
    pub fn with_candidates(k: usize, candidates: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.min(candidates)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_doc: ScoredDocument) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(Reverse(scored_doc));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if scored_doc > *worst {
                self.heap.pop();
                self.heap.push(Reverse(scored_doc));
            }
        }
    }

    /// Best first
    pub fn into_sorted(self) -> Vec<ScoredDocument> {
        let mut results: Vec<ScoredDocument> = self.heap.into_iter().map(|Reverse(doc)| doc).collect();
        results.sort_by(|a, b| b.cmp(a));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u64, score: f32) -> ScoredDocument {
        ScoredDocument { doc_id: DocId(id), score }
    }

    #[test]
    fn keeps_best_k_with_doc_id_tie_break() {
        let mut collector = TopKCollector::new(3);
        for d in [doc(5, 1.0), doc(1, 2.0), doc(9, 2.0), doc(2, 0.5), doc(3, 2.0), doc(4, 3.0)] {
            collector.collect(d);
        }
        assert_eq!(collector.total_collected, 6);

        let ids: Vec<u64> = collector.into_sorted().iter().map(|d| d.doc_id.0).collect();
        assert_eq!(ids, vec![4, 1, 3]);
    }

    #[test]
    fn fewer_matches_than_k() {
        let mut collector = TopKCollector::new(10);
        collector.collect(doc(7, 0.1));
        assert_eq!(collector.into_sorted().len(), 1);
    }

    #[test]
    fn unbounded_k_does_not_preallocate() {
        for k in [usize::MAX, 1 << 40] {
            let mut collector = TopKCollector::with_candidates(k, 2);
            collector.collect(doc(1, 1.0));
            collector.collect(doc(2, 2.0));
            let ids: Vec<u64> = collector.into_sorted().iter().map(|d| d.doc_id.0).collect();
            assert_eq!(ids, vec![2, 1]);
        }
    }
}
