use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::core::types::{DocId, FieldKind, StoredFields};
use crate::index::posting::{Posting, PostingList};
use crate::index::term::Term;

/// Stored values and per-field token counts of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub fields: StoredFields,
    pub field_lengths: BTreeMap<String, u32>,
}

/// Output of analysis for one document, ready to be staged in a single step.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDocument {
    /// (term, positions); a term without positions still counts `freq` occurrences
    pub terms: Vec<(Term, u32, Vec<u32>)>,
    pub stored: StoredDocument,
    pub field_kinds: BTreeMap<String, FieldKind>,
}

impl AnalyzedDocument {
    pub fn token_count(&self) -> u64 {
        self.stored.field_lengths.values().map(|len| *len as u64).sum()
    }
}

/// In-memory inverted index for one segment: the pending write buffer before
/// commit, and the shape a merge rebuilds before it is written out.
#[derive(Debug, Default)]
pub struct SegmentIndex {
    pub postings: BTreeMap<Term, PostingList>,
    pub documents: BTreeMap<DocId, StoredDocument>,
    pub fields: BTreeMap<String, FieldKind>,
    pub total_tokens: u64,
}

impl SegmentIndex {
    pub fn new() -> Self {
        SegmentIndex::default()
    }

    pub fn add_posting(&mut self, term: Term, doc_id: DocId, position: Option<u32>) {
        self.postings.entry(term)
            .or_insert_with(PostingList::new)
            .add_occurrence(doc_id, position);
    }

    /// Insert a fully built posting, replacing any posting of the same document.
    pub fn insert_posting(&mut self, term: Term, posting: Posting) {
        let list = self.postings.entry(term).or_insert_with(PostingList::new);
        list.remove_doc(posting.doc_id);
        let at = list.postings.partition_point(|p| p.doc_id < posting.doc_id);
        list.postings.insert(at, posting);
    }

    pub fn store_document(&mut self, doc_id: DocId, stored: StoredDocument) {
        self.total_tokens += stored.field_lengths.values().map(|len| *len as u64).sum::<u64>();
        self.documents.insert(doc_id, stored);
    }

    pub fn add_analyzed(&mut self, doc_id: DocId, doc: AnalyzedDocument) {
        for (term, freq, positions) in doc.terms {
            if positions.is_empty() {
                for _ in 0..freq {
                    self.add_posting(term.clone(), doc_id, None);
                }
            } else {
                for position in positions {
                    self.add_posting(term.clone(), doc_id, Some(position));
                }
            }
        }
        for (name, kind) in doc.field_kinds {
            self.fields.entry(name).or_insert(kind);
        }
        self.store_document(doc_id, doc.stored);
    }

    /// Drop every trace of a document. Returns whether it was present.
    pub fn remove_document(&mut self, doc_id: DocId) -> bool {
        let Some(stored) = self.documents.remove(&doc_id) else {
            return false;
        };
        self.total_tokens -= stored.field_lengths.values().map(|len| *len as u64).sum::<u64>();

        self.postings.retain(|_, list| {
            list.remove_doc(doc_id);
            !list.is_empty()
        });
        true
    }

    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.documents.contains_key(&doc_id)
    }

    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn min_doc_id(&self) -> Option<DocId> {
        self.documents.keys().next().copied()
    }

    pub fn max_doc_id(&self) -> Option<DocId> {
        self.documents.keys().next_back().copied()
    }
}
