use roaring::RoaringTreemap;
use serde::{Serialize, Deserialize};
use crate::core::types::DocId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,       // Term frequency in document field
    pub positions: Vec<u32>,  // Token positions; empty when tracking is off
}

/// Posting list for a term.
/// Sorted by doc_id with at most one posting per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Record one occurrence of the term in `doc_id`. A repeated document
    /// increments its frequency instead of adding a posting.
    pub fn add_occurrence(&mut self, doc_id: DocId, position: Option<u32>) {
        // Documents are staged in id order, so the tail is the common case
        let idx = match self.postings.last() {
            Some(last) if last.doc_id == doc_id => self.postings.len() - 1,
            Some(last) if last.doc_id < doc_id => self.push_new(self.postings.len(), doc_id),
            None => self.push_new(0, doc_id),
            Some(_) => match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(pos) => pos,
                Err(pos) => self.push_new(pos, doc_id),
            },
        };

        let posting = &mut self.postings[idx];
        posting.term_freq += 1;
        if let Some(position) = position {
            match posting.positions.binary_search(&position) {
                Ok(_) => {}
                Err(at) => posting.positions.insert(at, position),
            }
        }
    }

    fn push_new(&mut self, at: usize, doc_id: DocId) -> usize {
        self.postings.insert(at, Posting {
            doc_id,
            term_freq: 0,
            positions: Vec::new(),
        });
        at
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|idx| &self.postings[idx])
    }

    pub fn remove_doc(&mut self, doc_id: DocId) -> bool {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(idx) => {
                self.postings.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Postings whose document is not in `deleted`
    pub fn live<'a>(&'a self, deleted: &'a RoaringTreemap) -> impl Iterator<Item = &'a Posting> + 'a {
        self.postings.iter().filter(move |p| !deleted.contains(p.doc_id.0))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn total_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.term_freq as u64).sum()
    }

    /// Linear merge intersection on doc id
    pub fn intersect(&self, other: &PostingList) -> Vec<Posting> {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;

        while i < self.postings.len() && j < other.postings.len() {
            let doc_id1 = self.postings[i].doc_id;
            let doc_id2 = other.postings[j].doc_id;

            if doc_id1 == doc_id2 {
                result.push(self.postings[i].clone());
                i += 1;
                j += 1;
            } else if doc_id1 < doc_id2 {
                i += 1;
            } else {
                j += 1;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_occurrences_increment_frequency() {
        let mut list = PostingList::new();
        list.add_occurrence(DocId(3), Some(0));
        list.add_occurrence(DocId(3), Some(4));
        list.add_occurrence(DocId(3), Some(9));

        assert_eq!(list.len(), 1);
        assert_eq!(list.postings[0].term_freq, 3);
        assert_eq!(list.postings[0].positions, vec![0, 4, 9]);
    }

    #[test]
    fn out_of_order_documents_stay_sorted_and_unique() {
        let mut list = PostingList::new();
        for id in [5, 1, 9, 1, 5, 3] {
            list.add_occurrence(DocId(id), None);
        }

        let ids: Vec<u64> = list.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(ids, vec![1, 3, 5, 9]);
        assert_eq!(list.get(DocId(5)).unwrap().term_freq, 2);
        assert_eq!(list.total_freq(), 6);
    }

    #[test]
    fn intersect_and_live_filtering() {
        let mut a = PostingList::new();
        let mut b = PostingList::new();
        for id in [1, 2, 4, 8] {
            a.add_occurrence(DocId(id), None);
        }
        for id in [2, 3, 8] {
            b.add_occurrence(DocId(id), None);
        }

        let both: Vec<u64> = a.intersect(&b).iter().map(|p| p.doc_id.0).collect();
        assert_eq!(both, vec![2, 8]);

        let mut deleted = RoaringTreemap::new();
        deleted.insert(4);
        let live: Vec<u64> = a.live(&deleted).map(|p| p.doc_id.0).collect();
        assert_eq!(live, vec![1, 2, 8]);

        assert!(a.remove_doc(DocId(2)));
        assert!(!a.remove_doc(DocId(2)));
    }
}
