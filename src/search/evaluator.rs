use crate::core::cancel::{self, Cancellation};
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::posting::Posting;
use crate::index::term::Term;
use crate::mvcc::snapshot::Snapshot;
use crate::query::ast::{PhraseQuery, Query};
use crate::scoring::scorer::{Scorer, TermStats};

/// Matching documents with their accumulated score, sorted by doc id
pub type DocScores = Vec<(DocId, f32)>;

const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Evaluates a `Query` tree against one snapshot with sorted-list merges.
pub struct Evaluator<'a> {
    snapshot: &'a Snapshot,
    scorer: &'a dyn Scorer,
    cancel: Option<&'a Cancellation>,
}

impl<'a> Evaluator<'a> {
    pub fn new(snapshot: &'a Snapshot, scorer: &'a dyn Scorer, cancel: Option<&'a Cancellation>) -> Self {
        Evaluator { snapshot, scorer, cancel }
    }

    pub fn evaluate(&self, query: &Query) -> Result<DocScores> {
        cancel::check(self.cancel, "search")?;

        match query {
            Query::Term(t) => Ok(self.term(&t.field, &t.text)),
            Query::Phrase(p) => self.phrase(p),
            Query::And(children) => self.clauses(children, intersect),
            Query::Or(children) => self.clauses(children, union),
            Query::Not(_) => Err(Error::invalid_argument("a negated clause needs a positive sibling")),
        }
    }

    /// Combine positive children with `merge`, then subtract the union of the
    /// negated ones. Without a positive child nothing matches.
    fn clauses(&self, children: &[Query], merge: fn(DocScores, DocScores) -> DocScores) -> Result<DocScores> {
        let mut matched: Option<DocScores> = None;
        let mut excluded: DocScores = Vec::new();

        for child in children {
            match child {
                Query::Not(inner) => excluded = union(excluded, self.evaluate(inner)?),
                positive => {
                    let scores = self.evaluate(positive)?;
                    matched = Some(match matched {
                        Some(acc) => merge(acc, scores),
                        None => scores,
                    });
                }
            }
        }

        Ok(subtract(matched.unwrap_or_default(), &excluded))
    }

    fn stats(&self, field: &str, doc_freq: usize) -> TermStats {
        TermStats {
            doc_freq: doc_freq as u32,
            total_docs: self.snapshot.live_doc_count(),
            field_length: 0,
            avg_field_length: if self.scorer.needs_field_stats() {
                self.snapshot.avg_field_length(field)
            } else {
                0.0
            },
        }
    }

    fn score(&self, field: &str, posting: &Posting, base: &TermStats) -> f32 {
        let mut stats = *base;
        if self.scorer.needs_field_stats() {
            stats.field_length = self.snapshot.field_length(posting.doc_id, field);
        }
        self.scorer.score(posting.term_freq, &stats)
    }

    fn term(&self, field: &str, text: &str) -> DocScores {
        let postings = self.snapshot.postings(&Term::new(field, text));
        let stats = self.stats(field, postings.len());
        postings.iter()
            .map(|p| (p.doc_id, self.score(field, p, &stats)))
            .collect()
    }

    /// Documents containing every phrase term at the query's relative
    /// offsets. Postings without positions are accepted on co-occurrence.
    fn phrase(&self, phrase: &PhraseQuery) -> Result<DocScores> {
        let lists: Vec<Vec<Posting>> = phrase.terms.iter()
            .map(|text| self.snapshot.postings(&Term::new(phrase.field.as_str(), text.as_str())))
            .collect();
        if lists.is_empty() || lists.iter().any(Vec::is_empty) {
            return Ok(Vec::new());
        }
        let stats: Vec<TermStats> = lists.iter().map(|l| self.stats(&phrase.field, l.len())).collect();

        let mut out = Vec::new();
        'docs: for (n, first) in lists[0].iter().enumerate() {
            if n % CANCEL_CHECK_INTERVAL == 0 {
                cancel::check(self.cancel, "search")?;
            }

            let mut postings = Vec::with_capacity(lists.len());
            postings.push(first);
            for list in &lists[1..] {
                match list.binary_search_by_key(&first.doc_id, |p| p.doc_id) {
                    Ok(idx) => postings.push(&list[idx]),
                    Err(_) => continue 'docs,
                }
            }

            if !positions_match(&postings, &phrase.offsets) {
                continue;
            }
            let score = postings.iter().zip(&stats)
                .map(|(p, s)| self.score(&phrase.field, p, s))
                .sum();
            out.push((first.doc_id, score));
        }
        Ok(out)
    }
}

fn positions_match(postings: &[&Posting], offsets: &[u32]) -> bool {
    if postings.iter().any(|p| p.positions.is_empty()) {
        return true;
    }
    let first_offset = offsets.first().copied().unwrap_or(0);

    postings[0].positions.iter().any(|&start| {
        let Some(base) = start.checked_sub(first_offset) else {
            return false;
        };
        postings.iter().zip(offsets).skip(1).all(|(p, &offset)| {
            p.positions.binary_search(&(base + offset)).is_ok()
        })
    })
}

pub fn intersect(a: DocScores, b: DocScores) -> DocScores {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    out
}

pub fn union(a: DocScores, b: DocScores) -> DocScores {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

pub fn subtract(a: DocScores, excluded: &DocScores) -> DocScores {
    if excluded.is_empty() {
        return a;
    }
    let mut j = 0;
    a.into_iter()
        .filter(|(doc_id, _)| {
            while j < excluded.len() && excluded[j].0 < *doc_id {
                j += 1;
            }
            !(j < excluded.len() && excluded[j].0 == *doc_id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(ids: &[u64]) -> DocScores {
        ids.iter().map(|id| (DocId(*id), 1.0)).collect()
    }

    fn ids(scores: &DocScores) -> Vec<u64> {
        scores.iter().map(|(id, _)| id.0).collect()
    }

    #[test]
    fn merges_keep_doc_order_and_sum_scores() {
        let both = intersect(scores(&[1, 3, 5, 7]), scores(&[3, 4, 7]));
        assert_eq!(ids(&both), vec![3, 7]);
        assert_eq!(both[0].1, 2.0);

        let either = union(scores(&[1, 5]), scores(&[2, 5, 9]));
        assert_eq!(ids(&either), vec![1, 2, 5, 9]);
        assert_eq!(either[2].1, 2.0);

        assert_eq!(ids(&subtract(scores(&[1, 2, 3, 4]), &scores(&[2, 4, 6]))), vec![1, 3]);
    }

    fn posting(positions: &[u32]) -> Posting {
        Posting { doc_id: DocId(0), term_freq: positions.len() as u32, positions: positions.to_vec() }
    }

    #[test]
    fn phrase_positions_respect_offsets() {
        let brown = posting(&[1, 7]);
        let fox = posting(&[2, 5]);
        assert!(positions_match(&[&brown, &fox], &[0, 1]));
        assert!(!positions_match(&[&fox, &brown], &[0, 1]));

        // Stop word gap: "run ... dog" with dog two positions after run
        let run = posting(&[1]);
        let dog = posting(&[3]);
        assert!(positions_match(&[&run, &dog], &[0, 2]));
        assert!(!positions_match(&[&run, &dog], &[0, 1]));
    }

    #[test]
    fn untracked_positions_accept_co_occurrence() {
        assert!(positions_match(&[&posting(&[]), &posting(&[])], &[0, 1]));
    }
}
