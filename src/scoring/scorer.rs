use std::sync::Arc;

/// Collection and document statistics available when scoring one posting
#[derive(Debug, Clone, Copy, Default)]
pub struct TermStats {
    pub doc_freq: u32,          // Live documents containing the term
    pub total_docs: u64,        // Live documents in the snapshot
    pub field_length: u32,      // Tokens in this document's field
    pub avg_field_length: f32,  // Mean tokens per document for the field
}

/// Scorer trait. Scores must be non-decreasing in `term_freq` with all other
/// statistics fixed, and zero when the term is absent.
pub trait Scorer: Send + Sync {
    fn score(&self, term_freq: u32, stats: &TermStats) -> f32;

    fn name(&self) -> &str;

    /// Whether `TermStats` needs per-document field lengths
    fn needs_field_stats(&self) -> bool {
        false
    }
}

/// `1 + ln(tf)`: sublinear term frequency, no collection statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct TfScorer;

impl Scorer for TfScorer {
    fn score(&self, term_freq: u32, _stats: &TermStats) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }
        1.0 + (term_freq as f32).ln()
    }

    fn name(&self) -> &str {
        "tf"
    }
}

/// BM25 Scorer
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl Bm25Scorer {
    fn idf(stats: &TermStats) -> f32 {
        let n = stats.total_docs as f32;
        let df = stats.doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Scorer for Bm25Scorer {
    fn score(&self, term_freq: u32, stats: &TermStats) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }
        let tf = term_freq as f32;
        let length_ratio = if stats.avg_field_length > 0.0 {
            stats.field_length as f32 / stats.avg_field_length
        } else {
            1.0
        };

        let numerator = Self::idf(stats) * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);
        numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }

    fn needs_field_stats(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    #[default]
    TermFrequency,
    Bm25,
}

impl ScorerKind {
    pub fn build(self) -> Arc<dyn Scorer> {
        match self {
            ScorerKind::TermFrequency => Arc::new(TfScorer),
            ScorerKind::Bm25 => Arc::new(Bm25Scorer::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> TermStats {
        TermStats { doc_freq: 3, total_docs: 20, field_length: 12, avg_field_length: 10.0 }
    }

    #[test]
    fn tf_scorer_is_zero_for_absent_terms_and_grows_with_frequency() {
        let scorer = TfScorer;
        assert_eq!(scorer.score(0, &stats()), 0.0);
        assert_eq!(scorer.score(1, &stats()), 1.0);

        let scores: Vec<f32> = (1..50).map(|tf| scorer.score(tf, &stats())).collect();
        assert!(scores.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bm25_saturates_but_never_decreases() {
        let scorer = Bm25Scorer::default();
        let scores: Vec<f32> = (0..200).map(|tf| scorer.score(tf, &stats())).collect();
        assert_eq!(scores[0], 0.0);
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert!(scores[199] < scorer.k1 + 1.0 + Bm25Scorer::idf(&stats()) * (scorer.k1 + 1.0));
    }

    #[test]
    fn rare_terms_outscore_common_ones_under_bm25() {
        let scorer = Bm25Scorer::default();
        let rare = TermStats { doc_freq: 1, ..stats() };
        let common = TermStats { doc_freq: 19, ..stats() };
        assert!(scorer.score(2, &rare) > scorer.score(2, &common));
    }
}
