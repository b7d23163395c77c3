use proptest::prelude::*;
use siftdex::analysis::analyzer::Analyzer;
use siftdex::core::types::CONTENT_FIELD;
use siftdex::index::term::Term;
use siftdex::scoring::scorer::{Bm25Scorer, Scorer, TermStats, TfScorer};
use siftdex::{Config, Document, SearchEngine};

const VOCABULARY: &[&str] = &["alpha", "bravo", "charlie", "delta", "echo", "fox", "golf", "hotel"];

fn sentence() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 1..12)
}

fn corpus() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
    prop::collection::vec(sentence(), 1..8)
}

fn indexed(docs: &[Vec<&str>]) -> (tempfile::TempDir, SearchEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = SearchEngine::open(Config::new(dir.path()).with_query_cache_size(0)).unwrap();
    for words in docs {
        engine.index_document(&Document::new().with_text(CONTENT_FIELD, words.join(" "))).unwrap();
    }
    engine.commit().unwrap();
    (dir, engine)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn analysis_is_idempotent(text in "[a-zA-Z0-9 ,.!?-]{0,80}") {
        let analyzer = Analyzer::standard();
        let once = analyzer.terms(&text);
        let twice = analyzer.terms(&once.join(" "));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn tf_score_grows_with_frequency(tf in 1u32..10_000) {
        let stats = TermStats { doc_freq: 3, total_docs: 10, field_length: 20, avg_field_length: 20.0 };
        prop_assert!(TfScorer.score(tf + 1, &stats) > TfScorer.score(tf, &stats));
        prop_assert!(Bm25Scorer::default().score(tf + 1, &stats) >= Bm25Scorer::default().score(tf, &stats));
        prop_assert_eq!(TfScorer.score(0, &stats), 0.0);
    }

    #[test]
    fn postings_are_sorted_and_unique(docs in corpus()) {
        let (_dir, engine) = indexed(&docs);
        for word in VOCABULARY {
            let postings = engine.store().get_postings(&Term::new(CONTENT_FIELD, *word)).unwrap();
            prop_assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));

            let expected = docs.iter().filter(|d| d.contains(word)).count();
            prop_assert_eq!(postings.len(), expected);
        }
    }

    #[test]
    fn every_indexed_word_is_recalled(docs in corpus()) {
        let (_dir, engine) = indexed(&docs);
        let ids: Vec<_> = (0..docs.len()).map(|i| siftdex::DocId(i as u64)).collect();

        for (doc, id) in docs.iter().zip(&ids) {
            for word in doc {
                let results = engine.search(word, docs.len()).unwrap();
                prop_assert!(results.doc_ids().contains(id), "{} missing doc {}", word, id);
            }
        }
    }

    #[test]
    fn results_are_ranked_and_bounded(docs in corpus(), k in 1usize..6, word in prop::sample::select(VOCABULARY)) {
        let (_dir, engine) = indexed(&docs);
        let results = engine.search(word, k).unwrap();

        prop_assert!(results.len() <= k);
        prop_assert!(results.len() <= results.total_hits);
        for pair in results.hits.windows(2) {
            let ordered = pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id);
            prop_assert!(ordered);
        }
    }

    #[test]
    fn stored_fields_round_trip(docs in corpus()) {
        let (_dir, engine) = indexed(&docs);
        for (i, words) in docs.iter().enumerate() {
            let stored = engine.get_document(siftdex::DocId(i as u64)).unwrap();
            prop_assert_eq!(&stored[CONTENT_FIELD], &words.join(" "));
        }
    }
}
