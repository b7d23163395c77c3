use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use siftdex::analysis::analyzer::Analyzer;
use siftdex::core::types::{CONTENT_FIELD, FILENAME_FIELD};
use siftdex::{Config, Document, SearchEngine};

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
    "index", "segment", "posting", "query", "search", "rust", "engine", "commit",
];

/// Helper to create test documents
fn create_test_document(id: u64, content_size: usize) -> Document {
    let mut rng = rand::thread_rng();
    let content: String = (0..content_size)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ");

    Document::new()
        .with_text(CONTENT_FIELD, content)
        .with_keyword(FILENAME_FIELD, format!("doc_{}.txt", id))
}

fn populated_engine(dir: &tempfile::TempDir, docs: u64) -> SearchEngine {
    let engine = SearchEngine::open(Config::new(dir.path()).with_query_cache_size(0)).unwrap();
    for id in 0..docs {
        engine.index_document(&create_test_document(id, 100)).unwrap();
        if id % 1000 == 999 {
            engine.commit().unwrap();
        }
    }
    engine.commit().unwrap();
    engine
}

fn bench_analysis(c: &mut Criterion) {
    let analyzer = Analyzer::standard();
    let text = create_test_document(0, 1000).get_field(CONTENT_FIELD).unwrap().value.clone();

    c.bench_function("analyze_1000_words", |b| {
        b.iter(|| black_box(analyzer.terms(black_box(&text))));
    });
}

fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_and_commit");
    group.sample_size(10);

    for batch_size in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &batch_size| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let engine = SearchEngine::open(Config::new(dir.path())).unwrap();
                for id in 0..batch_size {
                    engine.index_document(&create_test_document(id, 100)).unwrap();
                }
                black_box(engine.commit().unwrap());
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine = populated_engine(&dir, 5000);

    let mut group = c.benchmark_group("search");
    for query in ["fox", "quick AND fox", "rust OR engine", "\"brown fox\"", "search -lazy"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            b.iter(|| black_box(engine.search(query, 10).unwrap()));
        });
    }
    group.finish();
}

fn bench_cached_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine = populated_engine(&dir, 1000);
    drop(engine);
    let engine = SearchEngine::open(Config::new(dir.path())).unwrap();

    c.bench_function("search_cached", |b| {
        b.iter(|| black_box(engine.search("quick brown", 10).unwrap()));
    });
}

criterion_group!(benches, bench_analysis, bench_indexing, bench_search, bench_cached_search);
criterion_main!(benches);
