use std::path::PathBuf;
use crate::core::types::CONTENT_FIELD;
use crate::scoring::scorer::ScorerKind;
use crate::storage::block::CompressionType;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,

    // Analysis and query parsing
    pub analyzer: String,                       // Name resolved through AnalyzerRegistry
    pub default_field: String,                  // Field used by bare query words
    pub track_positions: bool,                  // Needed for exact phrase matching

    // Search
    pub scorer: ScorerKind,
    pub snippet_field: String,
    pub snippet_margin: usize,                  // Characters kept on each side of a match
    pub query_cache_size: usize,                // 0 disables the result cache

    // Writer
    pub compression: CompressionType,
    pub max_segments: usize,                    // Merge all segments past this count
    pub parallel_threshold: usize,              // Smaller batches are analyzed sequentially
    pub indexing_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./index"),

            analyzer: "standard".to_string(),
            default_field: CONTENT_FIELD.to_string(),
            track_positions: true,

            scorer: ScorerKind::TermFrequency,
            snippet_field: CONTENT_FIELD.to_string(),
            snippet_margin: 50,
            query_cache_size: 256,

            compression: CompressionType::Lz4,
            max_segments: 10,
            parallel_threshold: 16,
            indexing_threads: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            ..Config::default()
        }
    }

    pub fn with_analyzer(mut self, name: impl Into<String>) -> Self {
        self.analyzer = name.into();
        self
    }

    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    pub fn with_track_positions(mut self, track: bool) -> Self {
        self.track_positions = track;
        self
    }

    pub fn with_scorer(mut self, scorer: ScorerKind) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_snippet_margin(mut self, margin: usize) -> Self {
        self.snippet_margin = margin;
        self
    }

    pub fn with_query_cache_size(mut self, size: usize) -> Self {
        self.query_cache_size = size;
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments.max(1);
        self
    }

    pub fn with_indexing_threads(mut self, threads: usize) -> Self {
        self.indexing_threads = threads.max(1);
        self
    }
}
