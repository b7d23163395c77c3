use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, info};
use crate::analysis::analyzer::{Analyzer, AnalyzerRegistry};
use crate::core::cancel::{self, Cancellation};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, FieldKind, StoredFields, FILENAME_FIELD, FILEPATH_FIELD};
use crate::mvcc::snapshot::Snapshot;
use crate::query::ast::Query;
use crate::query::parser::QueryParser;
use crate::scoring::scorer::Scorer;
use crate::search::cache::{CacheStats, QueryCache, QueryKey};
use crate::search::results::SearchResults;
use crate::search::searcher::{SearchRequest, Searcher};
use crate::search::snippet::SnippetExtractor;
use crate::storage::store::{CommitInfo, IndexStats, IndexStore};
use crate::writer::batch::BatchSummary;
use crate::writer::index_writer::IndexWriter;
use crate::writer::source::{DocumentSource, TextFileSource};

/// Embeddable search engine: one store, at most one writer, and any number
/// of concurrent searches over the last committed snapshot.
pub struct SearchEngine {
    config: Config,
    store: Arc<IndexStore>,
    analyzer: Arc<Analyzer>,
    writer: Option<Mutex<IndexWriter>>,     // None when opened read-only
    scorer: Arc<dyn Scorer>,
    cache: QueryCache,
}

impl SearchEngine {
    /// Open or create a writable index and take the writer lock.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_registry(config, &AnalyzerRegistry::new())
    }

    /// Like `open`, resolving `config.analyzer` against caller-registered
    /// analyzers.
    pub fn open_with_registry(config: Config, registry: &AnalyzerRegistry) -> Result<Self> {
        let analyzer = registry.get(&config.analyzer)?;
        let store = Arc::new(IndexStore::open(&config)?);
        let writer = IndexWriter::with_threads(
            Arc::clone(&store),
            Arc::clone(&analyzer),
            config.indexing_threads,
            config.parallel_threshold,
        )?;
        Ok(Self::assemble(config, store, analyzer, Some(writer)))
    }

    /// Open an existing index for searching only. Write calls fail with
    /// `InvalidState`.
    pub fn open_read_only(config: Config) -> Result<Self> {
        let analyzer = AnalyzerRegistry::new().get(&config.analyzer)?;
        let store = Arc::new(IndexStore::open_read_only(&config)?);
        Ok(Self::assemble(config, store, analyzer, None))
    }

    fn assemble(config: Config, store: Arc<IndexStore>, analyzer: Arc<Analyzer>, writer: Option<IndexWriter>) -> Self {
        info!(
            path = %config.storage_path.display(),
            analyzer = analyzer.name(),
            writable = writer.is_some(),
            "search engine opened"
        );
        SearchEngine {
            scorer: config.scorer.build(),
            cache: QueryCache::new(config.query_cache_size),
            writer: writer.map(Mutex::new),
            config,
            store,
            analyzer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter) -> Result<T>) -> Result<T> {
        if self.store.is_closed() {
            return Err(Error::closed());
        }
        let writer = self.writer.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "engine was opened read-only".to_string())
        })?;
        f(&mut *writer.lock())
    }

    pub fn index_document(&self, doc: &Document) -> Result<DocId> {
        self.with_writer(|writer| writer.add_document(doc, None))
    }

    pub fn index_document_with_cancel(&self, doc: &Document, cancel: &Cancellation) -> Result<DocId> {
        self.with_writer(|writer| writer.add_document(doc, Some(cancel)))
    }

    pub fn index_file(&self, path: &Path) -> Result<DocId> {
        self.with_writer(|writer| writer.add_file(path))
    }

    pub fn index_files(&self, paths: &[PathBuf], cancel: Option<&Cancellation>) -> Result<BatchSummary> {
        self.with_writer(|writer| Ok(writer.index_files(paths, cancel)))
    }

    /// Index the `.txt` files directly under `dir`
    pub fn index_directory(&self, dir: &Path, cancel: Option<&Cancellation>) -> Result<BatchSummary> {
        self.index_directory_with(dir, &TextFileSource::default(), cancel)
    }

    pub fn index_directory_with(
        &self,
        dir: &Path,
        source: &dyn DocumentSource,
        cancel: Option<&Cancellation>,
    ) -> Result<BatchSummary> {
        self.with_writer(|writer| writer.index_directory(dir, source, cancel))
    }

    pub fn delete_document(&self, doc_id: DocId) -> Result<()> {
        self.with_writer(|writer| writer.delete_document(doc_id))
    }

    pub fn update_document(&self, doc_id: DocId, doc: &Document) -> Result<DocId> {
        self.with_writer(|writer| writer.update_document(doc_id, doc, None))
    }

    pub fn commit(&self) -> Result<CommitInfo> {
        self.with_writer(|writer| writer.commit())
    }

    pub fn rollback(&self) -> Result<()> {
        self.with_writer(|writer| writer.rollback())
    }

    /// Rewrite all committed segments into one
    pub fn merge(&self) -> Result<CommitInfo> {
        self.with_writer(|writer| writer.merge())
    }

    /// Parser bound to the engine's analyzer and the committed field schema
    pub fn parser(&self) -> Result<QueryParser> {
        let snapshot = self.store.snapshot()?;
        let keyword_fields = snapshot.fields.iter()
            .filter(|(_, kind)| **kind == FieldKind::Keyword)
            .map(|(name, _)| name.clone())
            .chain([FILENAME_FIELD.to_string(), FILEPATH_FIELD.to_string()]);

        Ok(QueryParser::new(self.config.default_field.clone(), Arc::clone(&self.analyzer))
            .with_keyword_fields(keyword_fields))
    }

    pub fn parse(&self, query: &str) -> Result<Query> {
        self.parser()?.parse(query)
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<SearchResults> {
        self.search_request(query, limit, None)
    }

    pub fn search_with_cancel(&self, query: &str, limit: usize, cancel: &Cancellation) -> Result<SearchResults> {
        self.search_request(query, limit, Some(cancel.clone()))
    }

    fn search_request(&self, text: &str, limit: usize, cancel: Option<Cancellation>) -> Result<SearchResults> {
        let snapshot = self.store.snapshot()?;
        if limit == 0 {
            return Err(Error::invalid_argument("result limit must be at least 1"));
        }
        let query = self.parse(text)?;
        cancel::check(cancel.as_ref(), "search")?;

        let key = QueryKey {
            version: snapshot.version,
            query: query.clone(),
            limit,
            snippet_text: Some(text.to_string()),
        };
        if let Some(results) = self.cache.get(&key) {
            debug!(query = text, version = snapshot.version, "query cache hit");
            return Ok(results);
        }

        let mut request = SearchRequest::new(query, limit).with_snippet_text(text);
        request.cancel = cancel;
        let results = self.searcher(snapshot).execute(&request)?;
        self.cache.put(key, results.clone());
        Ok(results)
    }

    /// Run an already built query against the current snapshot. Not cached.
    pub fn search_query(&self, query: &Query, limit: usize) -> Result<SearchResults> {
        let snapshot = self.store.snapshot()?;
        self.searcher(snapshot).search(query, limit)
    }

    fn searcher(&self, snapshot: Arc<Snapshot>) -> Searcher {
        Searcher::new(
            snapshot,
            Arc::clone(&self.scorer),
            SnippetExtractor::new(self.config.snippet_field.clone(), self.config.snippet_margin),
        )
    }

    /// Stored fields of a committed, live document
    pub fn get_document(&self, doc_id: DocId) -> Result<StoredFields> {
        self.store.get_stored_fields(doc_id)
    }

    /// Pick up commits made by another process. Only meaningful for
    /// read-only engines.
    pub fn refresh(&self) -> Result<bool> {
        self.store.refresh()
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.store.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Release the writer lock. Uncommitted changes are discarded and every
    /// later call fails with `Closed`.
    pub fn close(&self) -> Result<()> {
        self.cache.clear();
        self.store.close()
    }
}
