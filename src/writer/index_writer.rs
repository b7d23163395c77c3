use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::cancel::{self, Cancellation};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, FieldKind};
use crate::index::segment_index::{AnalyzedDocument, StoredDocument};
use crate::index::term::Term;
use crate::storage::store::{CommitInfo, IndexStore};
use crate::writer::batch::BatchSummary;
use crate::writer::source::{load_file_document, DocumentSource};

/// Tokens analyzed between two cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Single writer over an `IndexStore`.
///
/// Documents are analyzed outside the store lock and staged in one step, so
/// a failed or cancelled document never leaves partial postings behind.
/// Dropping the writer releases the writer slot and discards whatever was
/// not committed.
pub struct IndexWriter {
    store: Arc<IndexStore>,
    analyzer: Arc<Analyzer>,
    parallel_threshold: usize,      // Smaller batches are analyzed on the caller thread
    pool: rayon::ThreadPool,
}

impl IndexWriter {
    pub fn new(store: Arc<IndexStore>, analyzer: Arc<Analyzer>) -> Result<Self> {
        Self::with_threads(store, analyzer, num_cpus::get(), 16)
    }

    pub fn with_threads(
        store: Arc<IndexStore>,
        analyzer: Arc<Analyzer>,
        threads: usize,
        parallel_threshold: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("siftdex-index-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("failed to build indexing pool: {}", e)))?;

        store.begin_writer()?;
        debug!(analyzer = analyzer.name(), threads = threads.max(1), "index writer opened");

        Ok(IndexWriter {
            store,
            analyzer,
            parallel_threshold,
            pool,
        })
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    /// Turn a document into terms, positions, field lengths and stored
    /// values without touching the store.
    pub fn analyze_document(&self, doc: &Document, cancel: Option<&Cancellation>) -> Result<AnalyzedDocument> {
        analyze(&self.analyzer, doc, cancel)
    }

    pub fn add_document(&mut self, doc: &Document, cancel: Option<&Cancellation>) -> Result<DocId> {
        let analyzed = self.analyze_document(doc, cancel)?;
        cancel::check(cancel, "add_document")?;
        self.store.stage_document(analyzed)
    }

    /// Index one UTF-8 text file as `content`, `filename` and `filepath`.
    pub fn add_file(&mut self, path: &Path) -> Result<DocId> {
        let doc = load_file_document(path)?;
        self.add_document(&doc, None)
    }

    /// Read and analyze files in parallel, then stage them in input order.
    /// Per-file failures are recorded in the summary; nothing is returned as
    /// an error.
    pub fn index_files(&mut self, paths: &[PathBuf], cancel: Option<&Cancellation>) -> BatchSummary {
        let start = Instant::now();
        let analyzer = &self.analyzer;
        let prepare = |path: &PathBuf| -> Result<AnalyzedDocument> {
            cancel::check(cancel, "index_files")?;
            let doc = load_file_document(path)?;
            analyze(analyzer, &doc, cancel)
        };

        let prepared: Vec<Result<AnalyzedDocument>> = if paths.len() >= self.parallel_threshold {
            self.pool.install(|| paths.par_iter().map(prepare).collect())
        } else {
            paths.iter().map(prepare).collect()
        };

        let mut summary = BatchSummary::new();
        for (path, analyzed) in paths.iter().zip(prepared) {
            let staged = cancel::check(cancel, "index_files")
                .and_then(|_| analyzed)
                .and_then(|doc| self.store.stage_document(doc));

            match staged {
                Ok(doc_id) => summary.record_success(path.clone(), doc_id),
                Err(e) => {
                    if e.kind() != ErrorKind::Cancelled {
                        warn!(path = %path.display(), error = %e, "failed to index file");
                    }
                    summary.record_failure(path.clone(), e);
                }
            }
        }

        info!(
            files = paths.len(),
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch indexed"
        );
        summary
    }

    /// Index every file the source lists under `dir`. Only a listing
    /// failure is returned as an error.
    pub fn index_directory(
        &mut self,
        dir: &Path,
        source: &dyn DocumentSource,
        cancel: Option<&Cancellation>,
    ) -> Result<BatchSummary> {
        let paths = source.list(dir)?;
        debug!(dir = %dir.display(), files = paths.len(), "directory listed");
        Ok(self.index_files(&paths, cancel))
    }

    pub fn delete_document(&mut self, doc_id: DocId) -> Result<()> {
        self.store.delete_document(doc_id)
    }

    /// Delete `doc_id` and add `doc` under a fresh id. Both take effect at
    /// the next commit.
    pub fn update_document(&mut self, doc_id: DocId, doc: &Document, cancel: Option<&Cancellation>) -> Result<DocId> {
        let analyzed = self.analyze_document(doc, cancel)?;
        self.store.delete_document(doc_id)?;
        self.store.stage_document(analyzed)
    }

    pub fn commit(&mut self) -> Result<CommitInfo> {
        self.store.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.store.rollback()
    }

    pub fn merge(&mut self) -> Result<CommitInfo> {
        self.store.merge_segments()
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        self.store.release_writer();
    }
}

fn analyze(analyzer: &Analyzer, doc: &Document, cancel: Option<&Cancellation>) -> Result<AnalyzedDocument> {
    let mut occurrences: BTreeMap<Term, (u32, Vec<u32>)> = BTreeMap::new();
    let mut field_lengths = BTreeMap::new();
    let mut field_kinds = BTreeMap::new();
    let mut seen = 0usize;

    for field in &doc.fields {
        field_kinds.insert(field.name.clone(), field.kind);
        let mut length = 0u32;

        match field.kind {
            FieldKind::Keyword => {
                if !field.value.is_empty() {
                    let entry = occurrences.entry(Term::new(&field.name, &field.value)).or_default();
                    entry.0 += 1;
                    entry.1.push(0);
                    length = 1;
                }
            }
            FieldKind::Text => {
                for token in analyzer.analyze(&field.value) {
                    seen += 1;
                    if seen % CANCEL_CHECK_INTERVAL == 0 {
                        cancel::check(cancel, "analysis")?;
                    }
                    let entry = occurrences.entry(Term::new(&field.name, token.text)).or_default();
                    entry.0 += 1;
                    entry.1.push(token.position);
                    length += 1;
                }
            }
        }
        field_lengths.insert(field.name.clone(), length);
    }

    Ok(AnalyzedDocument {
        terms: occurrences.into_iter()
            .map(|(term, (freq, positions))| (term, freq, positions))
            .collect(),
        stored: StoredDocument {
            fields: doc.stored_fields(),
            field_lengths,
        },
        field_kinds,
    })
}
