pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod mvcc;
pub mod writer;

pub use crate::core::cancel::Cancellation;
pub use crate::core::config::Config;
pub use crate::core::engine::SearchEngine;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Document, Field, FieldKind, StoredFields};
pub use crate::query::ast::Query;
pub use crate::search::results::{SearchHit, SearchResults};
pub use crate::search::snippet::Snippet;
pub use crate::writer::batch::{BatchFailure, BatchSummary};
pub use crate::writer::source::{DocumentSource, TextFileSource};

/*
Layers, bottom up:

  analysis   tokenizer + filters -> Token stream
  index      Term, PostingList, SegmentIndex (in-memory pending segment)
  storage    framed blocks, segment files (.terms fst / .post / .docs),
             checkpoint (commit marker), write.lock, IndexStore
  mvcc       Snapshot over committed segments, swapped on commit
  writer     IndexWriter: analysis outside the store lock, staged per doc
  query      lexer (nom) -> QueryParser -> Query
  scoring    Scorer trait (tf, bm25)
  search     Evaluator, TopKCollector, snippets, result cache
  core       Config, Error, Cancellation, SearchEngine facade

Commit order: segment files fsynced -> checkpoint tmp + rename -> new Snapshot.
*/
