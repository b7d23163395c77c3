use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use chrono::Utc;
use parking_lot::Mutex;
use roaring::RoaringTreemap;
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, StoredFields};
use crate::index::posting::Posting;
use crate::index::segment_index::{AnalyzedDocument, SegmentIndex};
use crate::index::term::Term;
use crate::mvcc::snapshot::{Snapshot, SnapshotController};
use crate::storage::block::CompressionType;
use crate::storage::checkpoint::Checkpoint;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::merge_policy::{MergePolicy, SegmentCountMergePolicy};
use crate::storage::segment::{SegmentId, SegmentMeta};
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;

/// Checkpoint generations followed before giving up on opening a snapshot
const MAX_OPEN_ATTEMPTS: usize = 16;

/// Outcome of a commit or merge
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    pub generation: u64,
    pub docs_added: usize,
    pub docs_deleted: u64,
    pub segment_count: usize,
    pub merged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub generation: u64,
    pub segment_count: usize,
    pub doc_count: u64,
    pub deleted_count: u64,
    pub term_count: usize,
    pub pending_docs: usize,
    pub pending_deletes: u64,
    pub size_bytes: u64,
}

struct WriteState {
    pending: SegmentIndex,
    pending_deletes: RoaringTreemap,
    next_doc_id: u64,
    cycle_start: u64,           // First id allocated since the last commit/rollback
    checkpoint: Checkpoint,
    lock: Option<FileLock>,
}

/// Durable inverted index: committed segments behind a snapshot, plus one
/// pending segment that only the active writer mutates. Nothing pending is
/// visible to readers until `commit` installs a new checkpoint.
pub struct IndexStore {
    layout: StorageLayout,
    compression: CompressionType,
    track_positions: bool,
    merge_policy: Box<dyn MergePolicy>,
    controller: SnapshotController,
    state: Mutex<WriteState>,
    closed: AtomicBool,
    writer_active: AtomicBool,
    read_only: bool,
}

impl IndexStore {
    /// Open or create the index rooted at `config.storage_path`.
    pub fn open(config: &Config) -> Result<Self> {
        let layout = StorageLayout::create(&config.storage_path)?;
        let checkpoint = match Checkpoint::load(&layout)? {
            Some(checkpoint) => checkpoint,
            None => {
                let checkpoint = Checkpoint::new(config.analyzer.clone());
                checkpoint.save(&layout)?;
                info!(path = %layout.base_dir.display(), "created new index");
                checkpoint
            }
        };
        Self::from_checkpoint(layout, config, checkpoint, false)
    }

    /// Open an existing index for searching only
    pub fn open_read_only(config: &Config) -> Result<Self> {
        let layout = StorageLayout::at(&config.storage_path);
        let checkpoint = Checkpoint::load(&layout)?.ok_or_else(|| {
            Error::not_found(format!("no index at {}", layout.base_dir.display()))
        })?;
        Self::from_checkpoint(layout, config, checkpoint, true)
    }

    fn from_checkpoint(layout: StorageLayout, config: &Config, checkpoint: Checkpoint, read_only: bool) -> Result<Self> {
        if checkpoint.analyzer != config.analyzer {
            warn!(
                index_analyzer = %checkpoint.analyzer,
                configured = %config.analyzer,
                "index was built with a different analyzer"
            );
        }

        let (checkpoint, segments) = load_consistent(&layout, checkpoint, &HashMap::new())?;
        let snapshot = Snapshot::build(&checkpoint, segments)?;
        info!(
            path = %layout.base_dir.display(),
            generation = checkpoint.generation,
            segments = checkpoint.segments.len(),
            docs = snapshot.live_doc_count(),
            read_only,
            "index store opened"
        );

        let next_doc_id = checkpoint.next_doc_id;
        Ok(IndexStore {
            layout,
            compression: config.compression,
            track_positions: config.track_positions,
            merge_policy: Box::new(SegmentCountMergePolicy::new(config.max_segments)),
            controller: SnapshotController::new(snapshot),
            state: Mutex::new(WriteState {
                pending: SegmentIndex::new(),
                pending_deletes: RoaringTreemap::new(),
                next_doc_id,
                cycle_start: next_doc_id,
                checkpoint,
                lock: None,
            }),
            closed: AtomicBool::new(false),
            writer_active: AtomicBool::new(false),
            read_only,
        })
    }

    pub fn with_merge_policy(mut self, policy: Box<dyn MergePolicy>) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn tracks_positions(&self) -> bool {
        self.track_positions
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::closed());
        }
        Ok(())
    }

    fn ensure_writer(&self, state: &WriteState) -> Result<()> {
        self.ensure_open()?;
        if state.lock.is_none() {
            return Err(Error::new(ErrorKind::InvalidState, "no active writer on this store".to_string()));
        }
        Ok(())
    }

    /// Claim the single writer slot: in-process flag plus the OS lock on
    /// `write.lock`. Picks up commits made by another process since open and
    /// clears segment files no checkpoint refers to.
    pub fn begin_writer(&self) -> Result<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(Error::new(ErrorKind::InvalidState, "store was opened read-only".to_string()));
        }
        if self.writer_active.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(Error::new(ErrorKind::InvalidState, "a writer is already active".to_string()));
        }

        let result = (|| -> Result<()> {
            let lock = FileLock::acquire(&self.layout)?;
            let mut state = self.state.lock();
            self.reload_locked(&mut state)?;

            let live: HashSet<SegmentId> = state.checkpoint.segments.iter().map(|s| s.id).collect();
            let removed = self.layout.remove_unreferenced(&live)?;
            if removed > 0 {
                info!(files = removed, "removed segment files left by an interrupted commit");
            }

            state.cycle_start = state.next_doc_id;
            state.lock = Some(lock);
            Ok(())
        })();

        if result.is_err() {
            self.writer_active.store(false, Ordering::Release);
        }
        result
    }

    /// Give up the writer slot. Uncommitted changes are discarded.
    pub fn release_writer(&self) {
        let mut state = self.state.lock();
        if state.lock.is_none() {
            return;
        }
        if !state.pending.is_empty() || !state.pending_deletes.is_empty() {
            warn!(
                pending_docs = state.pending.doc_count(),
                pending_deletes = state.pending_deletes.len(),
                "writer released with uncommitted changes; discarding"
            );
        }
        Self::discard_pending(&mut state);
        state.lock = None;
        self.writer_active.store(false, Ordering::Release);
        debug!("writer lock released");
    }

    fn discard_pending(state: &mut WriteState) {
        state.pending = SegmentIndex::new();
        state.pending_deletes.clear();
        state.cycle_start = state.next_doc_id;
    }

    /// Reserve the next document id. Ids are never handed out twice, even if
    /// the document is later rolled back.
    pub fn allocate_doc_id(&self) -> Result<DocId> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;
        Ok(Self::next_id(&mut state))
    }

    fn next_id(state: &mut WriteState) -> DocId {
        let id = DocId(state.next_doc_id);
        state.next_doc_id += 1;
        id
    }

    /// Merge one occurrence of `term` into the pending segment.
    pub fn add_posting(&self, term: &Term, doc_id: DocId, position: Option<u32>) -> Result<()> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;
        if doc_id.0 < state.cycle_start || doc_id.0 >= state.next_doc_id {
            return Err(Error::invalid_argument(format!(
                "document {} was not allocated in the current write cycle", doc_id
            )));
        }

        let position = if self.track_positions { position } else { None };
        state.pending.add_posting(term.clone(), doc_id, position);
        state.pending.documents.entry(doc_id).or_default();
        Ok(())
    }

    pub fn store_fields(&self, doc_id: DocId, fields: StoredFields) -> Result<()> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;
        if doc_id.0 < state.cycle_start || doc_id.0 >= state.next_doc_id {
            return Err(Error::invalid_argument(format!(
                "document {} was not allocated in the current write cycle", doc_id
            )));
        }
        state.pending.documents.entry(doc_id).or_default().fields = fields;
        Ok(())
    }

    /// Allocate an id and stage a fully analyzed document in one critical
    /// section, so a document is either entirely pending or absent.
    pub fn stage_document(&self, mut doc: AnalyzedDocument) -> Result<DocId> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;

        if !self.track_positions {
            for (_, _, positions) in doc.terms.iter_mut() {
                positions.clear();
            }
        }

        let doc_id = Self::next_id(&mut state);
        state.pending.add_analyzed(doc_id, doc);
        Ok(doc_id)
    }

    /// Mark a document deleted. Pending documents are dropped at once;
    /// committed ones disappear from readers at the next commit.
    pub fn delete_document(&self, doc_id: DocId) -> Result<()> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;

        if state.pending.remove_document(doc_id) {
            return Ok(());
        }
        if state.pending_deletes.contains(doc_id.0) {
            return Ok(());
        }
        if !self.controller.current().is_live(doc_id) {
            return Err(Error::not_found(format!("document {} not found", doc_id)));
        }
        state.pending_deletes.insert(doc_id.0);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.ensure_open()?;
        Ok(self.controller.current())
    }

    pub fn version(&self) -> u64 {
        self.controller.version()
    }

    /// Committed postings for `term`; empty when the term is unknown
    pub fn get_postings(&self, term: &Term) -> Result<Vec<Posting>> {
        Ok(self.snapshot()?.postings(term))
    }

    pub fn get_stored_fields(&self, doc_id: DocId) -> Result<StoredFields> {
        self.snapshot()?.stored_fields(doc_id)
    }

    /// Make pending documents and deletions durable and visible.
    ///
    /// Order: segment files (fsynced), then the checkpoint rename, then the
    /// in-memory snapshot swap. A failure before the rename leaves the
    /// previous commit intact and the pending state untouched.
    pub fn commit(&self) -> Result<CommitInfo> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;

        let docs_added = state.pending.doc_count();
        let docs_deleted = state.pending_deletes.len();
        if docs_added == 0 && docs_deleted == 0 {
            return Ok(CommitInfo {
                generation: state.checkpoint.generation,
                docs_added: 0,
                docs_deleted: 0,
                segment_count: state.checkpoint.segments.len(),
                merged: false,
            });
        }

        let current = self.controller.current();
        let mut segments = current.segments.clone();
        let mut checkpoint = state.checkpoint.clone();
        let mut written: Vec<SegmentId> = Vec::new();

        let result = (|| -> Result<bool> {
            if docs_added > 0 {
                let meta = SegmentWriter::new(&self.layout, self.compression, self.track_positions)
                    .write(&state.pending)?;
                written.push(meta.id);
                segments.push(Arc::new(SegmentReader::open(&self.layout, meta.clone())?));
                checkpoint.segments.push(meta);
            }

            let mut deleted = checkpoint.deleted()?;
            deleted |= &state.pending_deletes;
            checkpoint.set_deleted(&deleted)?;
            for (name, kind) in &state.pending.fields {
                checkpoint.fields.entry(name.clone()).or_insert(*kind);
            }
            checkpoint.generation += 1;
            checkpoint.timestamp = Utc::now();
            checkpoint.next_doc_id = state.next_doc_id;

            let mut merged = false;
            if self.merge_policy.should_merge(&checkpoint.segments, deleted.len()) {
                match self.merge_into(&mut checkpoint, &mut segments, &deleted) {
                    Ok(Some(id)) => {
                        written.push(id);
                        merged = true;
                    }
                    Ok(None) => merged = true,
                    Err(e) => warn!(error = %e, "automatic merge failed; committing without it"),
                }
            }

            checkpoint.save(&self.layout)?;
            Ok(merged)
        })();

        let merged = match result {
            Ok(merged) => merged,
            Err(e) => {
                for id in &written {
                    self.layout.remove_segment(id);
                }
                warn!(error = %e, "commit failed; pending changes kept");
                return Err(e);
            }
        };

        let snapshot = Snapshot::build(&checkpoint, segments)?;
        self.controller.publish(snapshot);
        Self::discard_pending(&mut state);
        state.checkpoint = checkpoint;
        self.remove_superseded(&state.checkpoint);

        let info = CommitInfo {
            generation: state.checkpoint.generation,
            docs_added,
            docs_deleted,
            segment_count: state.checkpoint.segments.len(),
            merged,
        };
        info!(
            generation = info.generation,
            docs_added,
            docs_deleted,
            segments = info.segment_count,
            merged,
            "commit complete"
        );
        Ok(info)
    }

    /// Discard pending documents and deletions
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;
        debug!(
            pending_docs = state.pending.doc_count(),
            pending_deletes = state.pending_deletes.len(),
            "rollback"
        );
        Self::discard_pending(&mut state);
        Ok(())
    }

    /// Rewrite all committed segments into one, dropping deleted documents.
    /// Pending changes are not touched.
    pub fn merge_segments(&self) -> Result<CommitInfo> {
        let mut state = self.state.lock();
        self.ensure_writer(&state)?;

        let current = self.controller.current();
        let mut segments = current.segments.clone();
        let mut checkpoint = state.checkpoint.clone();
        let deleted = checkpoint.deleted()?;
        let docs_deleted = deleted.len();

        let written = self.merge_into(&mut checkpoint, &mut segments, &deleted)?;
        checkpoint.generation += 1;
        checkpoint.timestamp = Utc::now();

        if let Err(e) = checkpoint.save(&self.layout) {
            if let Some(id) = written {
                self.layout.remove_segment(&id);
            }
            return Err(e);
        }

        self.controller.publish(Snapshot::build(&checkpoint, segments)?);
        state.checkpoint = checkpoint;
        self.remove_superseded(&state.checkpoint);

        Ok(CommitInfo {
            generation: state.checkpoint.generation,
            docs_added: 0,
            docs_deleted,
            segment_count: state.checkpoint.segments.len(),
            merged: true,
        })
    }

    /// Replace `segments` with a single segment holding their live documents.
    /// Returns the id of the segment written, if any documents survived.
    fn merge_into(
        &self,
        checkpoint: &mut Checkpoint,
        segments: &mut Vec<Arc<SegmentReader>>,
        deleted: &RoaringTreemap,
    ) -> Result<Option<SegmentId>> {
        let before = segments.len();
        let mut merged = SegmentIndex::new();
        for segment in segments.iter() {
            for (doc_id, doc) in segment.documents() {
                if !deleted.contains(doc_id.0) {
                    merged.store_document(*doc_id, doc.clone());
                }
            }
            for (term, list) in segment.terms()? {
                for posting in list.live(deleted) {
                    merged.insert_posting(term.clone(), posting.clone());
                }
            }
        }
        merged.fields = checkpoint.fields.clone();

        let mut metas: Vec<SegmentMeta> = Vec::new();
        let mut readers: Vec<Arc<SegmentReader>> = Vec::new();
        let mut written = None;
        if !merged.is_empty() {
            let has_positions = segments.iter().all(|s| s.meta.has_positions);
            let meta = SegmentWriter::new(&self.layout, self.compression, has_positions).write(&merged)?;
            written = Some(meta.id);
            match SegmentReader::open(&self.layout, meta.clone()) {
                Ok(reader) => readers.push(Arc::new(reader)),
                Err(e) => {
                    self.layout.remove_segment(&meta.id);
                    return Err(e);
                }
            }
            metas.push(meta);
        }

        checkpoint.segments = metas;
        checkpoint.set_deleted(&RoaringTreemap::new())?;
        *segments = readers;

        info!(
            segments_before = before,
            docs = merged.doc_count(),
            dropped = deleted.len(),
            "segments merged"
        );
        Ok(written)
    }

    fn remove_superseded(&self, checkpoint: &Checkpoint) {
        let live: HashSet<SegmentId> = checkpoint.segments.iter().map(|s| s.id).collect();
        if let Err(e) = self.layout.remove_unreferenced(&live) {
            warn!(error = %e, "could not remove superseded segment files");
        }
    }

    /// Pick up a checkpoint written by another process. Returns whether a
    /// newer snapshot was published. A store with an active writer already
    /// holds the latest state.
    pub fn refresh(&self) -> Result<bool> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        if state.lock.is_some() {
            return Ok(false);
        }
        self.reload_locked(&mut state)
    }

    fn reload_locked(&self, state: &mut WriteState) -> Result<bool> {
        let Some(checkpoint) = Checkpoint::load(&self.layout)? else {
            return Err(Error::store(format!("checkpoint missing under {}", self.layout.base_dir.display())));
        };
        if checkpoint.generation == state.checkpoint.generation {
            return Ok(false);
        }

        let current = self.controller.current();
        let reuse: HashMap<SegmentId, Arc<SegmentReader>> = current.segments.iter()
            .map(|s| (s.meta.id, Arc::clone(s)))
            .collect();
        let (checkpoint, segments) = load_consistent(&self.layout, checkpoint, &reuse)?;
        self.controller.publish(Snapshot::build(&checkpoint, segments)?);

        debug!(from = state.checkpoint.generation, to = checkpoint.generation, "reloaded checkpoint");
        state.next_doc_id = state.next_doc_id.max(checkpoint.next_doc_id);
        state.checkpoint = checkpoint;
        Ok(true)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.ensure_open()?;
        let state = self.state.lock();
        let snapshot = self.controller.current();
        Ok(IndexStats {
            generation: snapshot.generation,
            segment_count: snapshot.segments.len(),
            doc_count: snapshot.live_doc_count(),
            deleted_count: snapshot.deleted_count(),
            term_count: snapshot.segments.iter().map(|s| s.term_count()).sum(),
            pending_docs: state.pending.doc_count(),
            pending_deletes: state.pending_deletes.len(),
            size_bytes: state.checkpoint.segments.iter().map(|s| s.size_bytes).sum(),
        })
    }

    /// Release the writer lock and refuse further calls. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.release_writer();
        info!(path = %self.layout.base_dir.display(), "index store closed");
        Ok(())
    }
}

impl Drop for IndexStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn open_segments(
    layout: &StorageLayout,
    metas: &[SegmentMeta],
    reuse: &HashMap<SegmentId, Arc<SegmentReader>>,
) -> Result<Vec<Arc<SegmentReader>>> {
    metas.iter()
        .map(|meta| match reuse.get(&meta.id) {
            Some(reader) => Ok(Arc::clone(reader)),
            None => SegmentReader::open(layout, meta.clone()).map(Arc::new),
        })
        .collect()
}

/// Open the segments named by `checkpoint`, following newer checkpoints
/// when a segment has vanished. A writer only removes segment files after a
/// newer checkpoint is in place, so a missing file with an unchanged
/// generation is real damage and is returned as is.
fn load_consistent(
    layout: &StorageLayout,
    mut checkpoint: Checkpoint,
    reuse: &HashMap<SegmentId, Arc<SegmentReader>>,
) -> Result<(Checkpoint, Vec<Arc<SegmentReader>>)> {
    let mut attempt = 1;
    loop {
        let err = match open_segments(layout, &checkpoint.segments, reuse) {
            Ok(segments) => return Ok((checkpoint, segments)),
            Err(e) => e,
        };
        if err.kind() != ErrorKind::StoreIo || attempt >= MAX_OPEN_ATTEMPTS {
            return Err(err);
        }
        let Some(latest) = Checkpoint::load(layout)? else {
            return Err(err);
        };
        if latest.generation == checkpoint.generation {
            return Err(err);
        }

        debug!(
            from = checkpoint.generation,
            to = latest.generation,
            attempt,
            error = %err,
            "segments superseded while opening; retrying with newer checkpoint"
        );
        checkpoint = latest;
        attempt += 1;
    }
}
