use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use roaring::RoaringTreemap;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, FieldKind, StoredFields};
use crate::index::posting::Posting;
use crate::index::segment_index::StoredDocument;
use crate::index::term::Term;
use crate::storage::checkpoint::Checkpoint;
use crate::storage::segment_reader::SegmentReader;

/// Immutable committed view of the index. Readers keep an `Arc<Snapshot>`
/// for as long as they need a stable view; commits never mutate one.
pub struct Snapshot {
    pub version: u64,
    pub generation: u64,
    pub segments: Vec<Arc<SegmentReader>>,      // Ordered by min doc id
    pub deleted: Arc<RoaringTreemap>,
    pub fields: BTreeMap<String, FieldKind>,
    pub analyzer: String,
    pub timestamp: DateTime<Utc>,
    field_totals: BTreeMap<String, u64>,
    live_docs: u64,
}

impl Snapshot {
    pub fn empty(analyzer: impl Into<String>) -> Self {
        Snapshot {
            version: 0,
            generation: 0,
            segments: Vec::new(),
            deleted: Arc::new(RoaringTreemap::new()),
            fields: BTreeMap::new(),
            analyzer: analyzer.into(),
            timestamp: Utc::now(),
            field_totals: BTreeMap::new(),
            live_docs: 0,
        }
    }

    pub fn build(checkpoint: &Checkpoint, mut segments: Vec<Arc<SegmentReader>>) -> Result<Self> {
        segments.sort_by_key(|s| s.meta.min_doc_id);
        let deleted = checkpoint.deleted()?;

        let mut field_totals: BTreeMap<String, u64> = BTreeMap::new();
        let mut live_docs = 0;
        for segment in &segments {
            for (doc_id, doc) in segment.documents() {
                if deleted.contains(doc_id.0) {
                    continue;
                }
                live_docs += 1;
                for (field, len) in &doc.field_lengths {
                    *field_totals.entry(field.clone()).or_insert(0) += *len as u64;
                }
            }
        }

        Ok(Snapshot {
            version: 0,
            generation: checkpoint.generation,
            segments,
            deleted: Arc::new(deleted),
            fields: checkpoint.fields.clone(),
            analyzer: checkpoint.analyzer.clone(),
            timestamp: checkpoint.timestamp,
            field_totals,
            live_docs,
        })
    }

    /// Live postings for `term` across all segments, sorted by doc id.
    /// Unknown terms yield an empty list.
    pub fn postings(&self, term: &Term) -> Vec<Posting> {
        let mut out = Vec::new();
        for segment in &self.segments {
            if let Some(list) = segment.postings(term) {
                out.extend(list.live(&self.deleted).cloned());
            }
        }
        out
    }

    pub fn doc_freq(&self, term: &Term) -> u32 {
        self.segments.iter()
            .filter_map(|s| s.postings(term))
            .map(|list| list.live(&self.deleted).count() as u32)
            .sum()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&StoredDocument> {
        if self.deleted.contains(doc_id.0) {
            return None;
        }
        self.segments.iter()
            .filter(|s| s.meta.covers(doc_id))
            .find_map(|s| s.document(doc_id))
    }

    pub fn stored_fields(&self, doc_id: DocId) -> Result<StoredFields> {
        self.document(doc_id)
            .map(|doc| doc.fields.clone())
            .ok_or_else(|| Error::not_found(format!("document {} not found", doc_id)))
    }

    pub fn field_length(&self, doc_id: DocId, field: &str) -> u32 {
        self.document(doc_id)
            .and_then(|doc| doc.field_lengths.get(field).copied())
            .unwrap_or(0)
    }

    pub fn avg_field_length(&self, field: &str) -> f32 {
        if self.live_docs == 0 {
            return 0.0;
        }
        let total = self.field_totals.get(field).copied().unwrap_or(0);
        total as f32 / self.live_docs as f32
    }

    pub fn field_kind(&self, field: &str) -> Option<FieldKind> {
        self.fields.get(field).copied()
    }

    pub fn live_doc_count(&self) -> u64 {
        self.live_docs
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_docs == 0
    }

    pub fn is_live(&self, doc_id: DocId) -> bool {
        self.document(doc_id).is_some()
    }
}

/// Publishes snapshots to readers. Swapping the `Arc` is the only mutation;
/// readers holding an older snapshot are unaffected.
pub struct SnapshotController {
    current: RwLock<Arc<Snapshot>>,
    version: AtomicU64,
}

impl SnapshotController {
    pub fn new(mut initial: Snapshot) -> Self {
        initial.version = 1;
        SnapshotController {
            current: RwLock::new(Arc::new(initial)),
            version: AtomicU64::new(1),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        snapshot.version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);
        snapshot
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let controller = SnapshotController::new(Snapshot::empty("standard"));
        let before = controller.current();
        assert_eq!(before.version, 1);

        let mut checkpoint = Checkpoint::new("standard");
        checkpoint.generation = 1;
        controller.publish(Snapshot::build(&checkpoint, Vec::new()).unwrap());

        let after = controller.current();
        assert_eq!(before.generation, 0);
        assert_eq!(after.generation, 1);
        assert!(after.version > before.version);
    }

    #[test]
    fn empty_snapshot_answers_nothing() {
        let snapshot = Snapshot::empty("standard");
        assert!(snapshot.postings(&Term::new("content", "fox")).is_empty());
        assert_eq!(snapshot.avg_field_length("content"), 0.0);
        assert!(snapshot.stored_fields(DocId(0)).is_err());
    }
}
