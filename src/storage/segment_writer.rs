use chrono::Utc;
use fst::MapBuilder;
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::posting::PostingList;
use crate::index::segment_index::{SegmentIndex, StoredDocument};
use crate::storage::block::{self, CompressionType};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentChecksums, SegmentId, SegmentMeta};

/// Turns an in-memory `SegmentIndex` into three immutable files:
/// `.terms` (fst map, term key -> ordinal), `.post` (posting lists by ordinal)
/// and `.docs` (stored documents). Files are fsynced before returning.
pub struct SegmentWriter<'a> {
    pub layout: &'a StorageLayout,
    pub compression: CompressionType,
    pub has_positions: bool,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(layout: &'a StorageLayout, compression: CompressionType, has_positions: bool) -> Self {
        SegmentWriter { layout, compression, has_positions }
    }

    pub fn write(&self, index: &SegmentIndex) -> Result<SegmentMeta> {
        let (Some(min_doc_id), Some(max_doc_id)) = (index.min_doc_id(), index.max_doc_id()) else {
            return Err(Error::invalid_argument("cannot write a segment without documents"));
        };

        let id = SegmentId::new();
        match self.write_files(id, index) {
            Ok((checksums, size_bytes)) => {
                debug!(segment = %id, docs = index.doc_count(), terms = index.term_count(), "segment written");
                Ok(SegmentMeta {
                    id,
                    doc_count: index.doc_count() as u32,
                    term_count: index.term_count() as u32,
                    total_tokens: index.total_tokens,
                    min_doc_id,
                    max_doc_id,
                    created_at: Utc::now(),
                    has_positions: self.has_positions,
                    size_bytes,
                    checksums,
                })
            }
            Err(e) => {
                self.layout.remove_segment(&id);
                Err(e)
            }
        }
    }

    fn write_files(&self, id: SegmentId, index: &SegmentIndex) -> Result<(SegmentChecksums, u64)> {
        // BTreeMap iteration is in term order, which is also key byte order
        let mut builder = MapBuilder::memory();
        let mut lists: Vec<&PostingList> = Vec::with_capacity(index.term_count());
        for (ordinal, (term, list)) in index.postings.iter().enumerate() {
            builder.insert(term.key(), ordinal as u64)?;
            lists.push(list);
        }
        let terms = builder.into_inner()?;
        block::write_synced(&self.layout.terms_path(&id), &terms)?;

        let postings_crc = block::write_block(&self.layout.postings_path(&id), &lists, self.compression)?;

        let documents: Vec<(&DocId, &StoredDocument)> = index.documents.iter().collect();
        let docs_crc = block::write_block(&self.layout.docs_path(&id), &documents, self.compression)?;

        let mut size_bytes = 0;
        for path in self.layout.segment_files(&id) {
            size_bytes += std::fs::metadata(path)?.len();
        }

        Ok((SegmentChecksums {
            terms: crc32fast::hash(&terms),
            postings: postings_crc,
            docs: docs_crc,
        }, size_bytes))
    }
}
