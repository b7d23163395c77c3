use std::collections::BTreeMap;
use std::fs::File;
use fst::{Map, Streamer};
use memmap2::Mmap;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::posting::PostingList;
use crate::index::segment_index::StoredDocument;
use crate::index::term::Term;
use crate::storage::block;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::SegmentMeta;

/// Read side of one committed segment. The term dictionary stays memory
/// mapped; posting lists and stored documents are decoded once on open.
pub struct SegmentReader {
    pub meta: SegmentMeta,
    terms: Map<Mmap>,
    postings: Vec<PostingList>,
    documents: BTreeMap<DocId, StoredDocument>,
}

impl SegmentReader {
    pub fn open(layout: &StorageLayout, meta: SegmentMeta) -> Result<Self> {
        let terms_path = layout.terms_path(&meta.id);
        let file = File::open(&terms_path)
            .map_err(|e| Error::store(format!("missing segment file {}: {}", terms_path.display(), e)))?;
        let mmap = unsafe { Mmap::map(&file)? };

        if crc32fast::hash(&mmap[..]) != meta.checksums.terms {
            return Err(Error::store(format!("checksum mismatch in {}", terms_path.display())));
        }
        let terms = Map::new(mmap)?;

        let postings_path = layout.postings_path(&meta.id);
        let postings: Vec<PostingList> =
            block::decode_block(&read_verified(&postings_path, meta.checksums.postings)?)?;

        let docs_path = layout.docs_path(&meta.id);
        let documents: Vec<(DocId, StoredDocument)> =
            block::decode_block(&read_verified(&docs_path, meta.checksums.docs)?)?;

        if postings.len() != terms.len() {
            return Err(Error::store(format!(
                "segment {} has {} terms but {} posting lists", meta.id, terms.len(), postings.len()
            )));
        }

        Ok(SegmentReader {
            meta,
            terms,
            postings,
            documents: documents.into_iter().collect(),
        })
    }

    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        let ordinal = self.terms.get(term.key())?;
        self.postings.get(ordinal as usize)
    }

    pub fn document(&self, doc_id: DocId) -> Option<&StoredDocument> {
        self.documents.get(&doc_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = (&DocId, &StoredDocument)> {
        self.documents.iter()
    }

    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Every (term, posting list) pair in term order. Used by merges.
    pub fn terms(&self) -> Result<Vec<(Term, &PostingList)>> {
        let mut out = Vec::with_capacity(self.terms.len());
        let mut stream = self.terms.stream();
        while let Some((key, ordinal)) = stream.next() {
            let list = self.postings.get(ordinal as usize)
                .ok_or_else(|| Error::store(format!("dangling term ordinal {}", ordinal)))?;
            out.push((Term::from_key(key)?, list));
        }
        Ok(out)
    }
}

fn read_verified(path: &std::path::Path, expected: u32) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::store(format!("missing segment file {}: {}", path.display(), e)))?;
    if crc32fast::hash(&bytes) != expected {
        return Err(Error::store(format!("checksum mismatch in {}", path.display())));
    }
    Ok(bytes)
}
