use std::collections::BTreeMap;
use std::fs;
use chrono::{DateTime, Utc};
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::FieldKind;
use crate::storage::block::{self, CompressionType};
use crate::storage::layout::{self, StorageLayout};
use crate::storage::segment::SegmentMeta;

/// Commit marker. A segment or deletion is committed exactly when the
/// checkpoint naming it has been renamed into place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
    pub next_doc_id: u64,
    pub analyzer: String,
    pub fields: BTreeMap<String, FieldKind>,
    pub segments: Vec<SegmentMeta>,
    deleted: Vec<u8>,           // Serialized RoaringTreemap of deleted doc ids
}

impl Checkpoint {
    pub fn new(analyzer: impl Into<String>) -> Self {
        Checkpoint {
            generation: 0,
            timestamp: Utc::now(),
            next_doc_id: 0,
            analyzer: analyzer.into(),
            fields: BTreeMap::new(),
            segments: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Load checkpoint from disk
    pub fn load(layout: &StorageLayout) -> Result<Option<Self>> {
        let path = layout.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }
        block::read_block(&path).map(Some)
    }

    /// Atomically replace the checkpoint: temp file, fsync, rename, fsync dir
    pub fn save(&self, layout: &StorageLayout) -> Result<()> {
        let tmp = layout.checkpoint_tmp_path();
        block::write_block(&tmp, self, CompressionType::None)?;
        fs::rename(&tmp, layout.checkpoint_path())
            .map_err(|e| Error::store(format!("cannot install checkpoint: {}", e)))?;
        layout::sync_dir(&layout.meta_dir)
    }

    pub fn deleted(&self) -> Result<RoaringTreemap> {
        if self.deleted.is_empty() {
            return Ok(RoaringTreemap::new());
        }
        RoaringTreemap::deserialize_from(&self.deleted[..])
            .map_err(|e| Error::store(format!("corrupted deleted set: {}", e)))
    }

    pub fn set_deleted(&mut self, deleted: &RoaringTreemap) -> Result<()> {
        let mut bytes = Vec::with_capacity(deleted.serialized_size());
        deleted.serialize_into(&mut bytes)
            .map_err(|e| Error::store(format!("cannot serialize deleted set: {}", e)))?;
        self.deleted = bytes;
        Ok(())
    }

    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count as u64).sum()
    }
}
