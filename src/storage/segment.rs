use std::fmt;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::types::DocId;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(SegmentId)
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CRC32 of each complete segment file, verified on open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentChecksums {
    pub terms: u32,
    pub postings: u32,
    pub docs: u32,
}

/// Committed, immutable segment as recorded in the checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub doc_count: u32,
    pub term_count: u32,
    pub total_tokens: u64,
    pub min_doc_id: DocId,
    pub max_doc_id: DocId,
    pub created_at: DateTime<Utc>,
    pub has_positions: bool,
    pub size_bytes: u64,
    pub checksums: SegmentChecksums,
}

impl SegmentMeta {
    pub fn covers(&self, doc_id: DocId) -> bool {
        self.min_doc_id <= doc_id && doc_id <= self.max_doc_id
    }
}
