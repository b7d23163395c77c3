use crate::storage::segment::SegmentMeta;

/// Policy for deciding when segments should be merged
pub trait MergePolicy: Send + Sync {
    /// Check if segments should be merged
    fn should_merge(&self, segments: &[SegmentMeta], deleted_count: u64) -> bool;
}

/// Merge everything once the segment count passes `max_segments`, or once
/// deleted documents make up more than `max_deleted_ratio` of the index.
pub struct SegmentCountMergePolicy {
    pub max_segments: usize,
    pub max_deleted_ratio: f64,
}

impl SegmentCountMergePolicy {
    pub fn new(max_segments: usize) -> Self {
        SegmentCountMergePolicy {
            max_segments: max_segments.max(1),
            max_deleted_ratio: 0.5,
        }
    }
}

impl Default for SegmentCountMergePolicy {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MergePolicy for SegmentCountMergePolicy {
    fn should_merge(&self, segments: &[SegmentMeta], deleted_count: u64) -> bool {
        if segments.len() > self.max_segments {
            return true;
        }

        let total: u64 = segments.iter().map(|s| s.doc_count as u64).sum();
        total > 0 && deleted_count as f64 / total as f64 > self.max_deleted_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::core::types::DocId;
    use crate::storage::segment::{SegmentChecksums, SegmentId};

    fn meta(doc_count: u32) -> SegmentMeta {
        SegmentMeta {
            id: SegmentId::new(),
            doc_count,
            term_count: 1,
            total_tokens: doc_count as u64,
            min_doc_id: DocId(0),
            max_doc_id: DocId(doc_count as u64),
            created_at: Utc::now(),
            has_positions: true,
            size_bytes: 0,
            checksums: SegmentChecksums::default(),
        }
    }

    #[test]
    fn merges_past_segment_limit() {
        let policy = SegmentCountMergePolicy::new(2);
        assert!(!policy.should_merge(&[meta(4), meta(4)], 0));
        assert!(policy.should_merge(&[meta(4), meta(4), meta(4)], 0));
    }

    #[test]
    fn merges_when_mostly_deleted() {
        let policy = SegmentCountMergePolicy::new(10);
        assert!(!policy.should_merge(&[meta(10)], 5));
        assert!(policy.should_merge(&[meta(10)], 6));
        assert!(!policy.should_merge(&[], 0));
    }
}
