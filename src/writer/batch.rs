use std::path::PathBuf;
use crate::core::error::Error;
use crate::core::types::DocId;

/// A file that could not be indexed, with the reason
#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Per-file outcome of a batch. Individual failures never abort the batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<(PathBuf, DocId)>,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn new() -> Self {
        BatchSummary::default()
    }

    pub fn record_success(&mut self, path: PathBuf, doc_id: DocId) {
        self.succeeded.push((path, doc_id));
    }

    pub fn record_failure(&mut self, path: PathBuf, error: Error) {
        self.failed.push(BatchFailure { path, error });
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn doc_id(&self, path: &std::path::Path) -> Option<DocId> {
        self.succeeded.iter().find(|(p, _)| p == path).map(|(_, id)| *id)
    }
}
