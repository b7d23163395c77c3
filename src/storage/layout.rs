use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use crate::core::error::{Error, Result};
use crate::storage::segment::SegmentId;

pub const TERMS_EXTENSION: &str = "terms";
pub const POSTINGS_EXTENSION: &str = "post";
pub const DOCS_EXTENSION: &str = "docs";

/// Directory structure of an index root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Immutable segment files
    pub meta_dir: PathBuf,      // Commit marker
}

impl StorageLayout {
    /// Describe the layout without touching the filesystem.
    pub fn at(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        StorageLayout {
            segments_dir: base_dir.join("segments"),
            meta_dir: base_dir.join("meta"),
            base_dir,
        }
    }

    /// Create the directories if missing
    pub fn create(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self::at(base_dir);
        for dir in [&layout.segments_dir, &layout.meta_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| Error::store(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        Ok(layout)
    }

    pub fn exists(&self) -> bool {
        self.checkpoint_path().exists()
    }

    pub fn terms_path(&self, id: &SegmentId) -> PathBuf {
        self.segment_file(id, TERMS_EXTENSION)
    }

    pub fn postings_path(&self, id: &SegmentId) -> PathBuf {
        self.segment_file(id, POSTINGS_EXTENSION)
    }

    pub fn docs_path(&self, id: &SegmentId) -> PathBuf {
        self.segment_file(id, DOCS_EXTENSION)
    }

    pub fn segment_files(&self, id: &SegmentId) -> [PathBuf; 3] {
        [self.terms_path(id), self.postings_path(id), self.docs_path(id)]
    }

    fn segment_file(&self, id: &SegmentId, extension: &str) -> PathBuf {
        self.segments_dir.join(format!("{}.{}", id.0, extension))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.bin")
    }

    pub fn checkpoint_tmp_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.tmp")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join("write.lock")
    }

    /// Remove segment files whose id is not in `live`. Returns the number of
    /// files removed.
    pub fn remove_unreferenced(&self, live: &HashSet<SegmentId>) -> Result<usize> {
        let entries = match fs::read_dir(&self.segments_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::store(format!("cannot list segments: {}", e))),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let referenced = segment_id_of(&path).is_some_and(|id| live.contains(&id));
            if !referenced {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn remove_segment(&self, id: &SegmentId) {
        for path in self.segment_files(id) {
            let _ = fs::remove_file(path);
        }
    }
}

fn segment_id_of(path: &Path) -> Option<SegmentId> {
    let stem = path.file_stem()?.to_str()?;
    SegmentId::parse(stem)
}

/// fsync a directory so a rename inside it is durable
pub fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| Error::store(format!("cannot sync {}: {}", dir.display(), e)))?;
    }
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stray_files_are_removed_and_live_ones_kept() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();

        let live = SegmentId::new();
        let orphan = SegmentId::new();
        for path in layout.segment_files(&live).iter().chain(layout.segment_files(&orphan).iter()) {
            fs::write(path, b"x").unwrap();
        }
        fs::write(layout.segments_dir.join("junk.tmp"), b"x").unwrap();

        let removed = layout.remove_unreferenced(&HashSet::from([live])).unwrap();
        assert_eq!(removed, 4);
        assert!(layout.terms_path(&live).exists());
        assert!(!layout.terms_path(&orphan).exists());
    }
}
