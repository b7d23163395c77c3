use std::fs::{File, OpenOptions};
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;

/// Single writer guarantee across processes. Held for the lifetime of an
/// `IndexWriter`; released on drop.
pub struct FileLock {
    pub file: File,
}

impl FileLock {
    pub fn acquire(layout: &StorageLayout) -> Result<Self> {
        let lock_path = layout.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::store(format!("cannot open {}: {}", lock_path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let fd = file.as_raw_fd();
            unsafe {
                if flock(fd, LOCK_EX | LOCK_NB) != 0 {
                    return Err(Error::new(
                        ErrorKind::InvalidState,
                        format!("{} is locked by another writer", layout.base_dir.display()),
                    ));
                }
            }
        }

        debug!(path = %lock_path.display(), "writer lock acquired");
        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn second_lock_on_same_root_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::create(dir.path()).unwrap();

        let first = FileLock::acquire(&layout).unwrap();
        let err = FileLock::acquire(&layout).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        drop(first);
        assert!(FileLock::acquire(&layout).is_ok());
    }
}
