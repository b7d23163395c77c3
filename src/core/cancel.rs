use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use crate::core::error::{Error, ErrorKind, Result};

/// Cooperative cancellation signal shared between a caller and a running
/// search or indexing call. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Cancellation::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Cancellation {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Acquire) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with `Cancelled` once the flag is set or the deadline passed.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::new(ErrorKind::Cancelled, format!("{} was cancelled", operation)));
        }
        Ok(())
    }
}

/// Check an optional signal; `None` never cancels.
pub fn check(cancel: Option<&Cancellation>, operation: &str) -> Result<()> {
    match cancel {
        Some(cancel) => cancel.check(operation),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let cancel = Cancellation::new();
        let observer = cancel.clone();
        assert!(observer.check("search").is_ok());

        cancel.cancel();
        let err = observer.check("search").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let cancel = Cancellation::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(cancel.is_cancelled());
        assert!(check(None, "indexing").is_ok());
    }
}
