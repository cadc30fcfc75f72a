//! Bounded acquisition of the producer's advisory lock.
//!
//! The producer publishes under an exclusive `flock` on a lock file
//! next to the segment. We take the same lock before every snapshot,
//! but never block unboundedly on it: a producer that dies while
//! holding the lock must not wedge the poll loop. Instead we retry
//! non-blocking with a short sleep and give up at a deadline, turning
//! the miss into a [`ShmError::LockTimeout`] the caller counts as a
//! transient failure.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::error::{ShmError, ShmResult};

const RETRY_SLEEP: Duration = Duration::from_millis(10);

/// Handle on the producer's lock file.
pub struct ProducerLock {
    path: PathBuf,
}

/// Held lock; released on drop.
pub struct LockGuard {
    _lock: Flock<File>,
}

impl ProducerLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, waiting at most `timeout`.
    ///
    /// The lock file is created if the producer has not made one yet;
    /// an empty flock target is harmless.
    pub fn acquire(&self, timeout: Duration) -> ShmResult<LockGuard> {
        let deadline = Instant::now() + timeout;
        let mut file = self.open_lock_file()?;
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => return Ok(LockGuard { _lock: lock }),
                Err((returned, Errno::EWOULDBLOCK)) => {
                    if Instant::now() >= deadline {
                        return Err(ShmError::LockTimeout {
                            waited_ms: timeout.as_millis() as u64,
                        });
                    }
                    file = returned;
                    std::thread::sleep(RETRY_SLEEP);
                }
                Err((_, errno)) => return Err(ShmError::Nix { source: errno }),
            }
        }
    }

    fn open_lock_file(&self) -> ShmResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_on_free_lock_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let lock = ProducerLock::new(dir.path().join("seg.lock"));
        let guard = lock.acquire(Duration::from_millis(100));
        assert!(guard.is_ok());
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.lock");
        let lock_a = ProducerLock::new(&path);
        let lock_b = ProducerLock::new(&path);

        let _held = lock_a.acquire(Duration::from_millis(100)).unwrap();

        let started = Instant::now();
        assert!(matches!(
            lock_b.acquire(Duration::from_millis(50)),
            Err(ShmError::LockTimeout { waited_ms: 50 })
        ));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn lock_released_on_guard_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.lock");
        let lock = ProducerLock::new(&path);

        drop(lock.acquire(Duration::from_millis(100)).unwrap());
        assert!(lock.acquire(Duration::from_millis(100)).is_ok());
    }
}
