use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock on a store directory, held for the length of one
/// read-modify-write.
///
/// Uses flock (Unix) so concurrent `ql` processes cannot lose each other's
/// updates. The `.lock` file stays in place after release; unlinking it while
/// a waiter holds a descriptor would let that waiter lock an orphaned inode.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not acquire lock on {path}: another ql process may be writing")]
    Timeout { path: PathBuf },
}

impl FileLock {
    /// Lock `<store_dir>/.lock`, polling until `timeout` elapses.
    pub fn acquire(store_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = store_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    log::debug!("acquired {}", lock_path.display());
                    return Ok(FileLock { _file: file });
                }
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    log::warn!("gave up on {} after {:?}: {}", lock_path.display(), timeout, e);
                    return Err(LockError::Timeout { path: lock_path });
                }
            }
        }
    }
}

/// Non-blocking exclusive flock on an open file.
#[cfg(unix)]
pub(crate) fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub(crate) fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
