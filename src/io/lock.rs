use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock serializing read-modify-write cycles on a session file.
///
/// Uses flock (Unix) on a `<session>.lock` file beside it, so two `bx`
/// invocations never interleave their load and save. The lock file is
/// left in place: every process must lock the same inode.
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
    #[error("could not acquire lock on {path}: another bx process may be writing")]
    Timeout { path: PathBuf },
}

/// Lock file guarding `session_path`
pub fn lock_path(session_path: &Path) -> PathBuf {
    let mut name = session_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("boxsort"));
    name.push(".lock");
    session_path.with_file_name(name)
}

impl FileLock {
    /// Acquire the lock for a session file, waiting up to `timeout`.
    pub fn acquire(session_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_path(session_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => return Ok(FileLock { _file: file }),
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path }),
            }
        }
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(session_path: &Path) -> Result<Self, LockError> {
        Self::acquire(session_path, Duration::from_secs(5))
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
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
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_file_sits_beside_session() {
        assert_eq!(
            lock_path(Path::new("work/boxsort.json")),
            PathBuf::from("work/boxsort.json.lock")
        );
    }

    #[test]
    fn test_acquire_and_release() {
        let tmp = TempDir::new().unwrap();
        let session = tmp.path().join("boxsort.json");

        let lock = FileLock::acquire_default(&session).unwrap();
        assert!(lock_path(&session).exists());
        drop(lock);
        assert!(lock_path(&session).exists());

        assert!(FileLock::acquire_default(&session).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_waiter_and_newcomer_contend_for_the_same_file() {
        let tmp = TempDir::new().unwrap();
        let session = tmp.path().join("boxsort.json");

        let first = FileLock::acquire_default(&session).unwrap();
        let waiting = OpenOptions::new()
            .write(true)
            .open(lock_path(&session))
            .unwrap();
        drop(first);

        // the process that opened the file while it was held takes over
        try_lock(&waiting).unwrap();
        let newcomer = FileLock::acquire(&session, Duration::from_millis(50));
        assert!(matches!(newcomer, Err(LockError::Timeout { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_contention_times_out() {
        let tmp = TempDir::new().unwrap();
        let session = tmp.path().join("boxsort.json");

        let _held = FileLock::acquire_default(&session).unwrap();
        let second = FileLock::acquire(&session, Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }
}
