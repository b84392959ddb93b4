use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive advisory lock on one site, released on drop.
pub struct SiteLock {
    lock_file: File,
}

impl SiteLock {
    /// Take the lock or fail immediately with `CoreError::SiteLocked`.
    pub fn try_acquire(lock_path: &Path, site: &str) -> Result<Self, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::fs("create", parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| CoreError::fs("open", lock_path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { lock_file: file }),
            Err(_) => Err(CoreError::SiteLocked(site.to_owned())),
        }
    }
}

impl Drop for SiteLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("locks").join("demo.lock");

        {
            let _lock = SiteLock::try_acquire(&lock_path, "demo").unwrap();
            assert!(lock_path.exists());
        }

        let again = SiteLock::try_acquire(&lock_path, "demo");
        assert!(again.is_ok());
    }

    #[test]
    fn second_holder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("demo.lock");

        let _held = SiteLock::try_acquire(&lock_path, "demo").unwrap();
        let err = SiteLock::try_acquire(&lock_path, "demo").err().unwrap();
        assert!(matches!(err, CoreError::SiteLocked(ref s) if s == "demo"));
    }
}
