//! Advisory run lock
//!
//! plexup assumes it is the sole updater acting on a host at any time. The
//! external scheduler is expected to enforce non-overlapping runs, but a
//! stray manual invocation racing a scheduled one would interleave two
//! install sequences. The lock makes that assumption explicit: the
//! orchestrating command takes an exclusive flock on a file in the scratch
//! directory and fails fast if it is already held.
//!
//! The lock is released when the [`RunLock`] is dropped; the lock file
//! itself is left in place.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::core::PlexupError;

const LOCK_FILE_NAME: &str = "plexup.lock";

/// Exclusive advisory lock held for the duration of an update run.
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to acquire the run lock under `scratch_dir`, failing fast when
    /// another run holds it.
    ///
    /// # Errors
    ///
    /// - [`PlexupError::AlreadyRunning`] when the lock is held elsewhere
    /// - [`PlexupError::Io`] when the scratch directory or lock file cannot
    ///   be created
    pub fn acquire(scratch_dir: &Path) -> Result<Self, PlexupError> {
        std::fs::create_dir_all(scratch_dir)?;
        let path = scratch_dir.join(LOCK_FILE_NAME);

        let file = OpenOptions::new().create(true).write(true).open(&path)?;

        if !file.try_lock_exclusive()? {
            return Err(PlexupError::AlreadyRunning {
                path: path.display().to_string(),
            });
        }

        tracing::debug!(target: "lock", "Acquired run lock at {}", path.display());
        Ok(Self { _file: file, path })
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // The OS releases the lock when the file closes; unlock explicitly
        // so the release is not deferred by a lingering handle.
        #[allow(unstable_name_collisions)]
        if let Err(e) = self._file.unlock() {
            tracing::warn!(target: "lock", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
