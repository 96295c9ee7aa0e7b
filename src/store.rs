//! Content-addressed store of temporary files holding credential material.
//!
//! A [`MaterialStore`] turns bytes into the name of a file containing those
//! bytes, for transports which only accept credentials by file name. Files
//! are keyed by the SHA-256 digest of their contents, so presenting the same
//! material on every request creates only one file. Every file is deleted
//! when [`MaterialStore::cleanup`] runs or the store is dropped, whichever
//! comes first.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::TempPath;
use thiserror::Error;

const FILE_PREFIX: &str = ".client-tls-";

type ContentHash = [u8; 32];

/// Error type returned by [`MaterialStore::materialize`]
#[derive(Debug, Error)]
pub enum StorageError {
    /// The temporary file could not be created.
    #[error("cannot create temporary file in {}: {source}", .dir.display())]
    Create {
        /// Directory the file was to be created in.
        dir: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The temporary file was created but the material could not be
    /// completely written to it.
    #[error("cannot write credential material to {}: {source}", .path.display())]
    Write {
        /// The file that was being written. It no longer exists.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// [`MaterialStore::cleanup`] has already run.
    #[error("credential material store has already been cleaned up")]
    Closed,
}

#[derive(Default)]
struct Files {
    by_hash: HashMap<ContentHash, TempPath>,
    closed: bool,
}

/// Temporary files holding credential material, deduplicated by content.
pub struct MaterialStore {
    dir: PathBuf,
    files: Mutex<Files>,
}

impl MaterialStore {
    /// A store which creates its files in the platform temporary directory.
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    /// A store which creates its files in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(Files::default()),
        }
    }

    /// Directory in which files are created.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Every critical section leaves the map consistent, so a panic
    // elsewhere while holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Files> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the name of a file containing exactly `content`, creating
    /// it if this is the first time this content has been seen.
    ///
    /// The file stays in place until [`MaterialStore::cleanup`]. Callers
    /// must not modify or delete it.
    pub fn materialize(&self, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.materialize_with(content, |file, content| {
            write_fully(file, content)?;
            file.sync_all()
        })
    }

    fn materialize_with<F>(&self, content: &[u8], write: F) -> Result<PathBuf, StorageError>
    where
        F: FnOnce(&mut File, &[u8]) -> std::io::Result<()>,
    {
        let hash: ContentHash = Sha256::digest(content).into();
        let mut files = self.lock();
        if files.closed {
            return Err(StorageError::Closed);
        }
        if let Some(existing) = files.by_hash.get(&hash) {
            log::debug!(
                "Reusing credential material file {}",
                existing.display()
            );
            return Ok(existing.to_path_buf());
        }

        let mut file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|source| StorageError::Create {
                dir: self.dir.clone(),
                source,
            })?;
        // On error the file is dropped here, which deletes it.
        if let Err(source) = write(file.as_file_mut(), content) {
            return Err(StorageError::Write {
                path: file.path().to_path_buf(),
                source,
            });
        }
        let path = file.into_temp_path();
        let name = path.to_path_buf();
        log::debug!(
            "Wrote {} bytes of credential material to {}",
            content.len(),
            name.display()
        );
        files.by_hash.insert(hash, path);
        #[cfg(feature = "metrics")]
        crate::metrics::MATERIALIZED_FILES.inc();
        Ok(name)
    }

    /// Delete every file this store has created. Failures are logged and
    /// otherwise ignored. After this, [`MaterialStore::materialize`] fails.
    pub fn cleanup(&self) {
        let doomed = {
            let mut files = self.lock();
            files.closed = true;
            std::mem::take(&mut files.by_hash)
        };
        if doomed.is_empty() {
            return;
        }
        let count = doomed.len();
        for (_, path) in doomed {
            let name = path.to_path_buf();
            if let Err(e) = path.close() {
                log::warn!(
                    "Could not remove credential material file {}: {}",
                    name.display(),
                    e
                );
            }
            #[cfg(feature = "metrics")]
            crate::metrics::MATERIALIZED_FILES.dec();
        }
        log::info!("Removed {} credential material file(s)", count);
    }

    /// Number of files currently held.
    pub fn len(&self) -> usize {
        self.lock().by_hash.len()
    }

    /// True if no files are currently held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_fully<W: Write>(w: &mut W, content: &[u8]) -> std::io::Result<()> {
    w.write_all(content)?;
    w.flush()
}

impl Default for MaterialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MaterialStore {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for MaterialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialStore")
            .field("dir", &self.dir)
            .field("files", &self.len())
            .finish()
    }
}
