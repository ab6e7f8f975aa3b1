//! Artifact storage area
//!
//! Layout under the storage root:
//! - `blobs/{id}`: the finished artifact of each transfer
//! - `staging/{id}`: scratch space of an ingestion in progress
//!
//! Nothing outside this module builds paths into the storage root.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs::File;
use tracing::{debug, warn};

use crate::constants::{
    BLOBS_DIR_NAME, DATA_DIR_NAME, ERR_NO_DATA_DIR, STAGING_DIR_NAME, STORAGE_DIR_NAME,
};
use crate::errors::StorageError;

pub mod archive;
pub mod path;

pub use archive::{AssembledArtifact, IncomingFile, assemble};
pub use path::{EntryNamer, SanitizedPath, sanitize_relative_path};

/// Get the default storage root for the platform
///
/// - **Linux**: `~/.local/share/courierd/storage/`
/// - **macOS**: `~/Library/Application Support/courierd/storage/`
/// - **Windows**: `%APPDATA%\courierd\storage\`
#[must_use = "storage root result should be used"]
pub fn default_storage_root() -> Result<PathBuf, String> {
    let data_dir = dirs::data_dir().ok_or_else(|| ERR_NO_DATA_DIR.to_string())?;
    Ok(data_dir.join(DATA_DIR_NAME).join(STORAGE_DIR_NAME))
}

/// Handle to the on-disk artifact store
///
/// Callers pass validated transfer ids; an id is used verbatim as a file name.
#[derive(Debug, Clone)]
pub struct StorageArea {
    root: PathBuf,
}

impl StorageArea {
    /// Create the directory layout under `root` if needed
    pub fn init(root: &Path) -> Result<Self, StorageError> {
        for dir in [root.join(BLOBS_DIR_NAME), root.join(STAGING_DIR_NAME)] {
            std::fs::create_dir_all(&dir).map_err(StorageError::Staging)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final artifact location for a transfer
    pub fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(BLOBS_DIR_NAME).join(id)
    }

    /// Scratch directory of one ingestion attempt
    pub fn staging_dir(&self, id: &str) -> PathBuf {
        self.root.join(STAGING_DIR_NAME).join(id)
    }

    /// Move a finished artifact from staging into `blobs/{id}`
    ///
    /// Never overwrites: an existing blob yields `StorageError::Collision`.
    /// The staged file is left in place for the staging guard to remove.
    pub async fn commit_blob(&self, staged: &Path, id: &str) -> Result<PathBuf, StorageError> {
        let target = self.blob_path(id);

        // hard_link fails atomically if the target exists
        match tokio::fs::hard_link(staged, &target).await {
            Ok(()) => Ok(target),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::Collision(id.to_string()))
            }
            Err(e) => Err(StorageError::Staging(e)),
        }
    }

    /// Open a blob for reading
    ///
    /// Returns `None` if the blob does not exist.
    pub async fn open_blob(&self, id: &str) -> Result<Option<(File, u64)>, StorageError> {
        let file = match File::open(self.blob_path(id)).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Read(e)),
        };
        let size = file.metadata().await.map_err(StorageError::Read)?.len();
        Ok(Some((file, size)))
    }

    /// Delete a blob
    ///
    /// A blob that is already gone counts as success. Returns true if a file
    /// was removed by this call.
    pub async fn remove_blob(&self, id: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Delete(e)),
        }
    }

    /// Remove staging entries left behind by a crash
    ///
    /// Entries modified within `older_than` are kept, since another process
    /// may still be ingesting into them. Returns the number removed.
    pub fn purge_stale_staging(&self, older_than: Duration) -> Result<usize, StorageError> {
        let staging = self.root.join(STAGING_DIR_NAME);
        let mut removed = 0;

        for entry in std::fs::read_dir(&staging).map_err(StorageError::Staging)? {
            let entry = entry.map_err(StorageError::Staging)?;
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or_default();
            if age < older_than {
                continue;
            }

            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale staging entry");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale staging entry"),
            }
        }

        Ok(removed)
    }
}

/// Removes a committed blob unless the ingestion that wrote it completes
///
/// Covers error returns and cancellation between blob commit and record
/// creation. Call `keep` once the record exists.
#[must_use = "dropping the guard removes the blob"]
pub struct BlobGuard {
    path: Option<PathBuf>,
}

impl BlobGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Leave the blob in place
    pub fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for BlobGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed blob of unfinished ingestion"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove blob of unfinished ingestion"),
        }
    }
}
