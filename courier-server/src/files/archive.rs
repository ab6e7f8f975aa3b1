//! Archive assembly: incoming file streams to one deliverable artifact
//!
//! A single flat file passes through unchanged. Anything else is packed
//! into a gzip-compressed tar container that keeps each entry's sanitized
//! relative path.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use courier_common::validators::{FilePathError, validate_file_path};
use courier_common::{Manifest, ManifestEntry};
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

use super::StorageArea;
use super::path::{EntryNamer, SanitizedPath, sanitize_relative_path};
use crate::constants::{ARCHIVE_EXTENSION, ARCHIVE_NAME_PREFIX};
use crate::errors::{StorageError, TransferError, ValidationError};

/// File name of the container inside the staging directory
const CONTAINER_STAGING_NAME: &str = "artifact";

/// One uploaded file: its client-supplied relative path and a byte stream
pub struct IncomingFile {
    relative_path: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl IncomingFile {
    pub fn new(
        relative_path: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            reader: Box::new(reader),
        }
    }

    /// In-memory file content
    pub fn from_bytes(relative_path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(relative_path, io::Cursor::new(data.into()))
    }

    /// Stream a file from local disk
    pub async fn open(path: &Path, relative_path: impl Into<String>) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(relative_path, file))
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }
}

impl std::fmt::Debug for IncomingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingFile")
            .field("relative_path", &self.relative_path)
            .finish_non_exhaustive()
    }
}

/// Result of a successful assembly
#[derive(Debug, Clone)]
pub struct AssembledArtifact {
    /// Display name: the sanitized file name, or a synthesized container name
    pub artifact_name: String,
    pub manifest: Manifest,
    /// Committed location, `blobs/{id}`
    pub blob_path: PathBuf,
    /// Size of the artifact itself (compressed size for containers)
    pub size: u64,
    pub is_container: bool,
}

/// Removes a staging directory when dropped
///
/// Covers every exit path of an ingestion, including cancellation of the
/// future that owns it.
pub struct StagingGuard {
    path: PathBuf,
}

impl StagingGuard {
    /// Create the staging directory; fails if it already exists
    pub async fn create(path: PathBuf) -> Result<Self, StorageError> {
        tokio::fs::create_dir(&path)
            .await
            .map_err(StorageError::Staging)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staging removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staging"),
        }
    }
}

/// Display name for a multi-file container (`transfer_YYMMDDHHMM.tar.gz`)
#[must_use]
pub fn container_name(created_at: DateTime<Utc>) -> String {
    format!(
        "{ARCHIVE_NAME_PREFIX}{}.{ARCHIVE_EXTENSION}",
        created_at.format("%y%m%d%H%M")
    )
}

/// Assemble incoming files into the artifact of transfer `id`
///
/// Paths are checked before anything touches disk. Files whose sanitized
/// name is empty are skipped; if none remain the call fails with
/// `ValidationError::EmptyInput`. On any failure the staging directory is
/// removed and no blob is left behind.
pub async fn assemble(
    area: &StorageArea,
    id: &str,
    files: Vec<IncomingFile>,
    created_at: DateTime<Utc>,
) -> Result<AssembledArtifact, TransferError> {
    let usable = prepare(files)?;

    let staging = StagingGuard::create(area.staging_dir(id)).await?;

    let mut namer = EntryNamer::new();
    let mut staged = Vec::with_capacity(usable.len());
    let mut entries = Vec::with_capacity(usable.len());

    for (index, (path, mut file)) in usable.into_iter().enumerate() {
        let staged_path = staging.path().join(index.to_string());
        let size = stream_to_staging(&mut file.reader, &staged_path).await?;
        let entry_path = namer.claim(&path);
        debug!(transfer_id = %id, entry = %entry_path, size, "staged file");

        entries.push(ManifestEntry::new(entry_path.clone(), size));
        staged.push((staged_path, entry_path, path));
    }
    let manifest = Manifest::new(entries);

    let pass_through = staged.len() == 1 && !staged[0].2.has_directory();

    let (artifact_path, artifact_name) = if pass_through {
        let (staged_path, _, path) = &staged[0];
        (staged_path.clone(), path.file_name().to_string())
    } else {
        let container = staging.path().join(CONTAINER_STAGING_NAME);
        let members: Vec<(PathBuf, String)> = staged
            .iter()
            .map(|(staged_path, entry_path, _)| (staged_path.clone(), entry_path.clone()))
            .collect();
        let out = container.clone();
        tokio::task::spawn_blocking(move || build_container(&out, &members))
            .await
            .map_err(|e| StorageError::Archive(io::Error::other(e)))?
            .map_err(StorageError::Archive)?;
        (container, container_name(created_at))
    };

    let size = tokio::fs::metadata(&artifact_path)
        .await
        .map_err(StorageError::Staging)?
        .len();
    let blob_path = area.commit_blob(&artifact_path, id).await?;

    drop(staging);

    Ok(AssembledArtifact {
        artifact_name,
        manifest,
        blob_path,
        size,
        is_container: !pass_through,
    })
}

/// Validate raw paths and drop the unusable ones
fn prepare(files: Vec<IncomingFile>) -> Result<Vec<(SanitizedPath, IncomingFile)>, ValidationError> {
    let mut usable = Vec::with_capacity(files.len());

    for file in files {
        match validate_file_path(&file.relative_path) {
            Ok(()) | Err(FilePathError::Empty) => {}
            Err(e) => return Err(ValidationError::FilePath(e)),
        }
        match sanitize_relative_path(&file.relative_path) {
            Some(path) => usable.push((path, file)),
            None => debug!(path = %file.relative_path.escape_debug(), "skipping unusable path"),
        }
    }

    if usable.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(usable)
}

async fn stream_to_staging(
    reader: &mut (dyn AsyncRead + Send + Unpin),
    staged_path: &Path,
) -> Result<u64, StorageError> {
    let mut out = tokio::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(staged_path)
        .await
        .map_err(StorageError::Staging)?;

    let size = tokio::io::copy(reader, &mut out)
        .await
        .map_err(StorageError::Staging)?;
    out.flush().await.map_err(StorageError::Staging)?;
    out.sync_all().await.map_err(StorageError::Staging)?;

    Ok(size)
}

/// Write a tar.gz of `members` (staged file, entry path) to `out`
///
/// Headers are deterministic so identical inputs give identical bytes.
fn build_container(out: &Path, members: &[(PathBuf, String)]) -> io::Result<()> {
    let file = std::fs::File::create(out)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.mode(tar::HeaderMode::Deterministic);

    for (staged_path, entry_path) in members {
        builder.append_path_with_name(staged_path, entry_path)?;
    }

    let file = builder.into_inner()?.finish()?;
    file.sync_all()
}
