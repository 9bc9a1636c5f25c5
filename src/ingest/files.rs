//! Tabulated data file collection and transfer
//!
//! Files referenced by parameter values are gathered during a build pass and
//! uploaded in one batch afterwards. Blob storage is keyed by file name, so an
//! upload is skipped when a blob with the same name already exists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::db::BlobStore;
use crate::types::{LoaderError, Result};

/// Deduplicated set of data files to upload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileCollector {
    files: BTreeSet<PathBuf>,
}

impl FileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file; returns false if it was already queued
    pub fn add(&mut self, path: PathBuf) -> bool {
        self.files.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }
}

/// Outcome of a batch upload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub skipped: usize,
}

fn blob_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            LoaderError::InvalidInput(format!("{} has no usable file name", path.display()))
        })
}

/// Store a single file unless a blob with its name already exists
pub async fn upload_file<B>(blobs: &B, path: &Path, content_type: &str) -> Result<bool>
where
    B: BlobStore + ?Sized,
{
    let filename = blob_name(path)?;
    if blobs.blob_exists(filename).await? {
        debug!(filename, "Blob already stored, skipping");
        return Ok(false);
    }
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| LoaderError::io_at(path, e))?;
    blobs.put_blob(filename, content_type, data).await?;
    Ok(true)
}

/// Upload every collected file
pub async fn upload_files<B>(
    blobs: &B,
    files: &FileCollector,
    content_type: &str,
) -> Result<UploadReport>
where
    B: BlobStore + ?Sized,
{
    let mut report = UploadReport::default();
    for path in files.iter() {
        if upload_file(blobs, path, content_type).await? {
            report.uploaded += 1;
        } else {
            report.skipped += 1;
        }
    }
    info!(
        uploaded = report.uploaded,
        skipped = report.skipped,
        "Uploaded tabulated data files"
    );
    Ok(report)
}

/// Write a stored blob to `dest_dir`, returning the written path.
///
/// Only the final component of `filename` names the output, so the file
/// always lands directly inside `dest_dir`.
pub async fn fetch_file<B>(blobs: &B, filename: &str, dest_dir: &Path) -> Result<PathBuf>
where
    B: BlobStore + ?Sized,
{
    let local_name = blob_name(Path::new(filename))?;
    let data = blobs.get_blob(filename).await?;
    let target = dest_dir.join(local_name);
    tokio::fs::write(&target, &data)
        .await
        .map_err(|e| LoaderError::io_at(&target, e))?;
    info!(filename, path = %target.display(), bytes = data.len(), "Wrote data file");
    Ok(target)
}
