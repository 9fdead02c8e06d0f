//! Batch data model: file entries, paired items and chunking

use crate::error::{EraseError, Result};
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file discovered in the source directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileEntry {
    /// Full path to the file
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
}

impl FileEntry {
    /// Create an entry from a path, taking the name from its last component
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// File name without its extension
    #[must_use]
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

impl std::fmt::Display for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// An entry paired with its decoded (or processed) image
///
/// Keeping both in one value means filtering a batch can never pair an
/// image with the wrong file.
#[derive(Debug, Clone)]
pub struct BatchItem<T = DynamicImage> {
    pub entry: FileEntry,
    pub image: T,
}

impl<T> BatchItem<T> {
    pub fn new(entry: FileEntry, image: T) -> Self {
        Self { entry, image }
    }

    /// Replace the payload, keeping the entry
    pub fn with_image<U>(self, image: U) -> BatchItem<U> {
        BatchItem {
            entry: self.entry,
            image,
        }
    }
}

/// Split entries into consecutive batches of at most `batch_size`
///
/// A batch size of zero is treated as one.
pub fn chunk_entries(entries: &[FileEntry], batch_size: usize) -> std::slice::Chunks<'_, FileEntry> {
    entries.chunks(batch_size.max(1))
}

/// Number of batches a run over `total` files will have
#[must_use]
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    let size = batch_size.max(1);
    (total + size - 1) / size
}

/// Stable split of items by a parallel list of verdicts
///
/// Returns `(kept, rejected)`, both in their original relative order.
///
/// # Errors
/// - `Internal` if the verdict list length differs from the item count
pub fn partition_by_verdict<T>(items: Vec<T>, verdicts: &[bool]) -> Result<(Vec<T>, Vec<T>)> {
    if items.len() != verdicts.len() {
        return Err(EraseError::internal(format!(
            "{} verdicts for {} items",
            verdicts.len(),
            items.len()
        )));
    }

    let mut kept = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (item, &passed) in items.into_iter().zip(verdicts) {
        if passed {
            kept.push(item);
        } else {
            rejected.push(item);
        }
    }
    Ok((kept, rejected))
}

/// Names of the entries of a batch, for logging
#[must_use]
pub fn entry_names<T>(items: &[BatchItem<T>]) -> Vec<String> {
    items.iter().map(|item| item.entry.name.clone()).collect()
}
