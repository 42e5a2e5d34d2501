use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, ExtractError};

use super::parser::ZipArchive;
use super::path::{self, DirectoryTracker};

/// Largest entry [`unzip_all_files_to_memory`] will hold: a non-negative
/// 32-bit count.
pub const MAX_IN_MEMORY_SIZE: u64 = i32::MAX as u64;

/// Options for extracting to disk.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Drop the top-level folder every file of the archive sits in, e.g.
    /// `project-main/` in a GitHub source archive. Archives without such a
    /// folder are extracted unchanged.
    pub strip_root_folder: bool,
}

/// An entry decompressed into memory, keyed by its name in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlob {
    pub name: String,
    pub data: Vec<u8>,
}

/// Why an entry is missing from an extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The name would resolve outside the destination root.
    UnsafePath,
    /// The entry's local header is damaged.
    UnreadableHeader,
    /// Decompression or writing failed.
    Extraction(String),
}

/// An entry left out of [`ExtractReport::files`], and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of [`extract_to_disk`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Written files, in archive order.
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedEntry>,
}

impl ExtractReport {
    fn skip(&mut self, index: usize, name: &str, reason: SkipReason) {
        tracing::warn!(index, name, ?reason, "skipping archive entry");
        self.skipped.push(SkippedEntry {
            index,
            name: name.to_string(),
            reason,
        });
    }

    /// Entries rejected because their path escapes the destination.
    pub fn unsafe_entries(&self) -> impl Iterator<Item = &SkippedEntry> {
        self.skipped
            .iter()
            .filter(|entry| entry.reason == SkipReason::UnsafePath)
    }
}

/// Extract every file of the archive in `data` under `destination_root`.
///
/// Entries that cannot be read, decompressed or written, and entries whose
/// names would escape `destination_root`, are skipped and listed in the
/// report. Failing to create a directory stops the extraction.
///
/// # Errors
///
/// Returns [`ExtractError::Archive`] if the archive cannot be opened and
/// [`ExtractError::DirectoryCreation`] if a directory cannot be created.
pub fn extract_to_disk(
    data: &[u8],
    destination_root: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport, ExtractError> {
    let archive = ZipArchive::open(data)?;
    let mut report = ExtractReport::default();

    if archive.is_empty() {
        return Ok(report);
    }

    let base = if options.strip_root_folder {
        path::common_root(
            archive
                .entries()
                .filter(|entry| !entry.is_directory)
                .map(|entry| entry.name.as_str()),
        )
    } else {
        String::new()
    };

    let mut directories = DirectoryTracker::new();

    for index in 0..archive.len() {
        let entry = match archive.stat(index) {
            Ok(entry) => entry,
            Err(err) => {
                let name = archive
                    .entries()
                    .nth(index)
                    .map(|e| e.name.as_str())
                    .unwrap_or_default();
                tracing::debug!(index, %err, "unreadable entry header");
                report.skip(index, name, SkipReason::UnreadableHeader);
                continue;
            }
        };

        if entry.is_directory {
            continue;
        }

        let relative = match path::sanitize(path::relative_path(&base, &entry.name)) {
            Ok(relative) => relative,
            Err(err) => {
                tracing::debug!(%err, "rejected entry path");
                report.skip(index, &entry.name, SkipReason::UnsafePath);
                continue;
            }
        };

        let dest = path::combine(destination_root, &relative);
        let dir = dest.parent().unwrap_or(destination_root);
        directories
            .ensure(dir)
            .map_err(|source| ExtractError::DirectoryCreation {
                path: dir.to_path_buf(),
                source,
            })?;

        match archive.extract_to_file(index, &dest) {
            Ok(()) => {
                tracing::debug!(name = %entry.name, dest = %dest.display(), "extracted entry");
                report.files.push(dest);
            }
            Err(err) => report.skip(index, &entry.name, SkipReason::Extraction(err.to_string())),
        }
    }

    tracing::info!(
        written = report.files.len(),
        skipped = report.skipped.len(),
        destination = %destination_root.display(),
        "extraction finished"
    );
    Ok(report)
}

/// Decompress every file of the archive in `data` into memory.
///
/// Malformed archives yield an empty result; use
/// [`try_unzip_all_files_to_memory`] to tell them apart from empty ones.
pub fn unzip_all_files_to_memory(data: &[u8]) -> Vec<ExtractedBlob> {
    try_unzip_all_files_to_memory(data).unwrap_or_else(|err| {
        tracing::warn!(%err, "cannot read archive");
        Vec::new()
    })
}

/// Like [`unzip_all_files_to_memory`], but reports archives that cannot be
/// opened.
///
/// Entry names are returned as stored in the archive. Entries larger than
/// [`MAX_IN_MEMORY_SIZE`] or failing to decompress are left out.
pub fn try_unzip_all_files_to_memory(data: &[u8]) -> Result<Vec<ExtractedBlob>, ArchiveError> {
    let archive = ZipArchive::open(data)?;
    let mut blobs = Vec::new();

    for index in 0..archive.len() {
        let Ok(entry) = archive.stat(index) else {
            tracing::warn!(index, "skipping unreadable entry");
            continue;
        };

        if entry.is_directory {
            continue;
        }
        if entry.uncompressed_size > MAX_IN_MEMORY_SIZE {
            tracing::warn!(
                name = %entry.name,
                size = entry.uncompressed_size,
                "entry too large for memory"
            );
            continue;
        }

        match archive.extract_to_memory(index) {
            Ok(data) => blobs.push(ExtractedBlob {
                name: entry.name.clone(),
                data,
            }),
            Err(err) => tracing::warn!(name = %entry.name, %err, "skipping archive entry"),
        }
    }

    Ok(blobs)
}
