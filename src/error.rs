//! Error types for fetching and extracting archives.

use std::io;
use std::path::PathBuf;

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Errors raised while reading a ZIP container held in memory.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The buffer is not a readable ZIP archive.
    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("entry index {0} is out of range")]
    IndexOutOfRange(usize),

    /// The entry's local header or data range is invalid.
    #[error("entry {index} is corrupt: {reason}")]
    CorruptEntry { index: usize, reason: String },

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("encrypted entries are not supported")]
    Encrypted,

    #[error("decompression failed: {0}")]
    Decompression(#[source] io::Error),

    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("CRC-32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The entry cannot be held in memory on this platform.
    #[error("entry of {0} bytes is too large")]
    TooLarge(u64),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

/// Errors that abort a whole extraction.
///
/// Failures local to a single entry never show up here; they are recorded in
/// the [`ExtractReport`](crate::ExtractReport) instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced by the download-and-extract pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure, timeout or rejected redirect.
    #[error("request to {url} failed: {source}")]
    Network {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: Url, status: StatusCode },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the failure happened before any archive bytes were available.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Status { .. })
    }

    /// Whether the archive itself could not be parsed.
    pub fn is_malformed_archive(&self) -> bool {
        matches!(
            self,
            Error::Extract(ExtractError::Archive(ArchiveError::Malformed(_)))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
