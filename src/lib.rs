//! # zipfetch
//!
//! Download a ZIP archive over HTTP(S) and extract it to disk or into memory.
//!
//! The archive is buffered completely, its central directory is parsed, and
//! every file entry is decompressed. Entries are written under a destination
//! directory, or collected as name/bytes pairs. Entries whose names would
//! escape the destination are skipped and reported.
//!
//! ## Features
//!
//! - Single GET per download, with redirect re-authorization and progress reporting
//! - Support for ZIP64 format (archives larger than 4GB)
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - Best-effort extraction: a damaged entry does not stop the others
//!
//! ## Example
//!
//! ```no_run
//! use reqwest::Url;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let url = Url::parse("https://github.com/richgel999/miniz/archive/master.zip")?;
//!     let report = zipfetch::download_and_extract(&url, "/tmp/some_folder").await?;
//!     for file in &report.files {
//!         println!("{}", file.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;

pub use archive::{
    ArchiveEntry, ExtractOptions, ExtractReport, ExtractedBlob, SkipReason, SkippedEntry,
    ZipArchive, extract_to_disk, try_unzip_all_files_to_memory, unzip_all_files_to_memory,
};
pub use cli::Cli;
pub use error::{ArchiveError, Error, ExtractError, Result};
pub use fetch::{
    FetchOptions, Fetcher, Progress, ProgressReceiver, ProgressSender, progress_channel,
};
pub use pipeline::{
    Downloader, download_and_extract, spawn_download_and_extract,
    spawn_download_and_extract_with_progress,
};
