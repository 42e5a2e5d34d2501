//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Reading the central directory and entry data out of an in-memory buffer
//! - [`decompress`]: STORED/DEFLATE decoding with size and CRC-32 checks
//! - [`path`]: Safe mapping of entry names onto a destination directory
//! - [`extractor`]: Whole-archive extraction to disk or to memory
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) and DEFLATE compression methods
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

pub mod decompress;
mod extractor;
mod parser;
pub mod path;
mod structures;

pub use extractor::{
    ExtractOptions, ExtractReport, ExtractedBlob, MAX_IN_MEMORY_SIZE, SkipReason, SkippedEntry,
    extract_to_disk, try_unzip_all_files_to_memory, unzip_all_files_to_memory,
};
pub use parser::ZipArchive;
pub use path::UnsafePath;
pub use structures::*;
